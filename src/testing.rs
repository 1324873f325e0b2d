// Shared proptest strategies for unit tests.
use proptest::prelude::*;

use crate::schema::PropertyVariant;

/// Leaves that may sit inside a container.
pub fn arb_element_leaf() -> impl Strategy<Value = PropertyVariant> {
    prop_oneof![
        Just(PropertyVariant::text()),
        Just(PropertyVariant::uri()),
        Just(PropertyVariant::date_time()),
        Just(PropertyVariant::reference("tag")),
        Just(PropertyVariant::reference("missing")),
    ]
}

/// Variants whose containers never hold a bare scalar.
pub fn arb_well_formed_variant() -> impl Strategy<Value = PropertyVariant> {
    let leaf = arb_element_leaf();
    let nested = leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(PropertyVariant::array_of),
            inner.prop_map(PropertyVariant::map_of),
            Just(PropertyVariant::Array { element: None }),
            Just(PropertyVariant::Map { value: None }),
        ]
    });
    prop_oneof![
        Just(PropertyVariant::boolean()),
        Just(PropertyVariant::integer()),
        Just(PropertyVariant::number()),
        nested,
    ]
}

/// Any variant, including ill-formed containers of scalars.
pub fn arb_variant() -> impl Strategy<Value = PropertyVariant> {
    let leaf = prop_oneof![
        Just(PropertyVariant::boolean()),
        Just(PropertyVariant::integer()),
        Just(PropertyVariant::number()),
        arb_element_leaf(),
    ];
    leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(PropertyVariant::array_of),
            inner.prop_map(PropertyVariant::map_of),
        ]
    })
}
