//! Coercion compiler.
//!
//! Computes how a typed property value is pulled out of an untyped input
//! value. Containers only get an element-wise rule when some leaf actually
//! needs work; everything else is a direct assignment.
use serde::Serialize;

use crate::error::ContainerElementError;
use crate::ir::PrimitiveType;
use crate::naming::NamingConfig;
use crate::schema::{
    ContainerKind, PropertyDescriptor, PropertyVariant, SchemaGraph, TextFormat, Unresolved,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormatTransform {
    UriParse,
    DateTimeTransform,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CoercionRule {
    /// Value used as-is. Scalars carry the trivial cast to apply.
    Direct { cast: Option<PrimitiveType> },
    FormattedTransform { transform: FormatTransform },
    /// Build the referenced model from the nested raw value. `class_name` is
    /// empty when the target does not resolve.
    SubEntityConstruct { target: String, class_name: String },
    ElementwiseTransform { element: Box<CoercionRule>, container: ContainerKind },
}

impl CoercionRule {
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct { .. })
    }
}

pub fn coercion_rule(
    graph: &SchemaGraph,
    naming: &NamingConfig,
    descriptor: &PropertyDescriptor,
) -> Result<CoercionRule, ContainerElementError> {
    rule_for_variant(graph, naming, &descriptor.variant)
}

pub fn rule_for_variant(
    graph: &SchemaGraph,
    naming: &NamingConfig,
    variant: &PropertyVariant,
) -> Result<CoercionRule, ContainerElementError> {
    let rule = match variant {
        PropertyVariant::Text { format: TextFormat::Uri } => {
            CoercionRule::FormattedTransform { transform: FormatTransform::UriParse }
        }
        PropertyVariant::Text { format: TextFormat::DateTime } => {
            CoercionRule::FormattedTransform { transform: FormatTransform::DateTimeTransform }
        }
        PropertyVariant::Text { format: TextFormat::Plain } => CoercionRule::Direct { cast: None },
        PropertyVariant::Scalar { scalar } => CoercionRule::Direct { cast: Some((*scalar).into()) },
        PropertyVariant::Reference { target } => sub_entity(graph, naming, target),
        PropertyVariant::Array { element } => {
            container_rule(graph, naming, variant, ContainerKind::Array, element.as_deref())?
        }
        PropertyVariant::Map { value } => {
            container_rule(graph, naming, variant, ContainerKind::Map, value.as_deref())?
        }
    };
    Ok(rule)
}

fn container_rule(
    graph: &SchemaGraph,
    naming: &NamingConfig,
    variant: &PropertyVariant,
    container: ContainerKind,
    element: Option<&PropertyVariant>,
) -> Result<CoercionRule, ContainerElementError> {
    // Early-exit: nothing below needs a transform, plain assignment will do.
    if !requires_elementwise_transform(variant)? {
        return Ok(CoercionRule::Direct { cast: None });
    }
    let Some(element) = element else {
        return Ok(CoercionRule::Direct { cast: None });
    };
    Ok(CoercionRule::ElementwiseTransform {
        element: Box::new(rule_for_variant(graph, naming, element)?),
        container,
    })
}

fn sub_entity(graph: &SchemaGraph, naming: &NamingConfig, target: &str) -> CoercionRule {
    match graph.resolve(target) {
        Ok(entity) => CoercionRule::SubEntityConstruct {
            target: entity.name.clone(),
            class_name: naming.class_name(&entity.name),
        },
        Err(Unresolved(target)) => CoercionRule::SubEntityConstruct { target, class_name: String::new() },
    }
}

/// True iff the (possibly nested) leaf needs a formatted transform or a
/// sub-entity construction. A bare scalar inside a container is an error.
pub fn requires_elementwise_transform(variant: &PropertyVariant) -> Result<bool, ContainerElementError> {
    match variant {
        PropertyVariant::Text { format } => Ok(*format != TextFormat::Plain),
        PropertyVariant::Scalar { .. } => Ok(false),
        PropertyVariant::Reference { .. } => Ok(true),
        PropertyVariant::Array { element } => element_requires(ContainerKind::Array, element.as_deref()),
        PropertyVariant::Map { value } => element_requires(ContainerKind::Map, value.as_deref()),
    }
}

fn element_requires(
    container: ContainerKind,
    element: Option<&PropertyVariant>,
) -> Result<bool, ContainerElementError> {
    match element {
        None => Ok(false),
        Some(PropertyVariant::Scalar { scalar }) => {
            Err(ContainerElementError { container, scalar: *scalar })
        }
        Some(inner) => requires_elementwise_transform(inner),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Entity, ScalarKind};
    use crate::testing::{arb_variant, arb_well_formed_variant};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn graph() -> SchemaGraph {
        SchemaGraph::new(vec![Entity::new("Photo"), Entity::new("Tag")]).unwrap()
    }

    fn rule(v: PropertyVariant) -> CoercionRule {
        rule_for_variant(&graph(), &NamingConfig::default(), &v).unwrap()
    }

    #[test]
    fn uri_property_parses() {
        let d = PropertyDescriptor::new("image_url", PropertyVariant::uri());
        let r = coercion_rule(&graph(), &NamingConfig::default(), &d).unwrap();
        assert_eq!(r, CoercionRule::FormattedTransform { transform: FormatTransform::UriParse });
    }

    #[test]
    fn array_of_references_constructs_each_element() {
        let v = PropertyVariant::array_of(PropertyVariant::reference("Tag"));
        assert!(requires_elementwise_transform(&v).unwrap());
        assert_eq!(
            rule(v),
            CoercionRule::ElementwiseTransform {
                element: Box::new(CoercionRule::SubEntityConstruct {
                    target: "Tag".into(),
                    class_name: "Tag".into(),
                }),
                container: ContainerKind::Array,
            }
        );
    }

    #[test]
    fn sub_entity_applies_prefix() {
        let r = rule_for_variant(&graph(), &NamingConfig::with_prefix("PI"), &PropertyVariant::reference("Tag"));
        assert_eq!(
            r.unwrap(),
            CoercionRule::SubEntityConstruct { target: "Tag".into(), class_name: "PITag".into() }
        );
    }

    #[test]
    fn nested_containers_nest_rules() {
        let v = PropertyVariant::map_of(PropertyVariant::array_of(PropertyVariant::date_time()));
        assert_eq!(
            rule(v),
            CoercionRule::ElementwiseTransform {
                element: Box::new(CoercionRule::ElementwiseTransform {
                    element: Box::new(CoercionRule::FormattedTransform {
                        transform: FormatTransform::DateTimeTransform,
                    }),
                    container: ContainerKind::Array,
                }),
                container: ContainerKind::Map,
            }
        );
    }

    #[test]
    fn plain_containers_assign_directly() {
        assert_eq!(rule(PropertyVariant::array_of(PropertyVariant::text())), CoercionRule::Direct { cast: None });
        assert_eq!(rule(PropertyVariant::Map { value: None }), CoercionRule::Direct { cast: None });
        assert_eq!(
            rule(PropertyVariant::integer()),
            CoercionRule::Direct { cast: Some(PrimitiveType::Integer) }
        );
    }

    #[test]
    fn unresolved_reference_degrades_to_empty_class() {
        assert_eq!(
            rule(PropertyVariant::reference("Missing")),
            CoercionRule::SubEntityConstruct { target: "Missing".into(), class_name: String::new() }
        );
    }

    #[test]
    fn scalar_elements_are_rejected() {
        let v = PropertyVariant::map_of(PropertyVariant::array_of(PropertyVariant::boolean()));
        let err = requires_elementwise_transform(&v).unwrap_err();
        assert_eq!(err, ContainerElementError { container: ContainerKind::Array, scalar: ScalarKind::Boolean });
        assert!(rule_for_variant(&graph(), &NamingConfig::default(), &v).is_err());
    }

    // innermost element of a container chain
    fn leaf(v: &PropertyVariant) -> Option<&PropertyVariant> {
        match v.container() {
            Some((_, Some(inner))) => leaf(inner),
            Some((_, None)) => None,
            None => Some(v),
        }
    }

    fn has_scalar_element(v: &PropertyVariant) -> bool {
        match v.container() {
            Some((_, Some(inner))) => inner.is_scalar() || has_scalar_element(inner),
            _ => false,
        }
    }

    proptest! {
        #[test]
        fn requires_iff_leaf_needs_work(v in arb_well_formed_variant()) {
            let expected = matches!(
                leaf(&v),
                Some(PropertyVariant::Reference { .. })
                    | Some(PropertyVariant::Text { format: TextFormat::Uri | TextFormat::DateTime })
            );
            prop_assert_eq!(requires_elementwise_transform(&v).unwrap(), expected);
            let r = rule(v);
            prop_assert_eq!(r.is_direct(), !expected);
        }

        #[test]
        fn scalar_elements_always_fail(v in arb_variant()) {
            prop_assert_eq!(requires_elementwise_transform(&v).is_err(), has_scalar_element(&v));
        }
    }
}
