//! Builders, dirty tracking and inheritance-aware merge.
//!
//! Values are untyped (`serde_json::Value`); this layer only decides which
//! value wins. Dirty bits are kept per owning class so each level of the
//! hierarchy uses the indices its own [`ClassDescriptor`] assigned.
//!
//! [`ClassDescriptor`]: crate::synth::ClassDescriptor
use std::collections::BTreeSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::compile::Compilation;
use crate::error::MergeError;
use crate::synth::ModelDescriptor;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Why a construction or merge is happening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeInitKind {
    /// Fresh construction. Never used for merges.
    Default,
    /// The receiver was merged directly.
    FromMerge,
    /// A descendant's merge touched the receiver's properties.
    FromSubmerge,
}

/// Ordered set of dirty bit indices, independent of any storage width.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirtySet(BTreeSet<u32>);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    entity: String,
    values: IndexMap<String, Value>,
    /// Owning entity → dirty bits of that level.
    dirty: IndexMap<String, DirtySet>,
}

/// A hook call the model would receive, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitNotification {
    pub entity: String,
    pub selector: String,
    pub kind: MergeInitKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constructed {
    pub instance: Instance,
    pub notifications: Vec<InitNotification>,
}

/// Mutable staging area for an [`Instance`].
#[derive(Debug, Clone)]
pub struct Builder<'a> {
    chain: Vec<&'a ModelDescriptor>,
    values: IndexMap<String, Value>,
    dirty: IndexMap<String, DirtySet>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl DirtySet {
    pub fn insert(&mut self, bit: u32) -> bool { self.0.insert(bit) }
    pub fn contains(&self, bit: u32) -> bool { self.0.contains(&bit) }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Instance {
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    /// Dirty bits owned by `entity` (the instance's own entity or an ancestor).
    pub fn dirty_bits(&self, entity: &str) -> Option<&DirtySet> {
        self.dirty.get(entity)
    }
}

impl<'a> Builder<'a> {
    pub fn new(compilation: &'a Compilation, entity: &str) -> Result<Self, MergeError> {
        let chain = compilation.chain(entity)?;
        let dirty = chain
            .iter()
            .map(|m| (m.class.entity.clone(), DirtySet::default()))
            .collect();
        Ok(Self { chain, values: IndexMap::new(), dirty })
    }

    /// Seed a builder with the values and dirty bits of `instance`.
    pub fn from_instance(compilation: &'a Compilation, instance: &Instance) -> Result<Self, MergeError> {
        let mut builder = Self::new(compilation, &instance.entity)?;
        builder.values = instance.values.clone();
        for (owner, bits) in &instance.dirty {
            builder.dirty.insert(owner.clone(), bits.clone());
        }
        Ok(builder)
    }

    pub fn entity(&self) -> &str {
        self.leaf().class.entity.as_str()
    }

    /// Set a property and mark it dirty on the level that owns it.
    pub fn set(&mut self, property: &str, value: Value) -> Result<&mut Self, MergeError> {
        let (owner, bit) = self.slot(property).ok_or_else(|| MergeError::UnknownProperty {
            entity: self.entity().to_string(),
            property: property.to_string(),
        })?;
        self.mark(owner, bit, property, value);
        Ok(self)
    }

    /// Finish a fresh construction: every level is notified with `Default`.
    pub fn build(self) -> Constructed {
        let notifications = self
            .chain
            .iter()
            .map(|m| notification(m, MergeInitKind::Default))
            .collect();
        Constructed { instance: self.into_instance(), notifications }
    }

    fn into_instance(self) -> Instance {
        let entity = self.entity().to_string();
        Instance { entity, values: self.values, dirty: self.dirty }
    }

    fn leaf(&self) -> &'a ModelDescriptor {
        // chain always holds at least the entity itself
        self.chain[self.chain.len() - 1]
    }

    fn slot(&self, property: &str) -> Option<(&'a str, u32)> {
        self.chain.iter().copied().find_map(|m: &'a ModelDescriptor| {
            m.class.dirty_bits.get(property).map(|bit| (m.class.entity.as_str(), *bit))
        })
    }

    fn mark(&mut self, owner: &str, bit: u32, property: &str, value: Value) {
        self.values.insert(property.to_string(), value);
        self.dirty.entry(owner.to_string()).or_default().insert(bit);
    }
}

fn notification(model: &ModelDescriptor, kind: MergeInitKind) -> InitNotification {
    InitNotification {
        entity: model.class.entity.clone(),
        selector: model.class.capability_hook.selector.clone(),
        kind,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MERGE
// ————————————————————————————————————————————————————————————————————————————

/// Combine `incoming` into `current`.
///
/// Every property dirty on `incoming` takes `incoming`'s value; all others keep
/// `current`'s. Ancestor-owned properties are merged first and tagged
/// `FromSubmerge`, then the entity's own with `kind`.
pub fn merge(
    compilation: &Compilation,
    current: &Instance,
    incoming: &Instance,
    kind: MergeInitKind,
) -> Result<Constructed, MergeError> {
    if current.entity != incoming.entity {
        return Err(MergeError::EntityMismatch {
            current: current.entity.clone(),
            incoming: incoming.entity.clone(),
        });
    }
    if kind == MergeInitKind::Default {
        return Err(MergeError::DefaultInitKind { entity: current.entity.clone() });
    }

    let mut builder = Builder::from_instance(compilation, current)?;
    let chain = builder.chain.clone();
    let mut notifications = Vec::with_capacity(chain.len());
    merge_level(&chain, &mut builder, incoming, kind, &mut notifications);

    debug!(
        entity = %current.entity,
        ?kind,
        levels = notifications.len(),
        "merged instance"
    );

    Ok(Constructed { instance: builder.into_instance(), notifications })
}

fn merge_level(
    chain: &[&ModelDescriptor],
    builder: &mut Builder<'_>,
    incoming: &Instance,
    kind: MergeInitKind,
    notifications: &mut Vec<InitNotification>,
) {
    let Some((level, ancestors)) = chain.split_last() else {
        return;
    };
    if !ancestors.is_empty() {
        merge_level(ancestors, builder, incoming, MergeInitKind::FromSubmerge, notifications);
    }

    let owner = level.class.entity.as_str();
    if let Some(bits) = incoming.dirty_bits(owner).filter(|b| !b.is_empty()) {
        for (property, bit) in &level.class.dirty_bits {
            if !bits.contains(*bit) {
                continue;
            }
            let value = incoming.values.get(property).cloned().unwrap_or(Value::Null);
            builder.mark(owner, *bit, property, value);
        }
    }
    notifications.push(notification(level, kind));
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::naming::NamingConfig;
    use crate::schema::{Entity, PropertyVariant, SchemaGraph};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn compilation() -> Compilation {
        let g = SchemaGraph::new(vec![
            Entity::new("counter")
                .with_property("name", PropertyVariant::text())
                .with_property("count", PropertyVariant::integer())
                .with_property("extra", PropertyVariant::text()),
            Entity::new("board").with_property("name", PropertyVariant::text()),
            Entity::new("secret_board")
                .with_parent("board")
                .with_property("name", PropertyVariant::text())
                .with_property("password", PropertyVariant::text()),
        ])
        .unwrap();
        compile(&g, &NamingConfig::with_prefix("PI")).unwrap()
    }

    fn build(c: &Compilation, entity: &str, values: &[(&str, Value)]) -> Instance {
        let mut b = Builder::new(c, entity).unwrap();
        for (k, v) in values {
            b.set(k, v.clone()).unwrap();
        }
        b.build().instance
    }

    #[test]
    fn incoming_dirty_values_win() {
        let c = compilation();
        let current = build(&c, "counter", &[("name", json!("a")), ("count", json!(1))]);
        let incoming = build(&c, "counter", &[("name", json!("b"))]);
        let merged = merge(&c, &current, &incoming, MergeInitKind::FromMerge).unwrap().instance;
        assert_eq!(merged.get("name"), Some(&json!("b")));
        assert_eq!(merged.get("count"), Some(&json!(1)));
        assert_eq!(merged.get("extra"), None);
    }

    #[test]
    fn ancestors_merge_first_as_submerge() {
        let c = compilation();
        let current = build(&c, "secret_board", &[("name", json!("a"))]);
        let incoming = build(&c, "secret_board", &[("name", json!("b")), ("password", json!("pw"))]);
        let out = merge(&c, &current, &incoming, MergeInitKind::FromMerge).unwrap();
        assert_eq!(
            out.notifications,
            vec![
                InitNotification {
                    entity: "board".into(),
                    selector: "PIBoardDidInitialize:".into(),
                    kind: MergeInitKind::FromSubmerge,
                },
                InitNotification {
                    entity: "secret_board".into(),
                    selector: "PIBoardDidInitialize:".into(),
                    kind: MergeInitKind::FromMerge,
                },
            ]
        );
        // `name` is owned by the parent level
        assert!(out.instance.dirty_bits("board").unwrap().contains(0));
        assert!(out.instance.dirty_bits("secret_board").unwrap().contains(0));
        assert_eq!(out.instance.get("name"), Some(&json!("b")));
        assert_eq!(out.instance.get("password"), Some(&json!("pw")));
    }

    #[test]
    fn construction_notifies_default() {
        let c = compilation();
        let mut b = Builder::new(&c, "secret_board").unwrap();
        b.set("password", json!("x")).unwrap();
        let out = b.build();
        assert!(out.notifications.iter().all(|n| n.kind == MergeInitKind::Default));
        assert_eq!(out.notifications.len(), 2);
    }

    #[test]
    fn builder_from_instance_keeps_dirty_bits() {
        let c = compilation();
        let inst = build(&c, "counter", &[("count", json!(3))]);
        let again = Builder::from_instance(&c, &inst).unwrap().build().instance;
        assert_eq!(again, inst);
    }

    #[test]
    fn malformed_merges_are_rejected() {
        let c = compilation();
        let a = build(&c, "counter", &[]);
        let b = build(&c, "board", &[]);
        assert_eq!(
            merge(&c, &a, &b, MergeInitKind::FromMerge).unwrap_err(),
            MergeError::EntityMismatch { current: "counter".into(), incoming: "board".into() }
        );
        assert_eq!(
            merge(&c, &a, &a, MergeInitKind::Default).unwrap_err(),
            MergeError::DefaultInitKind { entity: "counter".into() }
        );
        let mut builder = Builder::new(&c, "board").unwrap();
        assert!(matches!(
            builder.set("password", json!("x")),
            Err(MergeError::UnknownProperty { .. })
        ));
        assert!(matches!(Builder::new(&c, "nope"), Err(MergeError::UnknownEntity(_))));
    }

    fn arb_fields() -> impl Strategy<Value = Vec<(&'static str, Value)>> {
        let names = ["name", "count", "extra"];
        proptest::sample::subsequence(names.to_vec(), 0..=3).prop_flat_map(|picked| {
            let n = picked.len();
            proptest::collection::vec(any::<i64>(), n).prop_map(move |vals| {
                picked.iter().copied().zip(vals.into_iter().map(|v| json!(v))).collect::<Vec<_>>()
            })
        })
    }

    fn arb_merge_kind() -> impl Strategy<Value = MergeInitKind> {
        prop_oneof![Just(MergeInitKind::FromMerge), Just(MergeInitKind::FromSubmerge)]
    }

    proptest! {
        #[test]
        fn empty_incoming_is_identity(fields in arb_fields(), kind in arb_merge_kind()) {
            let c = compilation();
            let current = build(&c, "counter", &fields);
            let incoming = build(&c, "counter", &[]);
            let merged = merge(&c, &current, &incoming, kind).unwrap().instance;
            prop_assert_eq!(merged, current);
        }

        #[test]
        fn merge_is_right_biased(
            old in arb_fields(),
            new in arb_fields(),
            kind in arb_merge_kind(),
        ) {
            let c = compilation();
            let current = build(&c, "counter", &old);
            let incoming = build(&c, "counter", &new);
            let merged = merge(&c, &current, &incoming, kind).unwrap().instance;
            for name in ["name", "count", "extra"] {
                let expected = match new.iter().find(|(k, _)| *k == name) {
                    Some((_, v)) => Some(v),
                    None => current.get(name),
                };
                prop_assert_eq!(merged.get(name), expected);
            }
        }
    }
}
