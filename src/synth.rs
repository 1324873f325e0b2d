//! Class & builder descriptor synthesis.
//!
//! One [`ModelDescriptor`] per entity: the class descriptor (names, own
//! properties, dirty bits, forward references, hook) plus the mapped type,
//! ownership and coercion rule of every own property.
use std::collections::{BTreeSet, HashMap, HashSet};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::coerce::{rule_for_variant, CoercionRule};
use crate::error::{CompileError, Diagnostic};
use crate::ir::{Atomicity, Mutability, OwnershipMode, TargetType};
use crate::lower::{map_type, TypeMapping};
use crate::naming::{self, NamingConfig};
use crate::schema::{Entity, PropertyDescriptor, PropertyVariant, SchemaGraph};

/// Reported as the property name for an entity's `additionalProperties`.
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentLink {
    pub entity: String,
    pub class_name: String,
    pub builder_class_name: String,
}

/// The optional `<Class>DidInitialize:` notification. Declared by the root of
/// a hierarchy; descendants point at the root's declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityHook {
    pub protocol_name: String,
    pub selector: String,
    pub declared_here: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDescriptor {
    pub entity: String,
    pub class_name: String,
    pub builder_class_name: String,
    pub dirty_properties_name: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_root: bool,
    pub parent: Option<ParentLink>,
    /// Declared properties minus every name an ancestor declares.
    pub own_properties: Vec<PropertyDescriptor>,
    /// Class names to forward-declare, self excluded.
    pub forward_references: BTreeSet<String>,
    /// Own property name → bit index, in declaration order.
    pub dirty_bits: IndexMap<String, u32>,
    pub capability_hook: CapabilityHook,
    pub property_names: Vec<String>,
    pub array_property_names: Vec<String>,
    pub dictionary_property_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub atomicity: Atomicity,
    pub ownership: OwnershipMode,
    /// Mutability on the model class.
    pub model: Mutability,
    /// Mutability on the builder.
    pub builder: Mutability,
    pub is_pointer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyModel {
    pub name: String,
    pub property_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ty: TargetType,
    pub type_name: String,
    pub ownership: OwnershipMode,
    pub coercion: CoercionRule,
    pub dirty_bit: u32,
    pub dirty_option_name: String,
    pub declaration: Declaration,
}

/// Mapped shape of the undeclared keys of a map-like entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueModel {
    pub ty: TargetType,
    pub type_name: String,
    pub ownership: OwnershipMode,
    pub coercion: CoercionRule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub class: ClassDescriptor,
    pub properties: Vec<PropertyModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<ValueModel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

// ————————————————————————————————————————————————————————————————————————————
// SYNTHESIS
// ————————————————————————————————————————————————————————————————————————————

pub fn synthesize(
    entity: &Entity,
    graph: &SchemaGraph,
    naming: &NamingConfig,
) -> Result<ModelDescriptor, CompileError> {
    let ancestors = graph.ancestors(entity)?;
    check_inherited_names(entity, &ancestors)?;
    let own = own_properties(entity, &ancestors);
    let dirty_bits = assign_dirty_bits(&own);

    let class_name = naming.class_name(&entity.name);
    let mut diagnostics = Vec::new();
    let mut properties = Vec::with_capacity(own.len());

    for (prop, bit) in own.iter().zip(dirty_bits.values()) {
        let mapping = map_type(graph, naming, &prop.variant);
        let coercion = rule_for_variant(graph, naming, &prop.variant).map_err(|source| {
            CompileError::InvalidContainerElement {
                entity: entity.name.clone(),
                property: prop.name.clone(),
                source,
            }
        })?;
        report_unresolved(&entity.name, Some(prop.name.as_str()), &mapping, &mut diagnostics);
        properties.push(property_model(&class_name, prop, mapping, coercion, *bit));
    }

    let additional_properties = match &entity.additional_properties {
        Some(value) => {
            let model = value_model(graph, naming, value).map_err(|source| {
                CompileError::InvalidContainerElement {
                    entity: entity.name.clone(),
                    property: ADDITIONAL_PROPERTIES.to_string(),
                    source,
                }
            })?;
            for target in model.ty.unresolved_targets() {
                warn!(entity = %entity.name, reference = target, "additionalProperties reference does not resolve");
                diagnostics.push(Diagnostic::unresolved_reference(&entity.name, Some(ADDITIONAL_PROPERTIES), target));
            }
            Some(model)
        }
        None => None,
    };

    let forward_references = forward_references(&class_name, &properties);

    let parent = ancestors.last().map(|p| {
        let parent_class = naming.class_name(&p.name);
        ParentLink {
            entity: p.name.clone(),
            builder_class_name: naming::builder_class_name(&parent_class),
            class_name: parent_class,
        }
    });

    // root of the hierarchy owns the hook declaration
    let root_class = ancestors.first().map(|r| naming.class_name(&r.name)).unwrap_or_else(|| class_name.clone());
    let capability_hook = CapabilityHook {
        protocol_name: naming::protocol_name(&root_class),
        selector: naming::did_initialize_selector(&root_class),
        declared_here: entity.is_root(),
    };

    let names_where = |pred: fn(&PropertyVariant) -> bool| -> Vec<String> {
        properties
            .iter()
            .zip(own.iter())
            .filter(|(_, d)| pred(&d.variant))
            .map(|(m, _)| m.property_name.clone())
            .collect()
    };
    let array_property_names = names_where(|v| matches!(v, PropertyVariant::Array { .. }));
    let dictionary_property_names = names_where(|v| matches!(v, PropertyVariant::Map { .. }));
    let property_names = properties.iter().map(|m| m.property_name.clone()).collect();

    debug!(
        entity = %entity.name,
        class = %class_name,
        own = properties.len(),
        depth = ancestors.len(),
        "synthesized model"
    );

    let class = ClassDescriptor {
        entity: entity.name.clone(),
        builder_class_name: naming::builder_class_name(&class_name),
        dirty_properties_name: naming::dirty_properties_name(&class_name),
        file_name: naming::header_file_name(&class_name),
        class_name,
        description: entity.description.clone(),
        is_root: entity.is_root(),
        parent,
        own_properties: own.into_iter().cloned().collect(),
        forward_references,
        dirty_bits,
        capability_hook,
        property_names,
        array_property_names,
        dictionary_property_names,
    };

    Ok(ModelDescriptor { class, properties, additional_properties, diagnostics })
}

/// Declared properties of `entity` whose names no ancestor declares.
pub fn own_properties<'a>(entity: &'a Entity, ancestors: &[&Entity]) -> Vec<&'a PropertyDescriptor> {
    let inherited: HashSet<&str> = ancestors.iter().flat_map(|a| a.declared_names()).collect();
    entity
        .properties
        .iter()
        .filter(|p| !inherited.contains(p.name.as_str()))
        .collect()
}

/// A redeclared ancestor property is fine; a different source name that
/// generates the same property identifier is not.
fn check_inherited_names(entity: &Entity, ancestors: &[&Entity]) -> Result<(), CompileError> {
    let mut inherited = HashMap::<String, (&str, &str)>::new();
    for ancestor in ancestors {
        for name in ancestor.declared_names() {
            inherited.insert(naming::property_name(name), (ancestor.name.as_str(), name));
        }
    }
    for prop in &entity.properties {
        match inherited.get(&naming::property_name(&prop.name)) {
            Some((ancestor, name)) if *name != prop.name => {
                return Err(CompileError::InheritedNameCollision {
                    entity: entity.name.clone(),
                    property: prop.name.clone(),
                    ancestor: ancestor.to_string(),
                    inherited: name.to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// One increasing bit per property, in declaration order. Appending a
/// property never renumbers the existing ones.
pub fn assign_dirty_bits(own: &[&PropertyDescriptor]) -> IndexMap<String, u32> {
    own.iter()
        .enumerate()
        .map(|(i, p)| (p.name.clone(), i as u32))
        .collect()
}

fn forward_references(class_name: &str, properties: &[PropertyModel]) -> BTreeSet<String> {
    properties
        .iter()
        .flat_map(|m| m.ty.class_names())
        .filter(|name| *name != class_name)
        .map(str::to_string)
        .collect()
}

fn property_model(
    class_name: &str,
    prop: &PropertyDescriptor,
    mapping: TypeMapping,
    coercion: CoercionRule,
    dirty_bit: u32,
) -> PropertyModel {
    let TypeMapping { ty, ownership } = mapping;
    PropertyModel {
        name: prop.name.clone(),
        property_name: naming::property_name(&prop.name),
        description: prop.description.clone(),
        type_name: ty.to_string(),
        declaration: Declaration {
            atomicity: Atomicity::NonAtomic,
            ownership,
            model: Mutability::ReadOnly,
            builder: Mutability::ReadWrite,
            is_pointer: ty.is_pointer(),
        },
        ty,
        ownership,
        coercion,
        dirty_bit,
        dirty_option_name: naming::dirty_option_name(class_name, &prop.name),
    }
}

fn value_model(
    graph: &SchemaGraph,
    naming: &NamingConfig,
    value: &PropertyVariant,
) -> Result<ValueModel, crate::error::ContainerElementError> {
    let as_map = PropertyVariant::map_of(value.clone());
    let coercion = rule_for_variant(graph, naming, &as_map)?;
    let TypeMapping { ty, ownership } = map_type(graph, naming, &as_map);
    Ok(ValueModel { type_name: ty.to_string(), ty, ownership, coercion })
}

fn report_unresolved(entity: &str, property: Option<&str>, mapping: &TypeMapping, out: &mut Vec<Diagnostic>) {
    for target in mapping.ty.unresolved_targets() {
        warn!(entity, property, reference = target, "reference does not resolve; emitting empty type name");
        out.push(Diagnostic::unresolved_reference(entity, property, target));
    }
}

// ------------------------------- Tests ------------------------------------ //
