//! Type mapper: property variant → target type + ownership.
use serde::Serialize;

use crate::ir::{OwnershipMode, TargetType};
use crate::naming::NamingConfig;
use crate::schema::{PropertyVariant, SchemaGraph, TextFormat, Unresolved};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMapping {
    pub ty: TargetType,
    pub ownership: OwnershipMode,
}

impl TypeMapping {
    pub fn is_unresolved(&self) -> bool {
        !self.ty.unresolved_targets().is_empty()
    }
}

/// Map a variant to its target type and ownership.
///
/// Pure: the graph is only read. An unknown reference target is not an error
/// here; it lowers to [`TargetType::Unresolved`] and the caller is expected to
/// surface a diagnostic.
pub fn map_type(graph: &SchemaGraph, naming: &NamingConfig, variant: &PropertyVariant) -> TypeMapping {
    let ty = lower_to_ir(graph, naming, variant);
    let ownership = ty.ownership();
    TypeMapping { ty, ownership }
}

pub fn lower_to_ir(graph: &SchemaGraph, naming: &NamingConfig, variant: &PropertyVariant) -> TargetType {
    match variant {
        // 1) Text, by format
        PropertyVariant::Text { format } => match format {
            TextFormat::Uri => TargetType::Url,
            TextFormat::DateTime => TargetType::Date,
            TextFormat::Plain => TargetType::String,
        },

        // 2) Scalars, no wrapper
        PropertyVariant::Scalar { scalar } => TargetType::Primitive { primitive: (*scalar).into() },

        // 3) + 4) Containers, parametrized when the element is typed
        PropertyVariant::Array { element } => TargetType::Sequence {
            element: element.as_deref().map(|el| Box::new(lower_to_ir(graph, naming, el))),
        },
        PropertyVariant::Map { value } => TargetType::Dictionary {
            value: value.as_deref().map(|v| Box::new(lower_to_ir(graph, naming, v))),
        },

        // 5) References
        PropertyVariant::Reference { target } => lower_reference(graph, naming, target),
    }
}

fn lower_reference(graph: &SchemaGraph, naming: &NamingConfig, target: &str) -> TargetType {
    match graph.resolve(target) {
        Ok(entity) => TargetType::Class {
            entity: entity.name.clone(),
            class_name: naming.class_name(&entity.name),
        },
        Err(Unresolved(target)) => TargetType::Unresolved { target },
    }
}

// ------------------------------- Tests ------------------------------------ //
