use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarKind {
    Boolean,
    Integer,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextFormat {
    #[default]
    Plain,
    Uri,
    DateTime,
}

/// Which container a nested element lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerKind {
    Array,
    Map,
}

/// The closed set of property shapes.
///
/// Container elements are optional: an untyped `items` / `additionalProperties`
/// lowers to an unparametrized container. A container whose element is a bare
/// [`PropertyVariant::Scalar`] can be built here but is rejected when the
/// property is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PropertyVariant {
    Scalar { scalar: ScalarKind },
    Text { format: TextFormat },
    Array { element: Option<Box<PropertyVariant>> },
    Map { value: Option<Box<PropertyVariant>> },
    Reference { target: String },
}

impl PropertyVariant {
    pub fn boolean() -> Self { Self::Scalar { scalar: ScalarKind::Boolean } }
    pub fn integer() -> Self { Self::Scalar { scalar: ScalarKind::Integer } }
    pub fn number() -> Self { Self::Scalar { scalar: ScalarKind::Number } }
    pub fn text() -> Self { Self::Text { format: TextFormat::Plain } }
    pub fn uri() -> Self { Self::Text { format: TextFormat::Uri } }
    pub fn date_time() -> Self { Self::Text { format: TextFormat::DateTime } }

    pub fn array_of(element: PropertyVariant) -> Self {
        Self::Array { element: Some(Box::new(element)) }
    }

    pub fn map_of(value: PropertyVariant) -> Self {
        Self::Map { value: Some(Box::new(value)) }
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Self::Reference { target: target.into() }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar { .. })
    }

    /// Container kind and element, if this is an array or map.
    pub fn container(&self) -> Option<(ContainerKind, Option<&PropertyVariant>)> {
        match self {
            Self::Array { element } => Some((ContainerKind::Array, element.as_deref())),
            Self::Map { value } => Some((ContainerKind::Map, value.as_deref())),
            _ => None,
        }
    }

    /// Every reference target reachable from this variant, containers included.
    pub fn reference_targets(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_targets(self, &mut out);
        out
    }
}

fn collect_targets<'a>(v: &'a PropertyVariant, out: &mut Vec<&'a str>) {
    match v {
        PropertyVariant::Reference { target } => out.push(target),
        PropertyVariant::Array { element: Some(inner) }
        | PropertyVariant::Map { value: Some(inner) } => collect_targets(inner, out),
        PropertyVariant::Array { element: None }
        | PropertyVariant::Map { value: None }
        | PropertyVariant::Scalar { .. }
        | PropertyVariant::Text { .. } => {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    pub variant: PropertyVariant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, variant: PropertyVariant) -> Self {
        Self { name: name.into(), variant, description: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
