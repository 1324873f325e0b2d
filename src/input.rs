//! Input graph documents.
//!
//! Decoding reports the JSON path of the offending node. Node keywords follow
//! JSON Schema (`type`, `format`, `items`, `additionalProperties`, `$ref`).
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::LoadError;
use crate::schema::{Entity, PropertyDescriptor, PropertyVariant, SchemaGraph, TextFormat};

// ————————————————————————————————————————————————————————————————————————————
// RAW TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    pub entities: Vec<RawEntity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntity {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Vec<RawProperty>,
    #[serde(default)]
    pub additional_properties: Option<RawAdditional>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProperty {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub node: RawNode,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNode {
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub items: Option<Box<RawNode>>,
    #[serde(default)]
    pub additional_properties: Option<RawAdditional>,
    #[serde(default, rename = "$ref")]
    pub reference: Option<String>,
}

/// `additionalProperties` is either a schema or a JSON Schema boolean.
/// Booleans carry no value shape and lower to an untyped map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAdditional {
    Flag(bool),
    Node(Box<RawNode>),
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSION
// ————————————————————————————————————————————————————————————————————————————

impl RawAdditional {
    fn node(&self) -> Option<&RawNode> {
        match self {
            Self::Flag(_) => None,
            Self::Node(node) => Some(node),
        }
    }
}

impl RawNode {
    pub fn to_variant(&self, at: &str) -> Result<PropertyVariant, LoadError> {
        if let Some(target) = &self.reference {
            return Ok(PropertyVariant::Reference { target: target.clone() });
        }
        let Some(ty) = self.ty.as_deref() else {
            return Err(LoadError::MissingType { at: at.to_string() });
        };
        let variant = match ty {
            "boolean" => PropertyVariant::boolean(),
            "integer" => PropertyVariant::integer(),
            "number" => PropertyVariant::number(),
            "string" => PropertyVariant::Text { format: text_format(self.format.as_deref()) },
            "array" => PropertyVariant::Array {
                element: nested(self.items.as_deref(), &format!("{at}.items"))?,
            },
            "object" => PropertyVariant::Map {
                value: nested(
                    self.additional_properties.as_ref().and_then(RawAdditional::node),
                    &format!("{at}.additionalProperties"),
                )?,
            },
            other => {
                return Err(LoadError::UnknownType { at: at.to_string(), ty: other.to_string() });
            }
        };
        Ok(variant)
    }
}

fn nested(node: Option<&RawNode>, at: &str) -> Result<Option<Box<PropertyVariant>>, LoadError> {
    node.map(|n| n.to_variant(at).map(Box::new)).transpose()
}

fn text_format(format: Option<&str>) -> TextFormat {
    match format {
        Some("uri") => TextFormat::Uri,
        Some("date-time") => TextFormat::DateTime,
        _ => TextFormat::Plain,
    }
}

impl RawEntity {
    pub fn into_entity(self) -> Result<Entity, LoadError> {
        let mut properties = Vec::with_capacity(self.properties.len());
        for prop in self.properties {
            let at = format!("{}.{}", self.name, prop.name);
            properties.push(PropertyDescriptor {
                variant: prop.node.to_variant(&at)?,
                name: prop.name,
                description: prop.description,
            });
        }
        let additional_properties = match self.additional_properties.as_ref().and_then(RawAdditional::node) {
            Some(node) => Some(node.to_variant(&format!("{}.additionalProperties", self.name))?),
            None => None,
        };
        Ok(Entity {
            name: self.name,
            properties,
            parent: self.parent,
            additional_properties,
            description: self.description,
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(decode_error)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, LoadError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(decode_error)
}

fn decode_error(err: serde_path_to_error::Error<serde_json::Error>) -> LoadError {
    let at = err.path().to_string();
    LoadError::Decode { at, message: err.into_inner().to_string() }
}

/// Entities of one document. `pointer` selects the graph inside a larger
/// JSON document.
pub fn load_document(src: &str, pointer: Option<&str>) -> Result<Vec<Entity>, LoadError> {
    let doc: RawDocument = match pointer {
        None => from_str_with_path(src)?,
        Some(pointer) => {
            let mut root: Value = from_str_with_path(src)?;
            let selected = root
                .pointer_mut(pointer)
                .map(Value::take)
                .ok_or_else(|| LoadError::PointerMiss(pointer.to_string()))?;
            from_value_with_path(selected)?
        }
    };
    doc.entities.into_iter().map(RawEntity::into_entity).collect()
}

/// Build one graph out of several documents.
pub fn load_graph<'a, I>(sources: I, pointer: Option<&str>) -> Result<SchemaGraph, LoadError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut entities = Vec::new();
    for src in sources {
        entities.extend(load_document(src, pointer)?);
    }
    SchemaGraph::new(entities)
}

// ------------------------------- Tests ------------------------------------ //
