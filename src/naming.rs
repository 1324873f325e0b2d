//! Class and property naming.
use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};

/// The only knob the compiler takes. Absent prefix → bare class names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name_prefix: Option<String>,
}

impl NamingConfig {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { class_name_prefix: Some(prefix.into()) }
    }

    /// `secret_board` → `PISecretBoard` (with prefix `PI`).
    pub fn class_name(&self, entity_name: &str) -> String {
        let base = entity_name.to_case(Case::Pascal);
        match &self.class_name_prefix {
            Some(prefix) => format!("{prefix}{base}"),
            None => base,
        }
    }
}

/// `image_url` → `imageUrl`.
pub fn property_name(source: &str) -> String {
    source.to_case(Case::Camel)
}

pub fn builder_class_name(class_name: &str) -> String {
    format!("{class_name}Builder")
}

pub fn dirty_properties_name(class_name: &str) -> String {
    format!("{class_name}DirtyProperties")
}

/// Name of the one-bit flag for `property` inside the dirty-properties record.
pub fn dirty_option_name(class_name: &str, property: &str) -> String {
    format!("{class_name}DirtyProperty{}", property.to_case(Case::Pascal))
}

pub fn protocol_name(class_name: &str) -> String {
    format!("{class_name}Protocol")
}

pub fn did_initialize_selector(class_name: &str) -> String {
    format!("{class_name}DidInitialize:")
}

pub fn header_file_name(class_name: &str) -> String {
    format!("{class_name}.h")
}
