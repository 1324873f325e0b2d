//! Schema data model and the reference resolver.
//!
//! A [`SchemaGraph`] is built once per run from externally parsed entities and
//! is read-only afterwards. Everything downstream borrows it.
pub mod graph;
pub mod variant;

use once_cell::sync::Lazy;
use regex::Regex;

pub use graph::{reference_key, Entity, SchemaGraph, Unresolved};
pub use variant::{ContainerKind, PropertyDescriptor, PropertyVariant, ScalarKind, TextFormat};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Entity and property names must be plain identifiers.
pub fn is_identifier(s: &str) -> bool {
    IDENTIFIER.is_match(s)
}
