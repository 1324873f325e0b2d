//! Error taxonomy.
//!
//! Fatal schema defects are `Err` values; the single recoverable outcome
//! (an unresolved reference) is a [`Diagnostic`] carried next to the result.
use std::fmt;
use serde::Serialize;
use thiserror::Error as ThisError;

use crate::schema::{ContainerKind, ScalarKind};

// ————————————————————————————————————————————————————————————————————————————
// LOAD
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, ThisError)]
pub enum LoadError {
    #[error("at JSON path {at} → {message}")]
    Decode { at: String, message: String },

    #[error("JSON pointer `{0}` selects nothing")]
    PointerMiss(String),

    #[error("{at}: unknown type `{ty}`")]
    UnknownType { at: String, ty: String },

    #[error("{at}: node has neither `type` nor `$ref`")]
    MissingType { at: String },

    #[error("`{name}` is not a valid identifier ({at})")]
    InvalidIdentifier { name: String, at: String },

    #[error("entity `{0}` is declared more than once")]
    DuplicateEntity(String),

    #[error("entity `{entity}` declares property `{property}` more than once")]
    DuplicateProperty { entity: String, property: String },

    #[error("entity `{entity}`: properties `{first}` and `{second}` both become `{name}`")]
    PropertyNameCollision { entity: String, first: String, second: String, name: String },

    #[error("entities `{first}` and `{second}` both become class `{class_name}`")]
    ClassNameCollision { first: String, second: String, class_name: String },
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILE
// ————————————————————————————————————————————————————————————————————————————

/// Raised when a container holds a bare scalar. Primitives may never appear
/// unwrapped inside an array or map.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{container:?} element is a bare {scalar:?} scalar")]
pub struct ContainerElementError {
    pub container: ContainerKind,
    pub scalar: ScalarKind,
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum CompileError {
    #[error("entity `{entity}` has a cyclic parent chain: {}", chain.join(" -> "))]
    CyclicParentChain { entity: String, chain: Vec<String> },

    #[error("entity `{entity}` names unknown parent `{parent}`")]
    UnknownParent { entity: String, parent: String },

    #[error("entity `{entity}`, property `{property}`: {source}")]
    InvalidContainerElement {
        entity: String,
        property: String,
        #[source]
        source: ContainerElementError,
    },

    #[error("entity `{entity}`: property `{property}` collides with inherited `{inherited}` of `{ancestor}`")]
    InheritedNameCollision {
        entity: String,
        property: String,
        ancestor: String,
        inherited: String,
    },

    #[error("entity `{entity}` inherits from `{ancestor}`, which failed to compile")]
    FailedAncestor { entity: String, ancestor: String },
}

impl CompileError {
    /// Whether the whole run must stop, as opposed to just the entity.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::CyclicParentChain { .. } | Self::UnknownParent { .. })
    }

    /// The entity the error is reported against.
    pub fn entity(&self) -> &str {
        match self {
            Self::CyclicParentChain { entity, .. }
            | Self::UnknownParent { entity, .. }
            | Self::InvalidContainerElement { entity, .. }
            | Self::InheritedNameCollision { entity, .. }
            | Self::FailedAncestor { entity, .. } => entity,
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MERGE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum MergeError {
    #[error("cannot merge a `{incoming}` instance into a `{current}` instance")]
    EntityMismatch { current: String, incoming: String },

    #[error("merge into `{entity}` was tagged Default; Default is reserved for construction")]
    DefaultInitKind { entity: String },

    #[error("no compiled model for entity `{0}`")]
    UnknownEntity(String),

    #[error("entity `{entity}` has no property `{property}`")]
    UnknownProperty { entity: String, property: String },
}

// ————————————————————————————————————————————————————————————————————————————
// DIAGNOSTICS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// The reference target is absent from the graph; the mapped type
    /// degrades to an empty name.
    UnresolvedReference { target: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn unresolved_reference(entity: &str, property: Option<&str>, target: &str) -> Self {
        Self {
            severity: Severity::Warning,
            entity: entity.to_string(),
            property: property.map(str::to_string),
            kind: DiagnosticKind::UnresolvedReference { target: target.to_string() },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let site = match &self.property {
            Some(p) => format!("{}.{}", self.entity, p),
            None => self.entity.clone(),
        };
        match &self.kind {
            DiagnosticKind::UnresolvedReference { target } => {
                write!(f, "{site}: reference `{target}` does not resolve; emitting an empty type name")
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TOP LEVEL
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
