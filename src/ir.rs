// Strongly-typed IR handed to the renderer. No schema nodes here.
use std::fmt;
use serde::Serialize;

use crate::schema::ScalarKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveType {
    Boolean,  // BOOL
    Integer,  // NSInteger
    Float,    // CGFloat
}

/// Mapped target type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TargetType {
    Primitive { primitive: PrimitiveType },
    String,
    Url,
    Date,
    /// Ordered sequence; `None` when the element is untyped.
    Sequence { element: Option<Box<TargetType>> },
    /// String-keyed dictionary; `None` when the value is untyped.
    Dictionary { value: Option<Box<TargetType>> },
    /// A generated model class (prefix already applied).
    Class { entity: String, class_name: String },
    /// Reference whose target is not in the graph. Renders as an empty name.
    Unresolved { target: String },
}

/// Reference/value semantics of a generated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OwnershipMode {
    Copy,
    Strong,
    Weak,
    Assign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Atomicity {
    Atomic,
    NonAtomic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    ReadOnly,
    ReadWrite,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl From<ScalarKind> for PrimitiveType {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Boolean => Self::Boolean,
            ScalarKind::Integer => Self::Integer,
            ScalarKind::Number => Self::Float,
        }
    }
}

impl PrimitiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "BOOL",
            Self::Integer => "NSInteger",
            Self::Float => "CGFloat",
        }
    }
}

impl TargetType {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive { .. })
    }

    /// Non-primitives are declared through a pointer.
    pub fn is_pointer(&self) -> bool {
        !self.is_primitive()
    }

    /// Ownership follows from the mapped type alone.
    pub fn ownership(&self) -> OwnershipMode {
        match self {
            Self::Primitive { .. } => OwnershipMode::Assign,
            Self::String | Self::Url | Self::Date => OwnershipMode::Copy,
            Self::Sequence { .. }
            | Self::Dictionary { .. }
            | Self::Class { .. }
            | Self::Unresolved { .. } => OwnershipMode::Strong,
        }
    }

    /// Class names referenced anywhere inside this type.
    pub fn class_names(&self) -> Vec<&str> {
        match self {
            Self::Class { class_name, .. } => vec![class_name.as_str()],
            Self::Sequence { element: Some(inner) } | Self::Dictionary { value: Some(inner) } => {
                inner.class_names()
            }
            _ => Vec::new(),
        }
    }

    /// Unresolved targets referenced anywhere inside this type.
    pub fn unresolved_targets(&self) -> Vec<&str> {
        match self {
            Self::Unresolved { target } => vec![target.as_str()],
            Self::Sequence { element: Some(inner) } | Self::Dictionary { value: Some(inner) } => {
                inner.unresolved_targets()
            }
            _ => Vec::new(),
        }
    }
}




/// Target spelling of the type, without the trailing declarator `*`.
impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive { primitive } => f.write_str(primitive.as_str()),
            Self::String => f.write_str("NSString"),
            Self::Url => f.write_str("NSURL"),
            Self::Date => f.write_str("NSDate"),
            Self::Sequence { element: None } => f.write_str("NSArray"),
            Self::Sequence { element: Some(el) } => write!(f, "NSArray<{el} *>"),
            Self::Dictionary { value: None } => f.write_str("NSDictionary"),
            Self::Dictionary { value: Some(v) } => write!(f, "NSDictionary<NSString *, {v} *>"),
            Self::Class { class_name, .. } => f.write_str(class_name),
            Self::Unresolved { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelling_nests() {
        let tag = TargetType::Class { entity: "tag".into(), class_name: "PITag".into() };
        let ty = TargetType::Dictionary {
            value: Some(Box::new(TargetType::Sequence { element: Some(Box::new(tag)) })),
        };
        assert_eq!(ty.to_string(), "NSDictionary<NSString *, NSArray<PITag *> *>");
        assert_eq!(TargetType::Sequence { element: None }.to_string(), "NSArray");
        assert_eq!(TargetType::Unresolved { target: "x".into() }.to_string(), "");
    }

    #[test]
    fn ownership_by_shape() {
        let int = TargetType::Primitive { primitive: PrimitiveType::Integer };
        assert_eq!(int.ownership(), OwnershipMode::Assign);
        assert!(!int.is_pointer());
        assert_eq!(TargetType::Url.ownership(), OwnershipMode::Copy);
        assert_eq!(TargetType::Date.ownership(), OwnershipMode::Copy);
        assert_eq!(TargetType::Dictionary { value: None }.ownership(), OwnershipMode::Strong);
        assert_eq!(TargetType::Unresolved { target: "x".into() }.ownership(), OwnershipMode::Strong);
    }
}
