use std::collections::{HashMap, HashSet};
use dashmap::DashMap;
use indexmap::IndexMap;
use thiserror::Error as ThisError;

use super::{is_identifier, PropertyDescriptor, PropertyVariant};
use crate::error::{CompileError, LoadError};
use crate::naming::{self, NamingConfig};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A named object-shaped schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub properties: Vec<PropertyDescriptor>,
    /// Reference to the parent entity, matched like any `$ref`.
    pub parent: Option<String>,
    /// Value shape of undeclared keys, for map-like entities.
    pub additional_properties: Option<PropertyVariant>,
    pub description: Option<String>,
}

/// The reference target is not part of the graph.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("reference `{0}` does not resolve")]
pub struct Unresolved(pub String);

/// Every entity of one compilation run, keyed by name.
///
/// Read-only once built. Reference lookups are memoized in a concurrent map so
/// per-entity work can run on several threads against the same graph.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    entities: IndexMap<String, Entity>,
    resolved: DashMap<String, Option<usize>>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            parent: None,
            additional_properties: None,
            description: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, variant: PropertyVariant) -> Self {
        self.properties.push(PropertyDescriptor::new(name, variant));
        self
    }

    pub fn with_additional_properties(mut self, variant: PropertyVariant) -> Self {
        self.additional_properties = Some(variant);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }
}

impl SchemaGraph {
    /// Build the graph. Names are checked here; references and parents are
    /// only checked when something resolves them.
    pub fn new<I>(entities: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = Entity>,
    {
        let mut out = IndexMap::<String, Entity>::new();
        let mut classes = HashMap::<String, String>::new();
        for entity in entities {
            if !is_identifier(&entity.name) {
                return Err(LoadError::InvalidIdentifier {
                    name: entity.name.clone(),
                    at: "entity name".to_string(),
                });
            }
            let mut seen = HashSet::new();
            let mut generated = HashMap::<String, &str>::new();
            for prop in &entity.properties {
                if !is_identifier(&prop.name) {
                    return Err(LoadError::InvalidIdentifier {
                        name: prop.name.clone(),
                        at: format!("property of `{}`", entity.name),
                    });
                }
                if !seen.insert(prop.name.as_str()) {
                    return Err(LoadError::DuplicateProperty {
                        entity: entity.name.clone(),
                        property: prop.name.clone(),
                    });
                }
                let name = naming::property_name(&prop.name);
                if let Some(first) = generated.insert(name.clone(), prop.name.as_str()) {
                    return Err(LoadError::PropertyNameCollision {
                        entity: entity.name.clone(),
                        first: first.to_string(),
                        second: prop.name.clone(),
                        name,
                    });
                }
            }
            if out.contains_key(&entity.name) {
                return Err(LoadError::DuplicateEntity(entity.name));
            }
            // the class prefix is shared, so comparing bare class names is enough
            let class_name = NamingConfig::default().class_name(&entity.name);
            if let Some(first) = classes.insert(class_name.clone(), entity.name.clone()) {
                return Err(LoadError::ClassNameCollision { first, second: entity.name, class_name });
            }
            out.insert(entity.name.clone(), entity);
        }
        Ok(Self { entities: out, resolved: DashMap::new() })
    }

    pub fn len(&self) -> usize { self.entities.len() }
    pub fn is_empty(&self) -> bool { self.entities.is_empty() }

    /// Entities in declaration order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Exact lookup by entity name, no reference normalization.
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Resolve a `$ref`-style name to its entity.
    pub fn resolve(&self, reference: &str) -> Result<&Entity, Unresolved> {
        let cached = self.resolved.get(reference).map(|hit| *hit);
        let index = match cached {
            Some(index) => index,
            None => {
                let index = self.entities.get_index_of(reference_key(reference));
                self.resolved.insert(reference.to_string(), index);
                index
            }
        };
        index
            .and_then(|i| self.entities.get_index(i))
            .map(|(_, entity)| entity)
            .ok_or_else(|| Unresolved(reference.to_string()))
    }

    /// The parent chain of `entity`, root first, excluding `entity` itself.
    pub fn ancestors<'a>(&'a self, entity: &'a Entity) -> Result<Vec<&'a Entity>, CompileError> {
        let mut chain: Vec<&Entity> = Vec::new();
        let mut seen = HashSet::from([entity.name.as_str()]);
        let mut cursor = entity;
        while let Some(parent_ref) = &cursor.parent {
            let parent = self.resolve(parent_ref).map_err(|_| CompileError::UnknownParent {
                entity: cursor.name.clone(),
                parent: parent_ref.clone(),
            })?;
            if !seen.insert(parent.name.as_str()) {
                let mut names = vec![entity.name.clone()];
                names.extend(chain.iter().map(|e| e.name.clone()));
                names.push(parent.name.clone());
                return Err(CompileError::CyclicParentChain {
                    entity: entity.name.clone(),
                    chain: names,
                });
            }
            chain.push(parent);
            cursor = parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Reject unknown parents and cyclic chains across the whole graph.
    pub fn check_hierarchy(&self) -> Result<(), CompileError> {
        for entity in self.entities.values() {
            self.ancestors(entity)?;
        }
        Ok(())
    }
}

/// Reduce a reference to the entity name it points at.
///
/// `#/definitions/tag`, `schemas/tag.json` and `tag` all name `tag`.
pub fn reference_key(reference: &str) -> &str {
    let tail = reference.rsplit('/').next().unwrap_or(reference);
    let tail = tail.strip_prefix('#').unwrap_or(tail);
    tail.strip_suffix(".json").unwrap_or(tail)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
