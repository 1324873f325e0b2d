//! Whole-graph compilation.
//!
//! Hierarchy defects stop the run before any synthesis. After that every
//! entity is synthesized independently on the rayon pool; an entity-level
//! defect fails that entity and every entity inheriting from it.
use std::collections::HashSet;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CompileError, Diagnostic, MergeError};
use crate::naming::NamingConfig;
use crate::schema::{Entity, SchemaGraph};
use crate::synth::{synthesize, ModelDescriptor};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFailure {
    pub entity: String,
    pub message: String,
    #[serde(skip)]
    pub error: CompileError,
}

impl EntityFailure {
    fn new(error: CompileError) -> Self {
        warn!(entity = %error.entity(), %error, "entity failed to compile");
        Self { entity: error.entity().to_string(), message: error.to_string(), error }
    }
}

/// Result of one compilation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compilation {
    pub naming: NamingConfig,
    /// Entity name → model, in graph order.
    pub models: IndexMap<String, ModelDescriptor>,
    pub failures: Vec<EntityFailure>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn compile(graph: &SchemaGraph, naming: &NamingConfig) -> Result<Compilation, CompileError> {
    graph.check_hierarchy()?;

    let entities: Vec<&Entity> = graph.entities().collect();
    let results: Vec<(String, Result<ModelDescriptor, CompileError>)> = entities
        .par_iter()
        .map(|entity| (entity.name.clone(), synthesize(entity, graph, naming)))
        .collect();

    let mut models = IndexMap::with_capacity(results.len());
    let mut failures = Vec::new();
    for (name, result) in results {
        match result {
            Ok(model) => {
                models.insert(name, model);
            }
            Err(error) => failures.push(EntityFailure::new(error)),
        }
    }

    // a subclass of a class that was never produced cannot be rendered either
    let failed: HashSet<String> = failures.iter().map(|f| f.entity.clone()).collect();
    if !failed.is_empty() {
        for entity in &entities {
            if !models.contains_key(&entity.name) {
                continue;
            }
            let ancestors = graph.ancestors(entity)?;
            if !ancestors.iter().any(|a| failed.contains(&a.name)) {
                continue;
            }
            // everything below the failed level fails too, so the parent is the nearest failure
            if let Some(parent) = ancestors.last() {
                models.shift_remove(&entity.name);
                failures.push(EntityFailure::new(CompileError::FailedAncestor {
                    entity: entity.name.clone(),
                    ancestor: parent.name.clone(),
                }));
            }
        }
    }

    let diagnostics: Vec<Diagnostic> = models.values().flat_map(|m| m.diagnostics.iter().cloned()).collect();

    info!(
        models = models.len(),
        failures = failures.len(),
        diagnostics = diagnostics.len(),
        "compilation finished"
    );

    Ok(Compilation { naming: naming.clone(), models, failures, diagnostics })
}

impl Compilation {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn model(&self, entity: &str) -> Option<&ModelDescriptor> {
        self.models.get(entity)
    }

    /// Models of `entity` and its ancestors, root first.
    pub fn chain(&self, entity: &str) -> Result<Vec<&ModelDescriptor>, MergeError> {
        let mut out = Vec::new();
        let mut cursor = Some(entity);
        while let Some(name) = cursor {
            let model = self
                .models
                .get(name)
                .ok_or_else(|| MergeError::UnknownEntity(name.to_string()))?;
            out.push(model);
            cursor = model.class.parent.as_ref().map(|p| p.entity.as_str());
        }
        out.reverse();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyVariant;

    fn graph() -> SchemaGraph {
        SchemaGraph::new(vec![
            Entity::new("board").with_property("name", PropertyVariant::text()),
            Entity::new("secret_board").with_parent("board").with_property("owner", PropertyVariant::reference("ghost")),
            Entity::new("broken").with_property("ids", PropertyVariant::array_of(PropertyVariant::integer())),
        ])
        .unwrap()
    }

    #[test]
    fn entity_failures_do_not_stop_the_run() {
        let c = compile(&graph(), &NamingConfig::default()).unwrap();
        assert_eq!(c.models.keys().collect::<Vec<_>>(), vec!["board", "secret_board"]);
        assert_eq!(c.failures.len(), 1);
        assert_eq!(c.failures[0].entity, "broken");
        assert!(!c.is_clean());
        assert_eq!(c.diagnostics.len(), 1);
    }

    #[test]
    fn chain_is_root_first() {
        let c = compile(&graph(), &NamingConfig::default()).unwrap();
        let names: Vec<_> = c.chain("secret_board").unwrap().iter().map(|m| m.class.entity.as_str()).collect();
        assert_eq!(names, vec!["board", "secret_board"]);
        assert_eq!(c.chain("broken").unwrap_err(), MergeError::UnknownEntity("broken".into()));
    }

    #[test]
    fn failed_ancestor_fails_its_descendants() {
        let g = SchemaGraph::new(vec![
            Entity::new("secret_board").with_parent("board").with_property("pw", PropertyVariant::text()),
            Entity::new("board").with_property("ids", PropertyVariant::array_of(PropertyVariant::integer())),
            Entity::new("vault").with_parent("secret_board").with_property("owner", PropertyVariant::reference("ghost")),
            Entity::new("user").with_property("name", PropertyVariant::text()),
        ])
        .unwrap();
        let c = compile(&g, &NamingConfig::with_prefix("PI")).unwrap();
        assert_eq!(c.models.keys().collect::<Vec<_>>(), vec!["user"]);
        let failed: Vec<_> = c.failures.iter().map(|f| (f.entity.as_str(), &f.error)).collect();
        assert_eq!(failed.len(), 3);
        assert_eq!(failed[0].0, "board");
        assert_eq!(
            failed[1],
            ("secret_board", &CompileError::FailedAncestor { entity: "secret_board".into(), ancestor: "board".into() })
        );
        // nearest failed ancestor is named
        assert_eq!(
            failed[2],
            ("vault", &CompileError::FailedAncestor { entity: "vault".into(), ancestor: "secret_board".into() })
        );
        // diagnostics of dropped models are not reported
        assert!(c.diagnostics.is_empty());
        assert_eq!(c.chain("secret_board").unwrap_err(), MergeError::UnknownEntity("secret_board".into()));
    }

    #[test]
    fn cyclic_hierarchy_stops_the_run() {
        let g = SchemaGraph::new(vec![
            Entity::new("a").with_parent("b"),
            Entity::new("b").with_parent("a"),
        ])
        .unwrap();
        let err = compile(&g, &NamingConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::CyclicParentChain { .. }));
    }

    #[test]
    fn output_serializes() {
        let c = compile(&graph(), &NamingConfig::with_prefix("PI")).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["models"]["board"]["class"]["className"], "PIBoard");
        assert_eq!(json["failures"][0]["entity"], "broken");
        assert_eq!(json["diagnostics"][0]["kind"], "unresolvedReference");
    }
}
