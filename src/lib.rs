//! Schema-driven model compiler.
//!
//! Pipeline: input documents → [`SchemaGraph`] → per-entity
//! [`ModelDescriptor`]s (types, coercions, builders, dirty bits) → merge
//! runtime over the compiled models.
pub mod coerce;
pub mod compile;
pub mod error;
pub mod input;
pub mod ir;
pub mod lower;
pub mod merge;
pub mod naming;
pub mod schema;
pub mod synth;

#[cfg(test)]
mod testing;

pub use compile::{compile, Compilation, EntityFailure};
pub use error::{CompileError, Diagnostic, Error, LoadError, MergeError};
pub use merge::{merge, Builder, Constructed, Instance, MergeInitKind};
pub use naming::NamingConfig;
pub use schema::{Entity, PropertyDescriptor, PropertyVariant, SchemaGraph};
pub use synth::ModelDescriptor;

/// Load every source into one graph and compile it.
pub fn compile_sources<'a, I>(
    sources: I,
    json_pointer: Option<&str>,
    naming: &NamingConfig,
) -> Result<Compilation, Error>
where
    I: IntoIterator<Item = &'a str>,
{
    let graph = input::load_graph(sources, json_pointer)?;
    Ok(compile(&graph, naming)?)
}
