//! Minimal CLI: graph documents → (model descriptors | check report)
use std::path::PathBuf;
use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use modelc::{Compilation, NamingConfig};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile entity graphs into model, builder and merge descriptors
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log compiler progress (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile and write the model descriptors as JSON
    Compile(CompileOut),
    /// compile and report failures and diagnostics only
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to the graph inside each document (e.g. /components/schema)
    #[arg(long)]
    json_pointer: Option<String>,

    /// prefix prepended to every class name (e.g. PI)
    #[arg(long)]
    class_prefix: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn naming(&self) -> NamingConfig {
        NamingConfig { class_name_prefix: self.class_prefix.clone() }
    }

    fn compile(&self) -> anyhow::Result<Compilation> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut sources = Vec::with_capacity(source_paths.len());
        for source_path in &source_paths {
            let source = std::fs::read_to_string(source_path)
                .with_context(|| format!("failed to read source file {}", source_path.display()))?;
            sources.push(source);
        }
        let compilation = modelc::compile_sources(
            sources.iter().map(String::as_str),
            self.json_pointer.as_deref(),
            &self.naming(),
        )
        .with_context(|| format!("failed to compile {}", display_paths(&source_paths)))?;
        Ok(compilation)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Compile(target) => {
                let compilation = target.input_settings.compile()?;
                report(&compilation);

                let out_src = serde_json::to_string_pretty(&compilation)
                    .context("failed to serialize compilation")?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("failed to create {}", parent.display()))?;
                    }
                    std::fs::write(out, &out_src)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{out_src}");
                }
                fail_on_entity_errors(&compilation)
            }
            Command::Check(target) => {
                let compilation = target.input_settings.compile()?;
                report(&compilation);
                fail_on_entity_errors(&compilation)?;
                eprintln!(
                    "{} {} models",
                    "ok:".green().bold(),
                    compilation.models.len()
                );
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn report(compilation: &Compilation) {
    for diagnostic in &compilation.diagnostics {
        eprintln!("{} {diagnostic}", "warning:".yellow().bold());
    }
    for failure in &compilation.failures {
        eprintln!("{} {}", "error:".red().bold(), failure.message);
    }
}

fn fail_on_entity_errors(compilation: &Compilation) -> anyhow::Result<()> {
    if !compilation.is_clean() {
        bail!("{} of {} entities failed to compile",
            compilation.failures.len(),
            compilation.failures.len() + compilation.models.len(),
        );
    }
    Ok(())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //
