//! Fixture harness: every document under `fixtures/valid` must compile
//! cleanly, every document under `fixtures/invalid` must not.
use std::path::{Path, PathBuf};
use anyhow::{bail, Context};
use colored::Colorize;

use modelc::NamingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Valid,
    Invalid,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn fixture_paths(expect: Expect) -> anyhow::Result<Vec<PathBuf>> {
    let dir = match expect {
        Expect::Valid => "valid",
        Expect::Invalid => "invalid",
    };
    let pattern = fixtures_root().join(dir).join("*.json");
    let pattern = pattern.to_string_lossy();
    let mut out = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
        out.push(entry?);
    }
    Ok(out)
}

/// `Ok(None)` when the fixture behaved as expected, otherwise the reason.
fn run_fixture(path: &Path, expect: Expect) -> anyhow::Result<Option<String>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let naming = NamingConfig::with_prefix("PI");
    let outcome = modelc::compile_sources([source.as_str()], None, &naming);
    let verdict = match (expect, outcome) {
        (Expect::Valid, Ok(c)) if c.is_clean() => None,
        (Expect::Valid, Ok(c)) => Some(
            c.failures.iter().map(|f| f.message.clone()).collect::<Vec<_>>().join("; "),
        ),
        (Expect::Valid, Err(error)) => Some(error.to_string()),
        (Expect::Invalid, Ok(c)) if c.is_clean() => {
            Some(format!("compiled {} models without failures", c.models.len()))
        }
        (Expect::Invalid, _) => None,
    };
    Ok(verdict)
}

fn main() -> anyhow::Result<()> {
    let mut passed = 0usize;
    let mut failed = 0usize;
    for expect in [Expect::Valid, Expect::Invalid] {
        for path in fixture_paths(expect)? {
            let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            match run_fixture(&path, expect)? {
                None => {
                    passed += 1;
                    eprintln!("{} {expect:?} {name}", "✅".green());
                }
                Some(reason) => {
                    failed += 1;
                    eprintln!("{} {expect:?} {name}: {}", "❌".red(), reason.red());
                }
            }
        }
    }
    eprintln!("—— {passed} passed, {failed} failed ——");
    if failed > 0 {
        bail!("{failed} fixtures did not behave as expected");
    }
    Ok(())
}
