use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{NeedleError, Result};

pub const MANIFEST_FILE: &str = "go.mod";

const INDIRECT_MARKER: &str = "// indirect";

/// The recognized directives of a module manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    /// Direct requirements only; `// indirect` entries are left out.
    pub requires: BTreeSet<String>,
}

impl Manifest {
    /// Read `go.mod` from the module root.
    pub fn read(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(NeedleError::ManifestNotFound { path });
        }
        let content = std::fs::read_to_string(&path).map_err(|e| NeedleError::io(&path, e))?;
        let (name, requires) = parse(&content);
        let name = name.ok_or(NeedleError::ManifestMissingModule { path: path.clone() })?;
        tracing::debug!(
            module = %name,
            requires = requires.len(),
            "read module manifest"
        );
        Ok(Self { name, requires })
    }
}

fn parse(content: &str) -> (Option<String>, BTreeSet<String>) {
    let mut name = None;
    let mut requires = BTreeSet::new();
    let mut in_block = false;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || (line.starts_with("//") && !in_block) {
            continue;
        }
        if in_block {
            if line == ")" {
                in_block = false;
            } else if !line.starts_with("//") {
                add_direct(&mut requires, line);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("module ") {
            name = rest.split_whitespace().next().map(|n| unquote(n).to_string());
        } else if line == "require (" || line == "require(" {
            in_block = true;
        } else if let Some(rest) = line.strip_prefix("require ") {
            add_direct(&mut requires, rest.trim());
        }
    }
    (name, requires)
}

fn add_direct(requires: &mut BTreeSet<String>, entry: &str) {
    if entry.ends_with(INDIRECT_MARKER) {
        return;
    }
    if let Some(path) = entry.split_whitespace().next() {
        requires.insert(unquote(path).to_string());
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '`')
}
