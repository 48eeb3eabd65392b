use std::collections::BTreeSet;

use crate::types::ROOT_KEY;

/// A resolved import candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// Folder key of a package inside the module (`/` for the root).
    Internal(String),
    /// Declared name of a direct external requirement.
    External(String),
}

impl Dependency {
    pub fn name(&self) -> &str {
        match self {
            Dependency::Internal(name) | Dependency::External(name) => name,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Dependency::Internal(_))
    }
}

/// Classifies import candidates against the module name and its direct
/// requirements. Candidates matching neither are dropped.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    module_name: String,
    /// Longest first, so nested requirements win over their parents.
    externals: Vec<String>,
}

impl DependencyResolver {
    pub fn new<'a>(module_name: &str, externals: impl IntoIterator<Item = &'a String>) -> Self {
        let mut externals: Vec<String> = externals.into_iter().cloned().collect();
        externals.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        externals.dedup();
        Self {
            module_name: module_name.to_string(),
            externals,
        }
    }

    pub fn resolve(&self, candidate: &str) -> Option<Dependency> {
        let path = unquote(candidate.trim());
        if path.is_empty() {
            return None;
        }
        if let Some(rest) = strip_path_prefix(path, &self.module_name) {
            return Some(Dependency::Internal(format!(
                "{ROOT_KEY}{}",
                rest.trim_start_matches('/')
            )));
        }
        self.externals
            .iter()
            .find(|name| strip_path_prefix(path, name).is_some())
            .map(|name| Dependency::External(name.clone()))
    }

    /// Resolve every candidate, keeping one entry per distinct dependency.
    pub fn resolve_all<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<(String, bool)> {
        candidates
            .into_iter()
            .filter_map(|c| self.resolve(c))
            .map(|d| (d.name().to_string(), d.is_internal()))
            .collect()
    }
}

/// Pull the import path out of one import line: the last token after
/// dropping a trailing line comment, so aliased and blank imports resolve too.
pub fn candidate_from_import(line: &str) -> Option<&str> {
    let line = match line.find("//") {
        Some(idx) if !line[..idx].trim().is_empty() => &line[..idx],
        Some(_) => return None,
        None => line,
    };
    line.split_whitespace().last()
}

/// `name` itself or `name/...`; returns the remainder.
fn strip_path_prefix<'a>(path: &'a str, name: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(name)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '`')
}
