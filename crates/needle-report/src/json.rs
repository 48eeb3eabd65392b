use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use needle_core::naming::node_to_package_name;
use needle_core::types::{FileKind, PackageKind, Stats, Tally};
use needle_core::{File, Module, Package};

/// Module report: summary, per-package breakdowns, and dependency sections.
#[derive(Debug, Serialize)]
pub struct AnalysisOutput<'a> {
    pub module: &'a str,
    pub path: &'a Path,
    pub stats: &'a Stats,
    pub totals: &'a Tally,
    pub packages: Vec<PackageOutput<'a>>,
    #[serde(flatten)]
    pub dependencies: DependencyOutput,
}

#[derive(Debug, Serialize)]
pub struct PackageOutput<'a> {
    pub name: &'a str,
    pub kind: PackageKind,
    pub file_count: usize,
    pub line_count: usize,
    pub char_count: usize,
    pub internal_deps: Vec<String>,
    pub external_deps: Vec<&'a str>,
    pub tally: &'a Tally,
    /// Per-file rows, only with details enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileOutput<'a>>>,
}

#[derive(Debug, Serialize)]
pub struct FileOutput<'a> {
    pub name: &'a str,
    pub kind: FileKind,
    pub line_count: usize,
    pub char_count: usize,
    pub tally: &'a Tally,
}

/// Dependency sections with display package names.
#[derive(Debug, Serialize)]
pub struct DependencyOutput {
    pub external_users: BTreeMap<String, Vec<String>>,
    pub internal_users: BTreeMap<String, Vec<String>>,
    pub dependencies: BTreeMap<String, Vec<String>>,
    pub independent: Vec<String>,
    pub levels: BTreeMap<usize, Vec<String>>,
}

/// Format the full module report as JSON.
pub fn format_analysis(module: &Module, details: bool, compact: bool) -> String {
    let output = AnalysisOutput {
        module: &module.name,
        path: &module.path,
        stats: &module.stats,
        totals: &module.totals,
        packages: module
            .packages
            .iter()
            .map(|p| package_output(p, details))
            .collect(),
        dependencies: dependency_output(module),
    };
    to_json(&output, compact)
}

/// Format only the dependency sections as JSON.
pub fn format_deps(module: &Module, compact: bool) -> String {
    #[derive(Serialize)]
    struct DepsOutput<'a> {
        module: &'a str,
        #[serde(flatten)]
        dependencies: DependencyOutput,
    }

    let output = DepsOutput {
        module: &module.name,
        dependencies: dependency_output(module),
    };
    to_json(&output, compact)
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> String {
    if compact {
        serde_json::to_string(value).expect("report output should be serializable")
    } else {
        serde_json::to_string_pretty(value).expect("report output should be serializable")
    }
}

fn package_output(package: &Package, details: bool) -> PackageOutput<'_> {
    PackageOutput {
        name: &package.name,
        kind: package.kind,
        file_count: package.file_count(),
        line_count: package.line_count(),
        char_count: package.char_count(),
        internal_deps: package.internal_deps().map(node_to_package_name).collect(),
        external_deps: package.external_deps().collect(),
        tally: &package.tally,
        files: details.then(|| package.files.iter().map(file_output).collect()),
    }
}

fn file_output(file: &File) -> FileOutput<'_> {
    FileOutput {
        name: &file.name,
        kind: file.kind,
        line_count: file.line_count(),
        char_count: file.char_count(),
        tally: &file.tally,
    }
}

fn display_names(map: &BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    map.iter()
        .map(|(key, values)| {
            (
                node_to_package_name(key),
                values.iter().map(|v| node_to_package_name(v)).collect(),
            )
        })
        .collect()
}

fn dependency_output(module: &Module) -> DependencyOutput {
    let graph = &module.graph;
    DependencyOutput {
        external_users: module.external_users.clone(),
        internal_users: display_names(&graph.inbound),
        dependencies: display_names(&graph.outbound),
        independent: graph
            .independent
            .iter()
            .map(|p| node_to_package_name(p))
            .collect(),
        levels: graph
            .levels
            .iter()
            .map(|(level, members)| {
                (
                    *level,
                    members.iter().map(|m| node_to_package_name(m)).collect(),
                )
            })
            .collect(),
    }
}
