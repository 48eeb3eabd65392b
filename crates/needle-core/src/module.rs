use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::classify::Classifier;
use crate::config::Config;
use crate::deps::DependencyResolver;
use crate::error::{NeedleError, Result};
use crate::fanout::fan_out;
use crate::graph::DependencyGraph;
use crate::manifest::Manifest;
use crate::naming::{node_to_package_name, package_to_node_name, sort_desc_count};
use crate::tree::{build_tree, relative_path, Tree};
use crate::types::{File, FileKind, Package, PackageKind, Stats, Tally};
use crate::visibility::CaseVisibility;

/// A fully analyzed module. Built once by [`build_module`], read-only after.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    pub path: PathBuf,
    pub name: String,
    /// Direct requirements declared in the manifest, sorted.
    pub external: Vec<String>,
    pub tree: Tree,
    /// Packages sorted by folder key.
    pub packages: Vec<Package>,
    pub graph: DependencyGraph,
    /// External dependency => sorted names of packages importing it.
    pub external_users: BTreeMap<String, Vec<String>>,
    pub totals: Tally,
    pub stats: Stats,
}

/// One file's worth of work for the fan-out.
struct FileJob<'a> {
    folder: &'a str,
    name: &'a str,
}

struct FileDone {
    folder: String,
    file: File,
}

/// Read the manifest, walk the tree, classify every source file in parallel,
/// and level the package dependency graph.
pub fn build_module(root: &Path, config: &Config) -> Result<Module> {
    if !root.is_dir() {
        return Err(NeedleError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    let manifest = Manifest::read(root)?;
    let tree = build_tree(root, &config.tree)?;

    let jobs: Vec<FileJob> = tree
        .iter()
        .filter(|(_, node)| node.is_package())
        .flat_map(|(folder, node)| {
            node.files.iter().map(move |name| FileJob {
                folder: folder.as_str(),
                name: name.as_str(),
            })
        })
        .collect();
    tracing::info!(
        module = %manifest.name,
        folders = tree.len(),
        files = jobs.len(),
        "scanned module tree"
    );

    let resolver = DependencyResolver::new(&manifest.name, &manifest.requires);
    let visibility = CaseVisibility;
    let classifier = Classifier::new(&config.classify.error_guard, &visibility);

    let task = |job: FileJob| -> Result<FileDone> {
        let path = root.join(relative_path(job.folder)).join(job.name);
        tracing::debug!(file = %path.display(), "classifying");
        let classified = classifier.classify_file(&path)?;
        let deps = resolver
            .resolve_all(classified.candidates.iter().map(String::as_str))
            .into_iter()
            .collect();
        let kind = if config.tree.is_test_file(job.name) {
            FileKind::Test
        } else {
            FileKind::Code
        };
        Ok(FileDone {
            folder: job.folder.to_string(),
            file: File {
                name: job.name.to_string(),
                kind,
                package_clause: classified.package_clause,
                lines: classified.lines,
                deps,
                tally: classified.tally,
            },
        })
    };

    let mut by_folder: BTreeMap<String, Vec<File>> = BTreeMap::new();
    fan_out(jobs, task, |done| {
        by_folder.entry(done.folder).or_default().push(done.file);
    })?;

    let mut totals = Tally::new();
    let mut stats = Stats::default();
    let mut imports: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut external_users: BTreeMap<String, Vec<String>> = manifest
        .requires
        .iter()
        .map(|dep| (dep.clone(), Vec::new()))
        .collect();

    let mut packages = Vec::with_capacity(by_folder.len());
    for (folder, files) in by_folder {
        let package = assemble_package(folder, files);

        totals.merge(&package.tally);
        for file in &package.files {
            stats.add_file(file);
        }
        imports.insert(
            package.folder.clone(),
            package.internal_deps().map(str::to_string).collect(),
        );
        for dep in package.external_deps() {
            external_users
                .entry(dep.to_string())
                .or_default()
                .push(package.name.clone());
        }
        packages.push(package);
    }
    stats.package_count = packages.len();
    for users in external_users.values_mut() {
        users.sort();
    }

    let folders = packages.iter().map(|p| p.folder.as_str());
    let graph = DependencyGraph::build(folders, &imports)?;

    tracing::info!(
        module = %manifest.name,
        packages = packages.len(),
        lines = totals.line_count(),
        "built module"
    );

    Ok(Module {
        path: root.to_path_buf(),
        name: manifest.name,
        external: manifest.requires.into_iter().collect(),
        tree,
        packages,
        graph,
        external_users,
        totals,
        stats,
    })
}

/// Merge one folder's files. Files are sorted first so the package kind
/// comes from the same file regardless of completion order.
fn assemble_package(folder: String, mut files: Vec<File>) -> Package {
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let kind = files
        .iter()
        .find_map(|f| f.package_clause.as_deref())
        .map(PackageKind::from_clause)
        .unwrap_or_default();

    let mut tally = Tally::new();
    let mut deps = BTreeMap::new();
    for file in &files {
        tally.merge(&file.tally);
        deps.extend(file.deps.iter().map(|(k, v)| (k.clone(), *v)));
    }

    Package {
        name: node_to_package_name(&folder),
        folder,
        kind,
        files,
        deps,
        tally,
    }
}

impl Module {
    /// Look up a package by display name (`sub/dir`) or folder key (`/sub/dir`).
    pub fn package(&self, name: &str) -> Option<&Package> {
        let key = package_to_node_name(name);
        self.packages.iter().find(|p| p.folder == key)
    }

    pub fn package_names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn file_names(&self, package: &str) -> Vec<&str> {
        self.package(package)
            .map(Package::file_names)
            .unwrap_or_default()
    }

    pub fn count_packages(&self, kind: PackageKind) -> usize {
        self.packages.iter().filter(|p| p.kind == kind).count()
    }

    /// External dependencies with their user counts, most used first.
    pub fn external_usage(&self) -> Vec<(&str, usize)> {
        let mut rows: Vec<(&str, usize)> = self
            .external_users
            .iter()
            .map(|(dep, users)| (dep.as_str(), users.len()))
            .collect();
        sort_desc_count(&mut rows);
        rows
    }

    /// Internal packages with their user counts, most used first.
    pub fn internal_usage(&self) -> Vec<(String, usize)> {
        let mut rows: Vec<(String, usize)> = self
            .graph
            .inbound
            .iter()
            .map(|(folder, users)| (node_to_package_name(folder), users.len()))
            .collect();
        sort_desc_count(&mut rows);
        rows
    }

    /// Packages with their line counts, largest first.
    pub fn package_sizes(&self) -> Vec<(&str, usize)> {
        let mut rows: Vec<(&str, usize)> = self
            .packages
            .iter()
            .map(|p| (p.name.as_str(), p.line_count()))
            .collect();
        sort_desc_count(&mut rows);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockType, CodeType, LineType};
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn sample_module() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "go.mod",
            "module example.com/app\n\ngo 1.22\n\nrequire (\n\tgithub.com/spf13/cobra v1.8.0\n\tgithub.com/unused/lib v0.1.0\n\tgolang.org/x/sync v0.7.0 // indirect\n)\n",
        );
        write(
            root,
            "main.go",
            "package main\n\nimport (\n\t\"fmt\"\n\t\"example.com/app/internal/server\"\n)\n\nfunc main() {\n\tfmt.Println(server.Name)\n}\n",
        );
        write(
            root,
            "internal/server/server.go",
            "package server\n\nimport (\n\t\"github.com/spf13/cobra\"\n\t\"example.com/app/internal/store\"\n)\n\nconst Name = \"srv\"\n\ntype Server struct {\n\tdb *store.DB\n}\n\nfunc (s *Server) Run(c *cobra.Command) error {\n\terr := s.db.Open()\n\tif err != nil {\n\t\treturn err\n\t}\n\treturn nil\n}\n",
        );
        write(
            root,
            "internal/server/server_test.go",
            "package server\n\nimport \"testing\"\n\nfunc TestRun(t *testing.T) {\n}\n",
        );
        write(
            root,
            "internal/store/store.go",
            "package store\n\n// DB wraps a handle.\ntype DB struct{}\n\nfunc (d *DB) Open() error {\n\treturn nil\n}\n",
        );
        write(root, "tools/gen.go", "package tools\n\nvar version = 1\n");
        write(root, ".hidden/skip.go", "package skip\n");
        write(root, "docs/README.md", "# docs\n");
        dir
    }

    #[test]
    fn test_build_module() {
        let dir = sample_module();
        let module = build_module(dir.path(), &Config::default()).unwrap();

        assert_eq!(module.name, "example.com/app");
        assert_eq!(
            module.package_names(),
            vec!["/", "internal/server", "internal/store", "tools"]
        );
        assert_eq!(module.package("/").unwrap().kind, PackageKind::Main);
        assert_eq!(module.package("internal/server").unwrap().kind, PackageKind::Lib);
        assert_eq!(
            module.file_names("internal/server"),
            vec!["server.go", "server_test.go"]
        );
        assert!(module.package("docs").is_none(), "folder without source files");
        assert!(module.tree.contains_key("/docs"));

        assert_eq!(module.graph.independent, vec!["/tools".to_string()]);
        assert_eq!(module.graph.level_of("/internal/store"), Some(0));
        assert_eq!(module.graph.level_of("/internal/server"), Some(1));
        assert_eq!(module.graph.level_of("/"), Some(2));

        assert_eq!(
            module.external_users["github.com/spf13/cobra"],
            vec!["internal/server".to_string()]
        );
        assert!(module.external_users["github.com/unused/lib"].is_empty());
        assert!(!module.external_users.contains_key("golang.org/x/sync"));
    }

    #[test]
    fn test_module_totals_and_stats() {
        let dir = sample_module();
        let module = build_module(dir.path(), &Config::default()).unwrap();

        let line_sum: usize = module.packages.iter().map(|p| p.line_count()).sum();
        assert_eq!(module.totals.line_count(), line_sum);
        let by_type: usize = LineType::ALL.iter().map(|t| module.totals.lines_of(*t)).sum();
        assert_eq!(by_type, module.totals.line_count());

        assert_eq!(module.stats.package_count, 4);
        assert_eq!(module.stats.file_count, 5);
        assert_eq!(module.stats.files_of(FileKind::Test), 1);
        assert_eq!(
            module.stats.lines_of(FileKind::Code) + module.stats.lines_of(FileKind::Test),
            module.totals.line_count()
        );

        assert_eq!(module.totals.code(CodeType::PubMethod), 2);
        assert_eq!(module.totals.code(CodeType::PubConst), 1);
        assert_eq!(module.totals.code(CodeType::PrivVar), 1);
        assert_eq!(module.totals.block(BlockType::Type), 2);
        assert_eq!(module.totals.lines_of(LineType::ErrorBlock), 3);
    }

    #[test]
    fn test_builds_are_deterministic() {
        let dir = sample_module();
        let a = build_module(dir.path(), &Config::default()).unwrap();
        let b = build_module(dir.path(), &Config::default()).unwrap();
        assert_eq!(a.graph, b.graph);
        assert_eq!(a.totals, b.totals);
        assert_eq!(a.external_users, b.external_users);
        for (pa, pb) in a.packages.iter().zip(&b.packages) {
            assert_eq!(pa.tally, pb.tally, "package {}", pa.name);
            assert_eq!(pa.file_names(), pb.file_names());
        }
    }

    #[test]
    fn test_usage_rows() {
        let dir = sample_module();
        let module = build_module(dir.path(), &Config::default()).unwrap();
        assert_eq!(
            module.external_usage(),
            vec![("github.com/spf13/cobra", 1), ("github.com/unused/lib", 0)]
        );
        assert_eq!(module.internal_usage()[0].1, 1);
    }

    #[test]
    fn test_missing_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.go", "package main\n");
        assert!(matches!(
            build_module(dir.path(), &Config::default()),
            Err(NeedleError::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn test_not_a_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            build_module(&dir.path().join("nope"), &Config::default()),
            Err(NeedleError::NotADirectory { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_source_file_fails_whole_build() {
        let dir = sample_module();
        let broken = dir.path().join("internal/store/broken.go");
        std::os::unix::fs::symlink(dir.path().join("gone.go"), &broken).unwrap();

        match build_module(dir.path(), &Config::default()) {
            Err(NeedleError::Io { path, .. }) => assert_eq!(path, broken),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn test_import_cycle_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "go.mod", "module example.com/cyc\n");
        write(root, "a/a.go", "package a\n\nimport \"example.com/cyc/b\"\n");
        write(root, "b/b.go", "package b\n\nimport \"example.com/cyc/a\"\n");
        assert!(matches!(
            build_module(root, &Config::default()),
            Err(NeedleError::DependencyCycle { .. })
        ));
    }
}
