use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{NeedleError, Result};

/// File name searched for in the analyzed directory and its ancestors.
pub const CONFIG_FILE: &str = ".needle.toml";

/// Top-level configuration from `.needle.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Which folders are traversed and which files are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
    #[serde(default = "default_source_suffix")]
    pub source_suffix: String,
    #[serde(default = "default_test_suffix")]
    pub test_suffix: String,
    /// Glob patterns over folder paths relative to the module root.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_skip_prefixes() -> Vec<String> {
    vec![".".to_string(), "_".to_string(), "-".to_string()]
}

fn default_source_suffix() -> String {
    ".go".to_string()
}

fn default_test_suffix() -> String {
    "_test.go".to_string()
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: default_skip_prefixes(),
            source_suffix: default_source_suffix(),
            test_suffix: default_test_suffix(),
            exclude: Vec::new(),
        }
    }
}

impl TreeConfig {
    /// Compile `exclude` into a matcher.
    pub fn exclude_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|source| NeedleError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| NeedleError::Pattern {
            pattern: self.exclude.join(", "),
            source,
        })
    }

    pub fn is_skipped_folder(&self, name: &str) -> bool {
        self.skip_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && name.starts_with(prefix.as_str()))
    }

    pub fn is_source_file(&self, name: &str) -> bool {
        name.ends_with(&self.source_suffix)
    }

    pub fn is_test_file(&self, name: &str) -> bool {
        name.ends_with(&self.test_suffix)
    }
}

/// Knobs for the line classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyConfig {
    #[serde(default = "default_error_guard")]
    pub error_guard: String,
}

fn default_error_guard() -> String {
    "if err != nil {".to_string()
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            error_guard: default_error_guard(),
        }
    }
}

/// Defaults for report flags not given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub details: bool,
    #[serde(default)]
    pub compact: bool,
}

impl Config {
    /// Load configuration from a `.needle.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| NeedleError::io(path, e))?;
        toml::from_str(&content).map_err(|source| NeedleError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `.needle.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        for current in start.ancestors() {
            let config_path = current.join(CONFIG_FILE);
            if !config_path.exists() {
                continue;
            }
            return match Self::load(&config_path) {
                Ok(config) => {
                    tracing::debug!(path = %config_path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        path = %config_path.display(),
                        error = %e,
                        "ignoring unreadable config, using defaults"
                    );
                    Self::default()
                }
            };
        }
        Self::default()
    }

    /// Generate default TOML content for `needle init`.
    pub fn default_toml() -> String {
        r#"# Needle - Go module analysis configuration

[tree]
# Folders whose name starts with one of these are not traversed
skip_prefixes = [".", "_", "-"]
source_suffix = ".go"
test_suffix = "_test.go"
# Extra glob patterns over folder paths relative to the module root
# exclude = ["vendor", "vendor/**", "testdata/**"]
exclude = []

[classify]
# Guard line that opens an error-handling block
error_guard = "if err != nil {"

[report]
# Per-file rows in text reports
details = false
# Single-line JSON output
compact = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tree.skip_prefixes, vec![".", "_", "-"]);
        assert_eq!(config.tree.source_suffix, ".go");
        assert_eq!(config.tree.test_suffix, "_test.go");
        assert!(config.tree.exclude.is_empty());
        assert_eq!(config.classify.error_guard, "if err != nil {");
        assert!(!config.report.details);
    }

    #[test]
    fn test_default_toml_is_valid() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config, Config::default(), "template should match defaults");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let toml_str = r#"
[tree]
exclude = ["vendor/**"]

[report]
compact = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tree.exclude, vec!["vendor/**"]);
        assert_eq!(config.tree.source_suffix, ".go");
        assert!(config.report.compact);
        assert!(!config.report.details);
        assert_eq!(config.classify, ClassifyConfig::default());
    }

    #[test]
    fn test_folder_and_file_predicates() {
        let tree = TreeConfig::default();
        assert!(tree.is_skipped_folder(".git"));
        assert!(tree.is_skipped_folder("_build"));
        assert!(tree.is_skipped_folder("-tmp"));
        assert!(!tree.is_skipped_folder("internal"));

        assert!(tree.is_source_file("main.go"));
        assert!(tree.is_source_file("main_test.go"));
        assert!(!tree.is_source_file("go.mod"));
        assert!(tree.is_test_file("main_test.go"));
        assert!(!tree.is_test_file("main.go"));
    }

    #[test]
    fn test_exclude_set_matches_relative_paths() {
        let tree = TreeConfig {
            exclude: vec!["vendor/**".to_string(), "testdata".to_string()],
            ..TreeConfig::default()
        };
        let set = tree.exclude_set().unwrap();
        assert!(set.is_match("vendor/github.com/x"));
        assert!(set.is_match("testdata"));
        assert!(!set.is_match("internal/testdata2"));
    }

    #[test]
    fn test_invalid_exclude_pattern_is_error() {
        let tree = TreeConfig {
            exclude: vec!["a/[".to_string()],
            ..TreeConfig::default()
        };
        assert!(matches!(
            tree.exclude_set(),
            Err(NeedleError::Pattern { .. })
        ));
    }

    #[test]
    fn test_load_or_default_walks_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[classify]\nerror_guard = \"if e != nil {\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::load_or_default(&nested);
        assert_eq!(config.classify.error_guard, "if e != nil {");
    }

    #[test]
    fn test_load_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[tree\n").unwrap();
        assert!(matches!(Config::load(&path), Err(NeedleError::Config { .. })));
        // load_or_default swallows it
        assert_eq!(Config::load_or_default(dir.path()), Config::default());
    }
}
