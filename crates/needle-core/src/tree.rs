use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use walkdir::WalkDir;

use crate::config::TreeConfig;
use crate::error::{NeedleError, Result};
use crate::types::{Node, ROOT_KEY};

/// Folder key => folder contents, for every folder reachable from the root.
pub type Tree = BTreeMap<String, Node>;

/// Walk `root` breadth-first and list each folder's source files and visible
/// subfolders. Any unreadable directory aborts the walk.
pub fn build_tree(root: &Path, config: &TreeConfig) -> Result<Tree> {
    if !root.is_dir() {
        return Err(NeedleError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    let excluded = config.exclude_set()?;

    let mut tree = Tree::new();
    let mut queue = VecDeque::from([ROOT_KEY.to_string()]);

    while let Some(key) = queue.pop_front() {
        if tree.contains_key(&key) {
            continue;
        }
        let dir = root.join(relative_path(&key));
        let mut node = Node::default();

        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| NeedleError::Walk {
                path: dir.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type();

            if file_type.is_dir() {
                if config.is_skipped_folder(&name) {
                    continue;
                }
                let child = child_key(&key, &name);
                if excluded.is_match(relative_path(&child)) {
                    tracing::debug!(folder = %child, "excluded by pattern");
                    continue;
                }
                node.folders.push(name);
                queue.push_back(child);
            } else if config.is_source_file(&name) {
                // Symlinks too; an unreadable one fails the build later.
                node.files.push(name);
            }
        }

        tracing::debug!(
            folder = %key,
            files = node.files.len(),
            folders = node.folders.len(),
            "scanned folder"
        );
        tree.insert(key, node);
    }

    Ok(tree)
}

/// Key of `name` inside the folder keyed `parent`.
pub fn child_key(parent: &str, name: &str) -> String {
    if parent == ROOT_KEY {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Folder key as a path relative to the module root (`""` for the root).
pub fn relative_path(key: &str) -> &str {
    key.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "package x\n").unwrap();
    }

    #[test]
    fn test_child_key() {
        assert_eq!(child_key("/", "cmd"), "/cmd");
        assert_eq!(child_key("/cmd", "app"), "/cmd/app");
    }

    #[test]
    fn test_build_tree_lists_files_and_folders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("main.go"));
        touch(&root.join("README.md"));
        touch(&root.join("internal/db/db.go"));
        touch(&root.join("internal/db/db_test.go"));
        touch(&root.join(".git/hooks/x.go"));
        touch(&root.join("_tools/gen.go"));
        touch(&root.join("-scratch/a.go"));

        let tree = build_tree(root, &TreeConfig::default()).unwrap();

        let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/", "/internal", "/internal/db"]);
        assert_eq!(tree["/"].files, vec!["main.go"]);
        assert_eq!(tree["/"].folders, vec!["internal"]);
        assert!(!tree["/internal"].is_package(), "folder without files");
        assert_eq!(tree["/internal"].folders, vec!["db"]);
        assert_eq!(tree["/internal/db"].files, vec!["db.go", "db_test.go"]);
    }

    #[test]
    fn test_build_tree_applies_exclude_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("main.go"));
        touch(&root.join("vendor/lib/lib.go"));
        touch(&root.join("pkg/testdata/t.go"));
        touch(&root.join("pkg/p.go"));

        let config = TreeConfig {
            exclude: vec!["vendor".to_string(), "**/testdata".to_string()],
            ..TreeConfig::default()
        };
        let tree = build_tree(root, &config).unwrap();
        let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/", "/pkg"]);
        assert_eq!(tree["/"].folders, vec!["pkg"]);
    }

    #[test]
    fn test_build_tree_rejects_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.go");
        touch(&file);
        assert!(matches!(
            build_tree(&file, &TreeConfig::default()),
            Err(NeedleError::NotADirectory { .. })
        ));
    }
}
