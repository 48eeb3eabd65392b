use std::path::PathBuf;

/// Errors that abort a module build. Unclassifiable lines and unresolvable
/// import candidates are absorbed into the model and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum NeedleError {
    #[error("'{}' is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("module manifest not found at '{}'", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("module manifest '{}' has no module directive", path.display())]
    ManifestMissingModule { path: PathBuf },

    #[error("failed to read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk '{}'", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("import cycle between packages: {}", packages.join(", "))]
    DependencyCycle { packages: Vec<String> },

    #[error("failed to parse config '{}'", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid exclude pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

impl NeedleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NeedleError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, NeedleError>;
