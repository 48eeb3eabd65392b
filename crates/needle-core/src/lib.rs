pub mod classify;
pub mod config;
pub mod deps;
pub mod error;
pub mod fanout;
pub mod graph;
pub mod manifest;
pub mod module;
pub mod naming;
pub mod tree;
pub mod types;
pub mod visibility;

pub use classify::{Classified, Classifier};
pub use config::Config;
pub use deps::{Dependency, DependencyResolver};
pub use error::{NeedleError, Result};
pub use graph::DependencyGraph;
pub use manifest::Manifest;
pub use module::{build_module, Module};
pub use naming::{node_to_package_name, package_to_node_name, sort_desc_count};
pub use types::*;
pub use visibility::{CaseVisibility, Visibility};
