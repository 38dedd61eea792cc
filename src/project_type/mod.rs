//! Project types describe the kind of host project being scaffolded.
//!
//! A project type decides which operations run and which `.installer`
//! subdirectories a package's version directories are read from.

mod registry;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::operation::OperationKind;
use crate::runtime::Runtime;

pub use registry::ProjectTypeRegistry;

/// Directory inside `.installer` holding contributed project types.
pub const PROJECT_TYPES_DIR: &str = "project-types";

/// A marker that identifies a project type.
///
/// A single path matches when it exists; a list matches only when every
/// path in it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Matcher {
    Path(String),
    All(Vec<String>),
}

impl Matcher {
    pub fn matches(&self, runtime: &dyn Runtime, project_root: &Path) -> bool {
        match self {
            Matcher::Path(path) => runtime.exists(&project_root.join(path)),
            Matcher::All(paths) => {
                !paths.is_empty()
                    && paths
                        .iter()
                        .all(|path| runtime.exists(&project_root.join(path)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectType {
    pub friendly_name: String,
    pub machine_name: String,
    pub matchable_files: Vec<Matcher>,
    #[serde(default)]
    pub priority: i32,
    /// Operation kinds in the order they are applied
    pub operations: Vec<OperationKind>,
    /// Subdirectories of `.installer` version directories are read from
    pub project_dirs: Vec<String>,
}

impl ProjectType {
    /// True when any of the markers matches the project root.
    pub fn matches(&self, runtime: &dyn Runtime, project_root: &Path) -> bool {
        self.matchable_files
            .iter()
            .any(|matcher| matcher.matches(runtime, project_root))
    }

    pub fn symfony4() -> Self {
        Self {
            friendly_name: "Symfony 4".into(),
            machine_name: "symfony4".into(),
            matchable_files: vec![Matcher::Path("config/packages".into())],
            priority: 0,
            operations: vec![
                OperationKind::CopyFiles,
                OperationKind::EnvironmentVariables,
                OperationKind::RegisterBundle,
                OperationKind::Gitignore,
            ],
            project_dirs: vec!["symfony4".into(), "symfony".into()],
        }
    }

    pub fn drupal8() -> Self {
        Self {
            friendly_name: "Drupal 8".into(),
            machine_name: "drupal-8".into(),
            matchable_files: vec![Matcher::Path("core/lib/Drupal".into())],
            priority: 0,
            operations: vec![
                OperationKind::CopyFiles,
                OperationKind::EnvironmentVariables,
                OperationKind::Gitignore,
            ],
            project_dirs: vec!["drupal".into(), "drupal8".into()],
        }
    }

    /// Fallback type that matches every project.
    pub fn generic() -> Self {
        Self {
            friendly_name: "Generic project".into(),
            machine_name: "any".into(),
            matchable_files: vec![Matcher::Path(".".into())],
            priority: -1000,
            operations: vec![
                OperationKind::CopyFiles,
                OperationKind::EnvironmentVariables,
                OperationKind::Gitignore,
            ],
            project_dirs: vec!["any".into()],
        }
    }
}
