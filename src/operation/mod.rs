//! Operations scaffold one aspect of the host project from a package's
//! version directory and can reverse what they did.
//!
//! Operations never fail with `Err`. Problems are reported as error
//! messages on the returned [`OperationResult`] so the remaining versions
//! and operations still run.

mod append;
mod bundle;
mod copy_files;
mod marker;
mod registry;
mod result;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ExtraConfig;
use crate::runtime::Runtime;

pub use append::{AppendOperation, ENV_TARGETS};
pub use bundle::{BundleEntry, Bundles, RegisterBundleOperation};
pub use copy_files::CopyFilesOperation;
pub use marker::{MARKER_SCOPE, MarkerEnvelope, unique_hash};
pub use registry::{OPERATIONS_DIR, OperationManifest, OperationRegistry};
pub use result::{
    Message, MessageKind, MessagesCollection, OperationResult, OperationResultCollection,
};

/// Identifier of an operation, as stored in the lock file and project types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    CopyFiles,
    EnvironmentVariables,
    RegisterBundle,
    Gitignore,
    /// Kind contributed by a package manifest
    Custom(String),
}

impl OperationKind {
    pub fn as_str(&self) -> &str {
        match self {
            OperationKind::CopyFiles => "copyFiles",
            OperationKind::EnvironmentVariables => "environmentVariables",
            OperationKind::RegisterBundle => "registerBundle",
            OperationKind::Gitignore => "gitignore",
            OperationKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for OperationKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "copyFiles" => OperationKind::CopyFiles,
            "environmentVariables" => OperationKind::EnvironmentVariables,
            "registerBundle" => OperationKind::RegisterBundle,
            "gitignore" => OperationKind::Gitignore,
            _ => OperationKind::Custom(s),
        }
    }
}

impl From<&str> for OperationKind {
    fn from(s: &str) -> Self {
        OperationKind::from(s.to_string())
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        kind.as_str().to_string()
    }
}

/// What an operation gets to see of the running event.
#[derive(Clone, Copy)]
pub struct OperationContext<'a> {
    pub runtime: &'a dyn Runtime,
    pub project_root: &'a Path,
    pub package_name: &'a str,
}

impl<'a> OperationContext<'a> {
    pub fn new(runtime: &'a dyn Runtime, project_root: &'a Path, package_name: &'a str) -> Self {
        Self {
            runtime,
            project_root,
            package_name,
        }
    }

    /// Resolve a project-relative path.
    pub fn target(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.project_root.join(relative)
    }
}

/// A reversible scaffolding step.
pub trait Operation: Send + Sync {
    /// The kind this operation is registered under.
    fn handles(&self) -> OperationKind;

    /// Name used when reporting results.
    fn friendly_name(&self) -> &str;

    /// Machine names of project types this operation joins on its own,
    /// on top of the kinds a project type lists.
    fn supported_project_types(&self) -> &[String] {
        &[]
    }

    /// Whether the operation has anything to do for any of the version directories.
    fn is_available(&self, ctx: &OperationContext<'_>, paths: &[PathBuf]) -> bool;

    /// Whether one version directory holds this operation's sources.
    ///
    /// When several project dirs ship the same version, the first one with
    /// sources is the one installed from and uninstalled against.
    fn has_source(&self, ctx: &OperationContext<'_>, source: &Path) -> bool;

    /// Whether uninstall reads the version directory, or gets by on the
    /// recorded extra config alone.
    fn uninstall_needs_source(&self) -> bool {
        true
    }

    /// Apply the operation from one version directory.
    fn install(&self, ctx: &OperationContext<'_>, source: &Path) -> OperationResult;

    /// Reverse a previous install, given the extra config it recorded.
    fn uninstall(
        &self,
        ctx: &OperationContext<'_>,
        source: &Path,
        extra: &ExtraConfig,
    ) -> OperationResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_kind_round_trip_names() {
        for name in [
            "copyFiles",
            "environmentVariables",
            "registerBundle",
            "gitignore",
            "publishAssets",
        ] {
            assert_eq!(OperationKind::from(name).to_string(), name);
        }
        assert_eq!(
            OperationKind::from("publishAssets"),
            OperationKind::Custom("publishAssets".into())
        );
    }

    #[test]
    fn test_operation_kind_serde_as_string() {
        let kinds: Vec<OperationKind> =
            serde_json::from_str(r#"["gitignore", "copyFiles", "other"]"#).unwrap();
        assert_eq!(
            kinds,
            vec![
                OperationKind::Gitignore,
                OperationKind::CopyFiles,
                OperationKind::Custom("other".into())
            ]
        );
        assert_eq!(
            serde_json::to_string(&OperationKind::EnvironmentVariables).unwrap(),
            r#""environmentVariables""#
        );
    }

    #[test]
    fn test_context_target() {
        let runtime = crate::runtime::RealRuntime;
        let ctx = OperationContext::new(&runtime, Path::new("/project"), "acme/widget");
        assert_eq!(ctx.target(".env"), PathBuf::from("/project/.env"));
    }
}
