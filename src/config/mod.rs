//! Persisted installer state.
//!
//! One JSON lock file per project records, for every handled package, the
//! last version whose operations were applied and the extra config each
//! operation produced per version:
//!
//! ```json
//! {
//!   "COMMENT": "THIS FILE SHOULD BE COMMITTED TO YOUR SOURCE CONTROL SOFTWARE",
//!   "acme/widget": {
//!     "version": "1.2",
//!     "operations": {
//!       "1.0": { "copyFiles": {} },
//!       "1.2": { "environmentVariables": { "hash": "...", "files": [".env"] } }
//!     }
//!   }
//! }
//! ```

mod settings;

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::package::{Package, Version, VersionDirectory, scan_versions};
use crate::project_type::ProjectType;
use crate::runtime::Runtime;

pub use settings::Settings;

/// Lock file name, created in the project root.
pub const LOCK_FILE_NAME: &str = "scaffolder.lock";

/// Written into a freshly created lock file.
pub const LOCK_COMMENT: &str = "THIS FILE SHOULD BE COMMITTED TO YOUR SOURCE CONTROL SOFTWARE";

/// Opaque per-operation state produced by install and handed back to uninstall.
pub type ExtraConfig = serde_json::Map<String, Value>;

/// Recorded state of a single package.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PackageState {
    /// Highest version whose operations were applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// `operations[version][kind] = extra config`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub operations: BTreeMap<String, BTreeMap<String, ExtraConfig>>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
struct LockDocument {
    #[serde(rename = "COMMENT", default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(flatten)]
    packages: BTreeMap<String, PackageState>,
}

/// The lock file store. Loaded once, mutated in memory, flushed per event.
#[derive(Debug)]
pub struct Config {
    path: PathBuf,
    document: LockDocument,
}

impl Config {
    /// Load the lock file in `project_root`, creating it when missing.
    ///
    /// Failing here is fatal for the whole run.
    #[tracing::instrument(skip(runtime))]
    pub fn load_or_create(runtime: &dyn Runtime, project_root: &Path) -> Result<Self> {
        let path = project_root.join(LOCK_FILE_NAME);

        if !runtime.exists(&path) {
            debug!("Creating lock file {:?}", path);
            let document = LockDocument {
                comment: Some(LOCK_COMMENT.to_string()),
                packages: BTreeMap::new(),
            };
            let content = serde_json::to_string_pretty(&document)?;
            runtime
                .write(&path, content.as_bytes())
                .with_context(|| {
                    format!("Could not create config file at {}", project_root.display())
                })?;
        }

        let content = runtime
            .read_to_string(&path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        let document: LockDocument = serde_json::from_str(&content)
            .with_context(|| format!("Could not parse config file {}", path.display()))?;

        Ok(Self { path, document })
    }

    /// Recorded state for a package, if any.
    pub fn package_state(&self, package: &str) -> Option<&PackageState> {
        self.document.packages.get(package)
    }

    /// The last version whose operations were applied, `0` when none
    /// or when the recorded value is unreadable.
    pub fn last_configured_version(&self, package: &str) -> Version {
        self.package_state(package)
            .and_then(|state| state.version.as_deref())
            .and_then(|version| version.parse().ok())
            .unwrap_or_default()
    }

    /// All version directories the package ships for this project type, ascending.
    pub fn package_versions(
        &self,
        runtime: &dyn Runtime,
        package: &Package,
        project_type: &ProjectType,
    ) -> Result<Vec<VersionDirectory>> {
        let installer_dir = package.installer_dir();
        if !runtime.exists(&installer_dir) {
            return Ok(vec![]);
        }
        scan_versions(runtime, &installer_dir, &project_type.project_dirs)
    }

    /// Version directories strictly newer than the last configured version, ascending.
    pub fn installable_versions(
        &self,
        runtime: &dyn Runtime,
        package: &Package,
        project_type: &ProjectType,
    ) -> Result<Vec<VersionDirectory>> {
        let last = self.last_configured_version(&package.name);
        Ok(self
            .package_versions(runtime, package, project_type)?
            .into_iter()
            .filter(|dir| dir.version > last)
            .collect())
    }

    /// Extra config recorded for an operation kind at a version.
    pub fn extra_config(
        &self,
        package: &str,
        version: &Version,
        kind: &str,
    ) -> Option<&ExtraConfig> {
        self.package_state(package)?
            .operations
            .get(version.as_str())?
            .get(kind)
    }

    /// Versions with recorded operations, ascending. Unreadable keys are skipped.
    pub fn recorded_versions(&self, package: &str) -> Vec<Version> {
        let Some(state) = self.package_state(package) else {
            return vec![];
        };
        let mut versions: Vec<Version> = state
            .operations
            .keys()
            .filter_map(|key| match key.parse() {
                Ok(version) => Some(version),
                Err(e) => {
                    warn!("Ignoring recorded version '{}' of {}: {:#}", key, package, e);
                    None
                }
            })
            .collect();
        versions.sort();
        versions
    }

    /// Record that an operation was applied at a version, replacing an
    /// earlier record of the same kind.
    pub fn record_operation(
        &mut self,
        package: &str,
        version: &Version,
        kind: &str,
        extra: ExtraConfig,
    ) {
        self.document
            .packages
            .entry(package.to_string())
            .or_default()
            .operations
            .entry(version.as_str().to_string())
            .or_default()
            .insert(kind.to_string(), extra);
    }

    pub fn set_version(&mut self, package: &str, version: &Version) {
        self.document
            .packages
            .entry(package.to_string())
            .or_default()
            .version = Some(version.as_str().to_string());
    }

    /// Forget everything recorded for a package. Returns whether there was
    /// anything to forget.
    pub fn remove_package(&mut self, package: &str) -> bool {
        self.document.packages.remove(package).is_some()
    }

    /// Rewrite the whole lock file.
    #[tracing::instrument(skip(self, runtime))]
    pub fn flush(&self, runtime: &dyn Runtime) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.document)?;
        runtime
            .write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to save config to {:?}", self.path))
    }
}
