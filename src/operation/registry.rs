//! Registry of operations, built-in and contributed by packages.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Component, Path};
use std::sync::Arc;

use super::{
    AppendOperation, CopyFilesOperation, Operation, OperationKind, RegisterBundleOperation,
};
use crate::package::Package;
use crate::project_type::ProjectType;
use crate::runtime::{Runtime, sorted_entries};

/// Directory inside `.installer` holding contributed operation manifests.
pub const OPERATIONS_DIR: &str = "operations";

/// A contributed operation, declared as JSON.
///
/// ```json
/// { "handles": "robots", "friendly_name": "Robots", "strategy": "append",
///   "source": "robots.txt", "targets": ["public/robots.txt"], "create_missing": true,
///   "project_types": ["symfony4", "any"] }
/// ```
///
/// `project_types` attaches the operation to those project types even when
/// they do not list its kind.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum OperationManifest {
    /// Append a marked block of `source` to every target
    Append {
        handles: OperationKind,
        friendly_name: String,
        source: String,
        targets: Vec<String>,
        #[serde(default)]
        create_missing: bool,
        #[serde(default)]
        project_types: Vec<String>,
    },
    /// Copy the `source` directory tree into the project root
    Copy {
        handles: OperationKind,
        friendly_name: String,
        source: String,
        #[serde(default)]
        project_types: Vec<String>,
    },
}

impl OperationManifest {
    fn validate(&self) -> Result<()> {
        match self {
            OperationManifest::Append {
                source, targets, ..
            } => {
                ensure_relative(source)?;
                if targets.is_empty() {
                    anyhow::bail!("An append operation needs at least one target");
                }
                targets.iter().try_for_each(|target| ensure_relative(target))
            }
            OperationManifest::Copy { source, .. } => ensure_relative(source),
        }
    }

    pub fn into_operation(self) -> Arc<dyn Operation> {
        match self {
            OperationManifest::Append {
                handles,
                friendly_name,
                source,
                targets,
                create_missing,
                project_types,
            } => Arc::new(
                AppendOperation::new(handles, friendly_name, source, targets, create_missing)
                    .with_project_types(project_types),
            ),
            OperationManifest::Copy {
                handles,
                friendly_name,
                source,
                project_types,
            } => Arc::new(
                CopyFilesOperation::new(handles, friendly_name, source)
                    .with_project_types(project_types),
            ),
        }
    }
}

/// Paths in manifests must stay inside the directory they are resolved against.
fn ensure_relative(path: &str) -> Result<()> {
    let valid = !path.is_empty()
        && Path::new(path)
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if !valid {
        anyhow::bail!("Path '{}' must be relative and must not leave its directory", path);
    }
    Ok(())
}

fn load_manifest(runtime: &dyn Runtime, path: &Path) -> Result<OperationManifest> {
    let content = runtime.read_to_string(path)?;
    let manifest: OperationManifest =
        serde_json::from_str(&content).context("Invalid operation manifest")?;
    manifest.validate()?;
    Ok(manifest)
}

/// Operations by kind, in registration order.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    operations: Vec<Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the four built-in operations.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CopyFilesOperation::default()));
        registry.register(Arc::new(AppendOperation::environment_variables()));
        registry.register(Arc::new(RegisterBundleOperation::new()));
        registry.register(Arc::new(AppendOperation::gitignore()));
        registry
    }

    /// Built-ins followed by the operations contributed by `packages`, in order.
    ///
    /// Broken manifests are logged and skipped.
    #[tracing::instrument(skip(runtime, packages))]
    pub fn discover(runtime: &dyn Runtime, packages: &[Package]) -> Self {
        let mut registry = Self::with_builtins();
        for package in packages {
            let dir = package.installer_dir().join(OPERATIONS_DIR);
            if !runtime.is_dir(&dir) {
                continue;
            }
            let entries = match sorted_entries(runtime, &dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Could not read operations of {}: {:#}", package, e);
                    continue;
                }
            };
            for path in entries {
                if path.extension().is_none_or(|ext| ext != "json") || !runtime.is_file(&path) {
                    continue;
                }
                match load_manifest(runtime, &path) {
                    Ok(manifest) => {
                        let operation = manifest.into_operation();
                        debug!(
                            "Registering operation {} from {}",
                            operation.handles(),
                            package
                        );
                        registry.register(operation);
                    }
                    Err(e) => warn!("Skipping operation {:?}: {:#}", path, e),
                }
            }
        }
        registry
    }

    /// Register an operation.
    ///
    /// An operation already registered for the same kind is replaced in place.
    pub fn register(&mut self, operation: Arc<dyn Operation>) {
        let kind = operation.handles();
        match self.operations.iter_mut().find(|op| op.handles() == kind) {
            Some(existing) => *existing = operation,
            None => self.operations.push(operation),
        }
    }

    pub fn get(&self, kind: &OperationKind) -> Option<&Arc<dyn Operation>> {
        self.operations.iter().find(|op| &op.handles() == kind)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Operations for a project type: its kinds in the type's order, then the
    /// operations that opted into the type themselves, in registration order.
    ///
    /// Kinds without a registered operation are skipped.
    pub fn for_project_type(&self, project_type: &ProjectType) -> Vec<Arc<dyn Operation>> {
        let mut operations: Vec<Arc<dyn Operation>> = project_type
            .operations
            .iter()
            .filter_map(|kind| {
                let operation = self.get(kind);
                if operation.is_none() {
                    debug!(
                        "No operation registered for {} of {}",
                        kind, project_type.machine_name
                    );
                }
                operation.cloned()
            })
            .collect();

        for operation in &self.operations {
            let opted_in = operation
                .supported_project_types()
                .iter()
                .any(|name| name == &project_type.machine_name);
            if opted_in && !project_type.operations.contains(&operation.handles()) {
                operations.push(operation.clone());
            }
        }
        operations
    }
}
