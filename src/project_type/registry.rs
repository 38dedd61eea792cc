use anyhow::{Context, Result};
use log::{debug, warn};
use std::cmp::Reverse;
use std::path::Path;

use super::{PROJECT_TYPES_DIR, ProjectType};
use crate::package::Package;
use crate::runtime::{Runtime, sorted_entries};

/// Registry of known project types, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ProjectTypeRegistry {
    types: Vec<ProjectType>,
}

impl ProjectTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in project types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ProjectType::symfony4());
        registry.register(ProjectType::drupal8());
        registry.register(ProjectType::generic());
        registry
    }

    /// Built-ins followed by every type contributed by `packages`, in order.
    ///
    /// Broken manifests are logged and skipped.
    #[tracing::instrument(skip(runtime, packages))]
    pub fn discover(runtime: &dyn Runtime, packages: &[Package]) -> Self {
        let mut registry = Self::with_builtins();
        for package in packages {
            let dir = package.installer_dir().join(PROJECT_TYPES_DIR);
            if !runtime.is_dir(&dir) {
                continue;
            }
            let entries = match sorted_entries(runtime, &dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Could not read project types of {}: {:#}", package, e);
                    continue;
                }
            };
            for path in entries {
                if path.extension().is_none_or(|ext| ext != "json") || !runtime.is_file(&path) {
                    continue;
                }
                match load_project_type(runtime, &path) {
                    Ok(project_type) => {
                        debug!(
                            "Registering project type {} from {}",
                            project_type.machine_name, package
                        );
                        registry.register(project_type);
                    }
                    Err(e) => warn!("Skipping project type {:?}: {:#}", path, e),
                }
            }
        }
        registry
    }

    /// Register a project type.
    ///
    /// A type with the same machine name is replaced in place.
    pub fn register(&mut self, project_type: ProjectType) {
        match self
            .types
            .iter_mut()
            .find(|existing| existing.machine_name == project_type.machine_name)
        {
            Some(existing) => *existing = project_type,
            None => self.types.push(project_type),
        }
    }

    pub fn get(&self, machine_name: &str) -> Option<&ProjectType> {
        self.types
            .iter()
            .find(|project_type| project_type.machine_name == machine_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Determine the project type of `project_root`.
    ///
    /// An explicit machine name wins when it is registered. Otherwise types
    /// are tried by descending priority, ties in registration order.
    pub fn detect(
        &self,
        runtime: &dyn Runtime,
        project_root: &Path,
        explicit: Option<&str>,
    ) -> Option<&ProjectType> {
        if let Some(name) = explicit {
            match self.get(name) {
                Some(project_type) => return Some(project_type),
                None => warn!(
                    "Unknown project type '{}' in settings, detecting automatically",
                    name
                ),
            }
        }

        let mut candidates: Vec<&ProjectType> = self.types.iter().collect();
        candidates.sort_by_key(|project_type| Reverse(project_type.priority));
        candidates
            .into_iter()
            .find(|project_type| project_type.matches(runtime, project_root))
    }
}

fn load_project_type(runtime: &dyn Runtime, path: &Path) -> Result<ProjectType> {
    let content = runtime.read_to_string(path)?;
    let project_type: ProjectType =
        serde_json::from_str(&content).context("Invalid project type definition")?;
    if project_type.machine_name.is_empty() {
        anyhow::bail!("Project type has an empty machine name");
    }
    Ok(project_type)
}
