//! Applies and reverses a package's operations for one project type.

use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::operation::{
    Operation, OperationContext, OperationRegistry, OperationResultCollection,
};
use crate::package::{Package, Version, VersionDirectory};
use crate::project_type::ProjectType;
use crate::runtime::Runtime;

/// What an uninstall did.
pub struct Uninstalled {
    pub results: OperationResultCollection,
    /// Whether the package had a lock entry, now dropped
    pub forgot_package: bool,
}

/// Orchestrates one package event.
///
/// Install walks the versions newer than the last recorded one and applies
/// every available operation to each of them, recording what was done.
/// Uninstall replays those records and then forgets the package.
pub struct PackageHandler<'a, R: Runtime> {
    runtime: &'a R,
    package: &'a Package,
    project_type: &'a ProjectType,
    project_root: &'a Path,
    operations: &'a OperationRegistry,
    config: &'a mut Config,
}

impl<'a, R: Runtime> PackageHandler<'a, R> {
    pub fn new(
        runtime: &'a R,
        package: &'a Package,
        project_type: &'a ProjectType,
        project_root: &'a Path,
        operations: &'a OperationRegistry,
        config: &'a mut Config,
    ) -> Self {
        Self {
            runtime,
            package,
            project_type,
            project_root,
            operations,
            config,
        }
    }

    /// Whether the package ships installer sources at all.
    pub fn contains_installer_directory(&self) -> bool {
        self.runtime.is_dir(&self.package.installer_dir())
    }

    #[tracing::instrument(skip(self), fields(package = %self.package.name))]
    pub fn handle_install(&mut self) -> OperationResultCollection {
        let mut results = OperationResultCollection::new();
        let runtime: &dyn Runtime = self.runtime;
        let package = self.package;

        let versions = match self
            .config
            .installable_versions(runtime, package, self.project_type)
        {
            Ok(versions) => versions,
            Err(e) => {
                warn!("Could not read versions of {}: {:#}", package, e);
                return results;
            }
        };
        if versions.is_empty() {
            debug!("Nothing new to install for {}", package);
            return results;
        }

        let paths: Vec<PathBuf> = versions.iter().map(|dir| dir.path.clone()).collect();
        let ctx = OperationContext::new(runtime, self.project_root, &package.name);
        let mut highest: Option<&Version> = None;

        for operation in self.operations.for_project_type(self.project_type) {
            if !operation.is_available(&ctx, &paths) {
                debug!("{} is not available for {}", operation.friendly_name(), package);
                continue;
            }
            let kind = operation.handles();

            for version in distinct_versions(&versions) {
                highest = match highest {
                    Some(seen) if seen >= version => Some(seen),
                    _ => Some(version),
                };

                let Some(source) = source_for(&ctx, operation.as_ref(), &versions, version) else {
                    continue;
                };
                let result = operation.install(&ctx, source);
                if result.is_neutral() {
                    continue;
                }
                self.config.record_operation(
                    &package.name,
                    version,
                    kind.as_str(),
                    result.extra_config().clone(),
                );
                results.push(result.labeled(version, operation.friendly_name()));
            }
        }

        if let Some(version) = highest {
            self.config.set_version(&package.name, version);
        }
        results
    }

    /// Reverse every operation recorded for the package, for every
    /// recorded version, then drop the package from the lock file.
    ///
    /// Operations that can work from their record alone are reversed even
    /// when the package no longer ships the version directory.
    #[tracing::instrument(skip(self), fields(package = %self.package.name))]
    pub fn handle_uninstall(&mut self) -> Uninstalled {
        let mut results = OperationResultCollection::new();
        let runtime: &dyn Runtime = self.runtime;
        let package = self.package;

        let recorded = self.config.recorded_versions(&package.name);
        let on_disk = self
            .config
            .package_versions(runtime, package, self.project_type)
            .unwrap_or_else(|e| {
                warn!("Could not read versions of {}: {:#}", package, e);
                vec![]
            });
        let ctx = OperationContext::new(runtime, self.project_root, &package.name);

        for operation in self.operations.for_project_type(self.project_type) {
            let kind = operation.handles();
            for version in &recorded {
                let Some(extra) = self
                    .config
                    .extra_config(&package.name, version, kind.as_str())
                    .cloned()
                else {
                    continue;
                };

                let source = match source_for(&ctx, operation.as_ref(), &on_disk, version) {
                    Some(path) => path.to_path_buf(),
                    None if operation.uninstall_needs_source() => {
                        debug!(
                            "{} of {} has no sources left for version {}",
                            operation.friendly_name(),
                            package,
                            version
                        );
                        continue;
                    }
                    None => self.missing_version_dir(version),
                };

                let result = operation.uninstall(&ctx, &source, &extra);
                if !result.is_neutral() {
                    results.push(result.labeled(version, operation.friendly_name()));
                }
            }
        }

        let forgot_package = self.config.remove_package(&package.name);
        Uninstalled {
            results,
            forgot_package,
        }
    }

    /// Where a version directory would live if the package still shipped it.
    fn missing_version_dir(&self, version: &Version) -> PathBuf {
        let installer_dir = self.package.installer_dir();
        match self.project_type.project_dirs.first() {
            Some(project_dir) => installer_dir.join(project_dir).join(version.as_str()),
            None => installer_dir.join(version.as_str()),
        }
    }
}

/// Each version once, ascending, from a sorted scan.
fn distinct_versions(versions: &[VersionDirectory]) -> Vec<&Version> {
    let mut distinct: Vec<&Version> = Vec::new();
    for dir in versions {
        if distinct.last() != Some(&&dir.version) {
            distinct.push(&dir.version);
        }
    }
    distinct
}

/// The first directory of `version`, in project-dir order, holding the
/// operation's sources.
fn source_for<'v>(
    ctx: &OperationContext<'_>,
    operation: &dyn Operation,
    versions: &'v [VersionDirectory],
    version: &Version,
) -> Option<&'v Path> {
    versions
        .iter()
        .filter(|dir| &dir.version == version)
        .map(|dir| dir.path.as_path())
        .find(|path| operation.has_source(ctx, path))
}
