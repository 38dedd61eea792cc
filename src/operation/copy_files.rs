use anyhow::{Context, Result};
use log::debug;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

use super::{Operation, OperationContext, OperationKind, OperationResult};
use crate::config::ExtraConfig;
use crate::runtime::{Runtime, sorted_entries};

/// Copies a version directory's file tree into the project root.
///
/// Files are only copied when the target does not exist yet, and only
/// removed again when their content still matches the package's copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFilesOperation {
    kind: OperationKind,
    friendly_name: String,
    source_dir: String,
    project_types: Vec<String>,
}

impl Default for CopyFilesOperation {
    fn default() -> Self {
        Self::new(OperationKind::CopyFiles, "Copy Files", "files")
    }
}

impl CopyFilesOperation {
    pub fn new(
        kind: OperationKind,
        friendly_name: impl Into<String>,
        source_dir: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            friendly_name: friendly_name.into(),
            source_dir: source_dir.into(),
            project_types: Vec::new(),
        }
    }

    /// Also run for these project types, whatever kinds they list.
    pub fn with_project_types(mut self, project_types: Vec<String>) -> Self {
        self.project_types = project_types;
        self
    }
}

/// One entry of a walked source tree.
struct Entry {
    path: PathBuf,
    is_dir: bool,
}

/// Walk `root` depth-first, each directory listed before its contents.
fn walk(runtime: &dyn Runtime, root: &Path) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    walk_into(runtime, root, &mut entries)?;
    Ok(entries)
}

fn walk_into(runtime: &dyn Runtime, dir: &Path, entries: &mut Vec<Entry>) -> Result<()> {
    for path in sorted_entries(runtime, dir)? {
        if runtime.is_dir(&path) {
            entries.push(Entry {
                path: path.clone(),
                is_dir: true,
            });
            walk_into(runtime, &path, entries)?;
        } else {
            entries.push(Entry {
                path,
                is_dir: false,
            });
        }
    }
    Ok(())
}

/// Hex encoded SHA-256 of a file's content.
fn file_digest(runtime: &dyn Runtime, path: &Path) -> Result<String> {
    let mut reader = runtime.open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(hex::encode(hasher.finalize()))
}

impl Operation for CopyFilesOperation {
    fn handles(&self) -> OperationKind {
        self.kind.clone()
    }

    fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    fn supported_project_types(&self) -> &[String] {
        &self.project_types
    }

    fn is_available(&self, ctx: &OperationContext<'_>, paths: &[PathBuf]) -> bool {
        paths.iter().any(|path| self.has_source(ctx, path))
    }

    fn has_source(&self, ctx: &OperationContext<'_>, source: &Path) -> bool {
        ctx.runtime.is_dir(&source.join(&self.source_dir))
    }

    #[tracing::instrument(skip(self, ctx), fields(kind = %self.kind))]
    fn install(&self, ctx: &OperationContext<'_>, source: &Path) -> OperationResult {
        let mut result = OperationResult::new();
        let root = source.join(&self.source_dir);
        if !ctx.runtime.is_dir(&root) {
            return result;
        }

        let entries = match walk(ctx.runtime, &root) {
            Ok(entries) => entries,
            Err(e) => {
                result.add_error(format!(
                    "Could not read files of {}: {:#}",
                    ctx.package_name, e
                ));
                return result;
            }
        };

        let mut changes = 0;
        for entry in entries {
            let Ok(relative) = entry.path.strip_prefix(&root) else {
                continue;
            };
            let target = ctx.target(relative);

            if entry.is_dir {
                if ctx.runtime.is_dir(&target) {
                    continue;
                }
                match ctx.runtime.create_dir(&target) {
                    Ok(()) => changes += 1,
                    Err(e) => {
                        result.add_error(format!(
                            "Could not create directory '{}': {:#}",
                            relative.display(),
                            e
                        ));
                    }
                }
            } else if !ctx.runtime.exists(&target) {
                match ctx.runtime.copy(&entry.path, &target) {
                    Ok(_) => {
                        debug!("Copied {:?} to {:?}", entry.path, target);
                        changes += 1;
                    }
                    Err(e) => {
                        result.add_error(format!(
                            "Could not copy '{}': {:#}",
                            relative.display(),
                            e
                        ));
                    }
                }
            }
        }

        if changes > 0 && !result.is_failure() {
            result.add_status(format!(
                "Successfully copied files from package {}",
                ctx.package_name
            ));
        }
        result
    }

    #[tracing::instrument(skip(self, ctx, _extra), fields(kind = %self.kind))]
    fn uninstall(
        &self,
        ctx: &OperationContext<'_>,
        source: &Path,
        _extra: &ExtraConfig,
    ) -> OperationResult {
        let mut result = OperationResult::new();
        let root = source.join(&self.source_dir);
        if !ctx.runtime.is_dir(&root) {
            return result;
        }

        let entries = match walk(ctx.runtime, &root) {
            Ok(entries) => entries,
            Err(e) => {
                result.add_error(format!(
                    "Could not read files of {}: {:#}",
                    ctx.package_name, e
                ));
                return result;
            }
        };

        let mut removed = 0;
        // Reversed pre-order visits every child before its directory
        for entry in entries.into_iter().rev() {
            let Ok(relative) = entry.path.strip_prefix(&root) else {
                continue;
            };
            let target = ctx.target(relative);

            if entry.is_dir {
                if ctx.runtime.is_dir(&target) && ctx.runtime.remove_dir(&target).is_ok() {
                    debug!("Removed empty directory {:?}", target);
                }
                continue;
            }
            if !ctx.runtime.is_file(&target) {
                continue;
            }

            let unchanged = match (
                file_digest(ctx.runtime, &entry.path),
                file_digest(ctx.runtime, &target),
            ) {
                (Ok(expected), Ok(actual)) => expected == actual,
                (Err(e), _) | (_, Err(e)) => {
                    result.add_error(format!(
                        "Could not compare '{}': {:#}",
                        relative.display(),
                        e
                    ));
                    continue;
                }
            };
            if !unchanged {
                debug!("Keeping modified file {:?}", target);
                continue;
            }

            match ctx.runtime.remove_file(&target) {
                Ok(()) => removed += 1,
                Err(e) => {
                    result.add_error(format!(
                        "Could not delete '{}': {:#}",
                        relative.display(),
                        e
                    ));
                }
            }
        }

        if removed > 0 && !result.is_failure() {
            result.add_status(format!(
                "Successfully removed files of package {}",
                ctx.package_name
            ));
        }
        result
    }
}
