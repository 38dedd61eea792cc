//! Bundle registration in the project's `config/bundles.php`.

mod codec;

use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{Operation, OperationContext, OperationKind, OperationResult};
use crate::config::ExtraConfig;

pub use codec::{BundleEntry, Bundles};

const SOURCE_FILE: &str = "bundles.php";
const TARGET_FILE: &str = "config/bundles.php";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterBundleOperation;

impl RegisterBundleOperation {
    pub fn new() -> Self {
        Self
    }

    fn read_bundles(ctx: &OperationContext<'_>, path: &Path) -> anyhow::Result<Bundles> {
        let content = ctx.runtime.read_to_string(path)?;
        Bundles::decode(&content)
    }
}

impl Operation for RegisterBundleOperation {
    fn handles(&self) -> OperationKind {
        OperationKind::RegisterBundle
    }

    fn friendly_name(&self) -> &str {
        "Register Bundle"
    }

    fn is_available(&self, ctx: &OperationContext<'_>, paths: &[PathBuf]) -> bool {
        ctx.runtime.is_file(&ctx.target(TARGET_FILE))
            && paths.iter().any(|path| self.has_source(ctx, path))
    }

    fn has_source(&self, ctx: &OperationContext<'_>, source: &Path) -> bool {
        ctx.runtime.is_file(&source.join(SOURCE_FILE))
    }

    #[tracing::instrument(skip(self, ctx))]
    fn install(&self, ctx: &OperationContext<'_>, source: &Path) -> OperationResult {
        let mut result = OperationResult::new();
        let source_file = source.join(SOURCE_FILE);
        let target = ctx.target(TARGET_FILE);
        if !ctx.runtime.is_file(&source_file) || !ctx.runtime.is_file(&target) {
            return result;
        }

        let package_bundles = match Self::read_bundles(ctx, &source_file) {
            Ok(bundles) => bundles,
            Err(e) => {
                result.add_error(format!(
                    "The {} file of {} must contain a list of bundles: {:#}",
                    SOURCE_FILE, ctx.package_name, e
                ));
                return result;
            }
        };
        let mut project_bundles = match Self::read_bundles(ctx, &target) {
            Ok(bundles) => bundles,
            Err(e) => {
                result.add_error(format!(
                    "Could not read registered bundles in {}: {:#}",
                    TARGET_FILE, e
                ));
                return result;
            }
        };

        project_bundles.merge(&package_bundles);
        if let Err(e) = ctx.runtime.write(&target, project_bundles.encode().as_bytes()) {
            result.add_error(format!(
                "Could not register bundles of {}: {:#}",
                ctx.package_name, e
            ));
            return result;
        }

        debug!(
            "Registered {} bundle(s) of {}",
            package_bundles.len(),
            ctx.package_name
        );
        let mut extra = ExtraConfig::new();
        extra.insert("success".into(), Value::Bool(true));
        result
            .set_extra_config(extra)
            .add_status(format!("Successfully registered bundles of {}", ctx.package_name));
        result
    }

    #[tracing::instrument(skip(self, ctx, extra))]
    fn uninstall(
        &self,
        ctx: &OperationContext<'_>,
        source: &Path,
        extra: &ExtraConfig,
    ) -> OperationResult {
        let mut result = OperationResult::new();
        if extra.get("success").and_then(Value::as_bool) != Some(true) {
            return result;
        }

        let source_file = source.join(SOURCE_FILE);
        let target = ctx.target(TARGET_FILE);
        if !ctx.runtime.is_file(&source_file) || !ctx.runtime.is_file(&target) {
            debug!("Nothing to unregister for {}", ctx.package_name);
            return result;
        }

        let package_bundles = match Self::read_bundles(ctx, &source_file) {
            Ok(bundles) => bundles,
            Err(e) => {
                result.add_error(format!(
                    "The {} file of {} must contain a list of bundles: {:#}",
                    SOURCE_FILE, ctx.package_name, e
                ));
                return result;
            }
        };
        let mut project_bundles = match Self::read_bundles(ctx, &target) {
            Ok(bundles) => bundles,
            Err(e) => {
                result.add_error(format!(
                    "Could not read registered bundles in {}: {:#}",
                    TARGET_FILE, e
                ));
                return result;
            }
        };

        project_bundles.remove_all(&package_bundles);
        match ctx.runtime.write(&target, project_bundles.encode().as_bytes()) {
            Ok(()) => {
                result.add_status(format!(
                    "Successfully unregistered bundles of {}",
                    ctx.package_name
                ));
            }
            Err(e) => {
                result.add_error(format!(
                    "Could not unregister bundles of {}: {:#}",
                    ctx.package_name, e
                ));
            }
        }
        result
    }
}
