//! Operations that append a marked block of package content to project files.

use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::marker::{MarkerEnvelope, unique_hash};
use super::{Operation, OperationContext, OperationKind, OperationResult};
use crate::config::ExtraConfig;

/// Env files that receive the package's `.env` content, in order.
pub const ENV_TARGETS: [&str; 4] = [".env.example", ".env.local", ".env.dist", ".env"];

/// Appends the content of one source file to a list of project files.
///
/// The appended block is wrapped in markers carrying a fresh hash, which is
/// recorded together with the written files so uninstall can cut it out again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOperation {
    kind: OperationKind,
    friendly_name: String,
    source: String,
    targets: Vec<String>,
    create_missing: bool,
    project_types: Vec<String>,
}

impl AppendOperation {
    pub fn new(
        kind: OperationKind,
        friendly_name: impl Into<String>,
        source: impl Into<String>,
        targets: Vec<String>,
        create_missing: bool,
    ) -> Self {
        Self {
            kind,
            friendly_name: friendly_name.into(),
            source: source.into(),
            targets,
            create_missing,
            project_types: Vec::new(),
        }
    }

    /// Also run for these project types, whatever kinds they list.
    pub fn with_project_types(mut self, project_types: Vec<String>) -> Self {
        self.project_types = project_types;
        self
    }

    /// `.env` into the env files that already exist.
    pub fn environment_variables() -> Self {
        Self::new(
            OperationKind::EnvironmentVariables,
            "Copy Environment Variables",
            ".env",
            ENV_TARGETS.iter().map(|t| t.to_string()).collect(),
            false,
        )
    }

    /// `gitignore` into `.gitignore`, created when missing.
    pub fn gitignore() -> Self {
        Self::new(
            OperationKind::Gitignore,
            "Gitignore",
            "gitignore",
            vec![".gitignore".to_string()],
            true,
        )
    }

    fn recorded_files(&self, extra: &ExtraConfig) -> Vec<String> {
        match extra.get("files").and_then(Value::as_array) {
            Some(files) => files
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => self.targets.clone(),
        }
    }
}

impl Operation for AppendOperation {
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
        if !paths.iter().any(|path| self.has_source(ctx, path)) {
            return false;
        }
        self.create_missing
            || self
                .targets
                .iter()
                .any(|target| ctx.runtime.exists(&ctx.target(target)))
    }

    fn has_source(&self, ctx: &OperationContext<'_>, source: &Path) -> bool {
        ctx.runtime.is_file(&source.join(&self.source))
    }

    /// The recorded hash and files are all uninstall needs.
    fn uninstall_needs_source(&self) -> bool {
        false
    }

    #[tracing::instrument(skip(self, ctx), fields(kind = %self.kind))]
    fn install(&self, ctx: &OperationContext<'_>, source: &Path) -> OperationResult {
        let mut result = OperationResult::new();
        let source_file = source.join(&self.source);
        if !ctx.runtime.is_file(&source_file) {
            return result;
        }

        let content = match ctx.runtime.read_to_string(&source_file) {
            Ok(content) => content,
            Err(e) => {
                result.add_error(format!(
                    "Could not read {} from {}: {:#}",
                    self.source, ctx.package_name, e
                ));
                return result;
            }
        };

        let hash = unique_hash();
        let block = MarkerEnvelope::new(ctx.package_name, &hash).wrap(&content);
        let mut written = Vec::new();

        for target in &self.targets {
            let path = ctx.target(target);
            if !self.create_missing && !ctx.runtime.exists(&path) {
                continue;
            }
            match ctx.runtime.append(&path, block.as_bytes()) {
                Ok(()) => {
                    debug!("Appended {} to {:?}", self.source, path);
                    written.push(target.clone());
                }
                Err(e) => {
                    result.add_error(format!(
                        "Could not write {} content from {} to '{}': {:#}",
                        self.source, ctx.package_name, target, e
                    ));
                }
            }
        }

        if written.is_empty() {
            return result;
        }

        let mut extra = ExtraConfig::new();
        extra.insert("hash".into(), Value::from(hash));
        extra.insert("files".into(), Value::from(written.clone()));
        result.set_extra_config(extra);
        if !result.is_failure() {
            result.add_status(format!(
                "Successfully copied {} content from {} to {}",
                self.source,
                ctx.package_name,
                written.join(", ")
            ));
        }
        result
    }

    #[tracing::instrument(skip(self, ctx, extra), fields(kind = %self.kind))]
    fn uninstall(
        &self,
        ctx: &OperationContext<'_>,
        _source: &Path,
        extra: &ExtraConfig,
    ) -> OperationResult {
        let mut result = OperationResult::new();
        let Some(hash) = extra.get("hash").and_then(Value::as_str) else {
            debug!("No hash recorded for {} of {}", self.kind, ctx.package_name);
            return result;
        };
        let envelope = MarkerEnvelope::new(ctx.package_name, hash);
        let mut cleaned = Vec::new();

        for target in self.recorded_files(extra) {
            let path = ctx.target(&target);
            if !ctx.runtime.is_file(&path) {
                continue;
            }
            let content = match ctx.runtime.read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    result.add_error(format!("Could not read '{}': {:#}", target, e));
                    continue;
                }
            };
            let Some(stripped) = envelope.strip(&content) else {
                debug!("Markers of {} not found in {:?}", ctx.package_name, path);
                continue;
            };
            match ctx.runtime.write(&path, stripped.as_bytes()) {
                Ok(()) => cleaned.push(target),
                Err(e) => {
                    result.add_error(format!("Could not write '{}': {:#}", target, e));
                }
            }
        }

        if !cleaned.is_empty() && !result.is_failure() {
            result.add_status(format!(
                "Successfully removed {} content of {} from {}",
                self.source,
                ctx.package_name,
                cleaned.join(", ")
            ));
        }
        result
    }
}
