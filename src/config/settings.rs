use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::runtime::Runtime;

/// Key under the manifest's `extra` section holding the settings.
pub const SETTINGS_KEY: &str = "scaffolder";

/// Project-level settings, read from `extra.scaffolder` in the root manifest.
///
/// ```json
/// { "extra": { "scaffolder": { "enabled": true, "exclude": ["acme/legacy"], "project-type": "symfony4" } } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub enabled: bool,
    pub exclude: Vec<String>,
    /// Machine name of a project type that overrides detection
    pub project_type: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude: vec![],
            project_type: None,
        }
    }
}

impl Settings {
    /// Read settings from a manifest file. A missing manifest yields defaults.
    #[tracing::instrument(skip(runtime))]
    pub fn load(runtime: &dyn Runtime, manifest: &Path) -> Result<Self> {
        if !runtime.exists(manifest) {
            debug!("No manifest at {:?}, using default settings", manifest);
            return Ok(Self::default());
        }
        let content = runtime
            .read_to_string(manifest)
            .with_context(|| format!("Could not read manifest {}", manifest.display()))?;
        Self::from_manifest(&content)
            .with_context(|| format!("Invalid settings in {}", manifest.display()))
    }

    /// Parse the settings out of manifest JSON.
    pub fn from_manifest(content: &str) -> Result<Self> {
        let manifest: Value = serde_json::from_str(content)?;
        match manifest.get("extra").and_then(|extra| extra.get(SETTINGS_KEY)) {
            Some(value) => Ok(Self::deserialize(value)?),
            None => Ok(Self::default()),
        }
    }

    pub fn is_excluded(&self, package: &str) -> bool {
        self.exclude.iter().any(|name| name == package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_defaults_without_extra() {
        let settings = Settings::from_manifest(r#"{"name": "acme/app"}"#).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.enabled);
        assert!(settings.project_type.is_none());
    }

    #[test]
    fn test_reads_all_keys() {
        let settings = Settings::from_manifest(
            r#"{
                "extra": {
                    "scaffolder": {
                        "enabled": false,
                        "exclude": ["acme/legacy"],
                        "project-type": "drupal-8"
                    }
                }
            }"#,
        )
        .unwrap();

        assert!(!settings.enabled);
        assert!(settings.is_excluded("acme/legacy"));
        assert!(!settings.is_excluded("acme/widget"));
        assert_eq!(settings.project_type.as_deref(), Some("drupal-8"));
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings =
            Settings::from_manifest(r#"{"extra": {"scaffolder": {"exclude": ["a/b"]}}}"#).unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.exclude, vec!["a/b".to_string()]);
    }

    #[test]
    fn test_invalid_settings_type() {
        assert!(
            Settings::from_manifest(r#"{"extra": {"scaffolder": {"enabled": "yes"}}}"#).is_err()
        );
    }

    #[test]
    fn test_load_missing_manifest() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let settings = Settings::load(&runtime, Path::new("/project/composer.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_reports_manifest_path() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("not json".to_string()));

        let err = Settings::load(&runtime, Path::new("/project/composer.json")).unwrap_err();
        assert!(err.to_string().contains("/project/composer.json"));
    }
}
