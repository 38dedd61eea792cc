use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use super::paths;
use crate::config::Settings;
use crate::plugin::Plugin;
use crate::runtime::Runtime;

/// Everything a command needs, resolved from the command line.
pub struct Config<R: Runtime> {
    pub runtime: R,
    pub project_root: PathBuf,
    pub vendor_dir: PathBuf,
    pub manifest: PathBuf,
}

impl<R: Runtime> Config<R> {
    pub fn new(
        runtime: R,
        project_root: Option<PathBuf>,
        vendor_dir: Option<PathBuf>,
        manifest: Option<PathBuf>,
    ) -> Result<Self> {
        let project_root = paths::project_root(&runtime, project_root)?;
        let vendor_dir = paths::vendor_dir(&project_root, vendor_dir);
        let manifest = paths::manifest(&project_root, manifest);
        debug!("Vendor dir: {:?}, manifest: {:?}", vendor_dir, manifest);

        Ok(Self {
            runtime,
            project_root,
            vendor_dir,
            manifest,
        })
    }

    /// Read the settings and activate the plugin.
    pub fn activate(self) -> Result<Plugin<R>> {
        let settings = Settings::load(&self.runtime, &self.manifest)?;
        Plugin::activate(self.runtime, self.project_root, self.vendor_dir, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use crate::test_utils::ProjectFixture;

    #[test]
    fn test_config_new_defaults() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/work/app")));

        let config = Config::new(runtime, None, None, None).unwrap();
        assert_eq!(config.project_root, PathBuf::from("/work/app"));
        assert_eq!(config.vendor_dir, PathBuf::from("/work/app/vendor"));
        assert_eq!(config.manifest, PathBuf::from("/work/app/composer.json"));
    }

    #[test]
    fn test_activate_reads_manifest_settings() {
        let fixture = ProjectFixture::new();
        fixture.write_project_file(
            "composer.json",
            r#"{"extra": {"scaffolder": {"enabled": false}}}"#,
        );

        let config = Config::new(RealRuntime, Some(fixture.root.clone()), None, None).unwrap();
        let plugin = config.activate().unwrap();
        assert!(!plugin.settings().enabled);
    }

    #[test]
    fn test_activate_rejects_invalid_manifest() {
        let fixture = ProjectFixture::new();
        fixture.write_project_file("composer.json", "{");

        let config = Config::new(RealRuntime, Some(fixture.root.clone()), None, None).unwrap();
        assert!(config.activate().is_err());
    }
}
