use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Manifest the settings are read from, relative to the project root.
pub const DEFAULT_MANIFEST: &str = "composer.json";

/// Vendor directory, relative to the project root.
pub const DEFAULT_VENDOR_DIR: &str = "vendor";

/// Get the project root, defaulting to the current directory.
#[tracing::instrument(skip(runtime))]
pub fn project_root<R: Runtime>(runtime: &R, root: Option<PathBuf>) -> Result<PathBuf> {
    let root = match root {
        Some(path) => path,
        None => runtime.current_dir()?,
    };
    info!("Using project root: {}", root.display());
    Ok(root)
}

pub fn vendor_dir(project_root: &Path, vendor_dir: Option<PathBuf>) -> PathBuf {
    vendor_dir.unwrap_or_else(|| project_root.join(DEFAULT_VENDOR_DIR))
}

pub fn manifest(project_root: &Path, manifest: Option<PathBuf>) -> PathBuf {
    manifest.unwrap_or_else(|| project_root.join(DEFAULT_MANIFEST))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_project_root_defaults_to_current_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/work/app")));

        assert_eq!(
            project_root(&runtime, None).unwrap(),
            PathBuf::from("/work/app")
        );
    }

    #[test]
    fn test_project_root_explicit() {
        let runtime = MockRuntime::new();
        assert_eq!(
            project_root(&runtime, Some(PathBuf::from("/srv/app"))).unwrap(),
            PathBuf::from("/srv/app")
        );
    }

    #[test]
    fn test_defaults_relative_to_root() {
        let root = Path::new("/srv/app");
        assert_eq!(vendor_dir(root, None), PathBuf::from("/srv/app/vendor"));
        assert_eq!(manifest(root, None), PathBuf::from("/srv/app/composer.json"));
        assert_eq!(
            vendor_dir(root, Some(PathBuf::from("/opt/deps"))),
            PathBuf::from("/opt/deps")
        );
    }
}
