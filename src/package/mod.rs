//! Installed packages and their versioned installer sources.
//!
//! A package carries its scaffolding sources in an `.installer` directory:
//!
//! ```text
//! <install_path>/.installer/<project-dir>/<version>/{files/**, .env, bundles.php, gitignore}
//! <install_path>/.installer/operations/*.json
//! <install_path>/.installer/project-types/*.json
//! ```

mod discovery;
mod version;

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};

pub use discovery::find_installed_packages;
pub use version::{Version, VersionDirectory, scan_versions};

/// Name of the directory a package ships its installer sources in.
pub const INSTALLER_DIR: &str = ".installer";

/// A package as reported by the host package manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Unique package name (e.g., "acme/widget")
    pub name: String,
    /// Directory the package was installed to
    pub install_path: PathBuf,
}

impl Package {
    pub fn new(name: impl Into<String>, install_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            install_path: install_path.into(),
        }
    }

    /// Resolve a package installed in the conventional `<vendor_dir>/<vendor>/<name>` location.
    pub fn in_vendor_dir(name: &str, vendor_dir: &Path) -> Result<Self> {
        let parts: Vec<&str> = name.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            anyhow::bail!(
                "Invalid package name '{}'. Expected 'vendor/name'.",
                name
            );
        }
        Ok(Self::new(name, vendor_dir.join(parts[0]).join(parts[1])))
    }

    /// `<install_path>/.installer`
    pub fn installer_dir(&self) -> PathBuf {
        self.install_path.join(INSTALLER_DIR)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_in_vendor_dir() {
        let package = Package::in_vendor_dir("acme/widget", Path::new("/project/vendor")).unwrap();
        assert_eq!(package.name, "acme/widget");
        assert_eq!(
            package.install_path,
            PathBuf::from("/project/vendor/acme/widget")
        );
        assert_eq!(
            package.installer_dir(),
            PathBuf::from("/project/vendor/acme/widget/.installer")
        );
    }

    #[test]
    fn test_package_in_vendor_dir_invalid() {
        let vendor = Path::new("/vendor");
        assert!(Package::in_vendor_dir("widget", vendor).is_err());
        assert!(Package::in_vendor_dir("/widget", vendor).is_err());
        assert!(Package::in_vendor_dir("acme/", vendor).is_err());
        assert!(Package::in_vendor_dir("a/b/c", vendor).is_err());
    }

    #[test]
    fn test_package_display() {
        let package = Package::new("acme/widget", "/tmp");
        assert_eq!(package.to_string(), "acme/widget");
    }
}
