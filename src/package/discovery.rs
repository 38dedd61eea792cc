use anyhow::Result;
use std::path::Path;

use super::Package;
use crate::runtime::{Runtime, sorted_entries};

/// Find all packages installed in a vendor directory.
///
/// Directory structure: `<vendor_dir>/<vendor>/<name>`. Packages are returned
/// in sorted order; extension discovery relies on that order.
#[tracing::instrument(skip(runtime, vendor_dir))]
pub fn find_installed_packages(runtime: &dyn Runtime, vendor_dir: &Path) -> Result<Vec<Package>> {
    let mut packages = Vec::new();

    if !runtime.exists(vendor_dir) {
        return Ok(packages);
    }

    for vendor_path in sorted_entries(runtime, vendor_dir)? {
        if !runtime.is_dir(&vendor_path) {
            continue;
        }
        let Some(vendor) = vendor_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        for package_path in sorted_entries(runtime, &vendor_path)? {
            if !runtime.is_dir(&package_path) {
                continue;
            }
            if let Some(name) = package_path.file_name().and_then(|n| n.to_str()) {
                packages.push(Package::new(format!("{}/{}", vendor, name), package_path.clone()));
            }
        }
    }

    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    #[test]
    fn test_find_installed_packages() {
        let mut runtime = MockRuntime::new();

        // --- Setup Paths ---
        let vendor = PathBuf::from("/project/vendor");
        let acme = vendor.join("acme");

        runtime
            .expect_exists()
            .with(eq(vendor.clone()))
            .returning(|_| true);

        // /project/vendor -> [acme, autoload.php]
        runtime
            .expect_read_dir()
            .with(eq(vendor.clone()))
            .returning(|p| Ok(vec![p.join("autoload.php"), p.join("acme")]));

        // /project/vendor/acme -> [widget, gadget]
        runtime
            .expect_read_dir()
            .with(eq(acme.clone()))
            .returning(|p| Ok(vec![p.join("widget"), p.join("gadget")]));

        runtime
            .expect_is_dir()
            .returning(|p| !p.ends_with("autoload.php"));

        // --- Execute & Verify ---

        let packages = find_installed_packages(&runtime, &vendor).unwrap();
        assert_eq!(
            packages,
            vec![
                Package::new("acme/gadget", acme.join("gadget")),
                Package::new("acme/widget", acme.join("widget")),
            ]
        );
    }

    #[test]
    fn test_find_installed_packages_no_vendor_dir() {
        let mut runtime = MockRuntime::new();
        let vendor = PathBuf::from("/non-existent");

        runtime
            .expect_exists()
            .with(eq(vendor.clone()))
            .returning(|_| false);

        let packages = find_installed_packages(&runtime, &vendor).unwrap();
        assert!(packages.is_empty());
    }

    #[test]
    fn test_find_installed_packages_read_error() {
        let mut runtime = MockRuntime::new();
        let vendor = PathBuf::from("/project/vendor");

        runtime.expect_exists().returning(|_| true);
        runtime.expect_read_dir().returning(|_| {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into())
        });

        assert!(find_installed_packages(&runtime, &vendor).is_err());
    }
}
