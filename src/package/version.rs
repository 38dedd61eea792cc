//! Version directories inside a package's `.installer` tree.
//!
//! Version directory names follow `v?MAJOR[.MINOR[.PATCH]]`. Comparison is
//! numeric per component; when one version is a prefix of the other the
//! shorter one sorts first (`1.0 < 1.0.0 < 1.0.1`).

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::runtime::{Runtime, sorted_entries};

static VERSION_DIR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?\d+(?:\.\d+(?:\.\d+)?)?$").unwrap());

/// A dotted numeric version, stored without the optional `v` prefix.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    parts: Vec<u64>,
}

impl Version {
    /// Whether a directory name is a version directory.
    pub fn is_version_dir_name(name: &str) -> bool {
        VERSION_DIR_REGEX.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Version `0`, assumed for packages nothing was applied for yet.
impl Default for Version {
    fn default() -> Self {
        Self {
            raw: "0".to_string(),
            parts: vec![0],
        }
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix('v').unwrap_or(s);
        if raw.is_empty() {
            anyhow::bail!("Invalid version '{}'", s);
        }
        let parts = raw
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .with_context(|| format!("Invalid version '{}'", s))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

/// A version paired with the directory holding its operation sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDirectory {
    pub version: Version,
    pub path: PathBuf,
}

impl VersionDirectory {
    pub fn new(version: Version, path: PathBuf) -> Self {
        Self { version, path }
    }
}

/// Scan `<installer_dir>/<project_dir>/<version>` for every project dir.
///
/// Missing project dirs are skipped. The result is sorted ascending by
/// version; the sort is stable so equal versions keep project-dir order.
#[tracing::instrument(skip(runtime, installer_dir, project_dirs))]
pub fn scan_versions(
    runtime: &dyn Runtime,
    installer_dir: &Path,
    project_dirs: &[String],
) -> Result<Vec<VersionDirectory>> {
    let mut versions = Vec::new();

    for project_dir in project_dirs {
        let project_path = installer_dir.join(project_dir);
        if !runtime.is_dir(&project_path) {
            continue;
        }

        for entry in sorted_entries(runtime, &project_path)? {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !Version::is_version_dir_name(name) || !runtime.is_dir(&entry) {
                continue;
            }
            match name.parse::<Version>() {
                Ok(version) => {
                    debug!("Found version {} at {:?}", version, entry);
                    versions.push(VersionDirectory::new(version, entry.clone()));
                }
                Err(e) => warn!("Skipping version directory {:?}: {}", entry, e),
            }
        }
    }

    versions.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_version_dir_names() {
        for name in ["1", "1.0", "1.0.0", "v1", "v2.3", "v10.20.30"] {
            assert!(Version::is_version_dir_name(name), "{} should match", name);
        }
        for name in ["files", "1.0.0.0", "1.0-beta", "V1.0", "1.", ".1", "vv1"] {
            assert!(!Version::is_version_dir_name(name), "{} should not match", name);
        }
    }

    #[test]
    fn test_version_strips_prefix() {
        let version = v("v1.2");
        assert_eq!(version.as_str(), "1.2");
        assert_eq!(version.to_string(), "1.2");
    }

    #[test]
    fn test_version_invalid() {
        assert!("".parse::<Version>().is_err());
        assert!("v".parse::<Version>().is_err());
        assert!("1.x".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("0") < v("1.0"));
        assert!(v("1.0") < v("1.0.0"));
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.2"));
        assert!(v("1.2") < v("1.10"));
        assert!(v("1.10") < v("2"));
        assert_eq!(v("v1.2"), v("1.2"));
        assert_eq!(Version::default(), v("0"));
    }

    #[test]
    fn test_scan_versions_sorted_across_project_dirs() {
        let mut runtime = MockRuntime::new();
        let installer = PathBuf::from("/pkg/.installer");
        let symfony4 = installer.join("symfony4");
        let symfony = installer.join("symfony");

        runtime
            .expect_is_dir()
            .with(eq(symfony4.clone()))
            .returning(|_| true);
        runtime
            .expect_is_dir()
            .with(eq(symfony.clone()))
            .returning(|_| true);

        runtime
            .expect_read_dir()
            .with(eq(symfony4.clone()))
            .returning(|p| Ok(vec![p.join("v2.0"), p.join("notes"), p.join("1.0")]));
        runtime
            .expect_read_dir()
            .with(eq(symfony.clone()))
            .returning(|p| Ok(vec![p.join("1.2"), p.join("README.md")]));

        // Every other directory check is a version directory
        runtime.expect_is_dir().returning(|_| true);

        let versions = scan_versions(
            &runtime,
            &installer,
            &["symfony4".to_string(), "symfony".to_string()],
        )
        .unwrap();

        let found: Vec<_> = versions.iter().map(|d| d.version.as_str()).collect();
        assert_eq!(found, vec!["1.0", "1.2", "2.0"]);
        assert_eq!(versions[0].path, symfony4.join("1.0"));
        assert_eq!(versions[1].path, symfony.join("1.2"));
        assert_eq!(versions[2].path, symfony4.join("v2.0"));
    }

    #[test]
    fn test_scan_versions_missing_project_dir() {
        let mut runtime = MockRuntime::new();
        runtime.expect_is_dir().returning(|_| false);

        let versions =
            scan_versions(&runtime, Path::new("/pkg/.installer"), &["any".to_string()]).unwrap();
        assert!(versions.is_empty());
    }
}
