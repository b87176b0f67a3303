//! Installed SDK versions under the installation root.
//!
//! Every installed release lives in `<root>/v<version>`. Listing goes by
//! directory name alone; [`is_installed`] also requires the SDK launcher, so a
//! half-extracted download is listed but cannot be activated.

use crate::version::Version;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const VERSION_DIR_PREFIX: &str = "v";

/// Path of the marker file, relative to a version directory.
pub const INSTALL_MARKER: [&str; 3] = ["flutter", "bin", "flutter"];

fn version_tag() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"^v(\d+(?:\.\d+)*(?:[-+].*)?)$").expect("valid regex"))
}

pub fn version_dir(root: &Path, version: &Version) -> PathBuf {
    root.join(format!("{}{}", VERSION_DIR_PREFIX, version))
}

pub fn marker_path(version_dir: &Path) -> PathBuf {
    INSTALL_MARKER
        .iter()
        .fold(version_dir.to_path_buf(), |path, part| path.join(part))
}

/// Recover the version a `v<version>` directory name encodes.
pub fn version_from_dir(path: &Path) -> Option<Version> {
    let name = path.file_name()?.to_str()?;
    let captures = version_tag().captures(name)?;
    Version::parse(&captures[1]).ok()
}

/// Installed versions, newest first. A missing root has no versions.
pub fn list_installed(root: &Path) -> io::Result<Vec<Version>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("Installation root {} does not exist", root.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if !file_type.is_dir() && !file_type.is_symlink() {
            continue;
        }
        match version_from_dir(&entry.path()) {
            Some(version) => versions.push(version),
            None => tracing::trace!("Ignoring {}", entry.path().display()),
        }
    }

    versions.sort();
    versions.reverse();
    Ok(versions)
}

pub fn is_installed(root: &Path, version: &Version) -> bool {
    marker_path(&version_dir(root, version)).is_file()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Lay out a complete installation of `version` under `root`.
    pub fn install_fake(root: &Path, version: &str) -> PathBuf {
        let dir = root.join(format!("v{}", version));
        let marker = marker_path(&dir);
        fs::create_dir_all(marker.parent().unwrap()).unwrap();
        fs::write(&marker, "#!/bin/sh\n").unwrap();
        dir
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::install_fake;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_newest_first_and_skips_noise() {
        let root = tempdir().unwrap();
        install_fake(root.path(), "3.10.6");
        install_fake(root.path(), "3.13.0");
        install_fake(root.path(), "3.7.12");
        fs::create_dir(root.path().join("vnext")).unwrap();
        fs::create_dir(root.path().join("downloads")).unwrap();
        fs::write(root.path().join("v9.9.9"), "not a directory").unwrap();

        let mut expected = vec!["3.13.0", "3.10.6", "3.7.12"];

        // SDKs kept elsewhere and linked into the root count as installed
        let elsewhere = tempdir().unwrap();
        #[cfg(unix)]
        {
            let sdk = install_fake(elsewhere.path(), "3.16.0");
            std::os::unix::fs::symlink(&sdk, root.path().join("v3.16.0")).unwrap();
            expected.insert(0, "3.16.0");
        }

        let versions: Vec<String> = list_installed(root.path())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(versions, expected);
        drop(elsewhere);
    }

    #[test]
    fn missing_root_is_empty() {
        let root = tempdir().unwrap();
        let versions = list_installed(&root.path().join("absent")).unwrap();
        assert!(versions.is_empty());
    }

    #[test]
    fn partial_install_is_not_installed() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("v3.10.6").join("flutter")).unwrap();
        assert!(!is_installed(root.path(), &Version::new(3, 10, 6)));

        install_fake(root.path(), "3.10.6");
        assert!(is_installed(root.path(), &Version::new(3, 10, 6)));
    }

    #[test]
    fn directory_names_round_trip() {
        let root = Path::new("/sdk");
        let version: Version = "3.14.0-0.2.pre".parse().unwrap();
        let dir = version_dir(root, &version);
        assert_eq!(dir, Path::new("/sdk/v3.14.0-0.2.pre"));
        assert_eq!(version_from_dir(&dir), Some(version));
        assert_eq!(version_from_dir(Path::new("/sdk/3.10.6")), None);
    }
}
