//! Staging-mount path convention.
//!
//! Spreadsheets reference source files relative to the staging share. Paths
//! are normalized to live under the staging root for export, and mapped onto
//! the locally mounted data directory when checking that a file exists.

use std::path::{Path, PathBuf};

use crate::config::Settings;

const HOME_PREFIX: &str = "/home/";

#[derive(Debug, Clone)]
pub struct StagingPaths {
    staging_root: String,
    data_mount: PathBuf,
}

impl StagingPaths {
    pub fn new(staging_root: impl Into<String>, data_mount: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
            data_mount: data_mount.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.staging_root.clone(), settings.data_mount.clone())
    }

    /// Normalize a spreadsheet path into its staging-root form.
    ///
    /// Windows separators become `/`. Home-directory paths are kept as given;
    /// anything else is re-rooted under the staging root unless it already
    /// names the `mnt` tree.
    pub fn normalize(&self, raw: &str) -> String {
        let path = raw.trim().replace('\\', "/");
        if is_home_path(&path) {
            return path;
        }

        let relative = path.trim_start_matches('/');
        if relative.starts_with("mnt/") {
            format!("/{relative}")
        } else {
            format!("{}/{}", self.staging_root, relative)
        }
    }

    /// Local filesystem location of a normalized path.
    pub fn local_path(&self, normalized: &str) -> PathBuf {
        match normalized.strip_prefix(&self.staging_root) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                let mut local = self.data_mount.as_os_str().to_owned();
                local.push(rest);
                PathBuf::from(local)
            }
            _ => PathBuf::from(normalized),
        }
    }

    /// True when the spreadsheet path names a world-readable file on the mount.
    pub fn exists(&self, raw: &str) -> bool {
        file_exists(&self.local_path(&self.normalize(raw)))
    }
}

fn is_home_path(path: &str) -> bool {
    path.len() > HOME_PREFIX.len() && path.starts_with(HOME_PREFIX)
}

/// A regular file whose permissions grant read access to everyone.
#[cfg(unix)]
pub fn file_exists(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o004 != 0,
        Err(_) => false,
    }
}

/// A regular file; permission bits are not available off unix.
#[cfg(not(unix))]
pub fn file_exists(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
