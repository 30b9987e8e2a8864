// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Where snapshot bytes come from.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CacheError;

/// Raw bytes of one snapshot and its optional layout side-file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotBytes {
    /// HSC bytes, possibly compressed.
    pub snapshot: Vec<u8>,
    /// Class-field layout JSON, when present.
    pub layout: Option<Vec<u8>>,
}

/// Storage port for snapshots keyed by a logical name.
pub trait SnapshotSource: Send + Sync {
    /// Fetches the snapshot stored under `key`.
    fn fetch(&self, key: &str) -> Result<SnapshotBytes, CacheError>;
}

/// Reads snapshots from a directory: `<root>/<key>` plus an optional
/// `<root>/<key>.layout.json`.
#[derive(Clone, Debug)]
pub struct FsSnapshotSource {
    root: PathBuf,
}

/// Suffix appended to a snapshot path to find its layout side-file.
pub const LAYOUT_SUFFIX: &str = ".layout.json";

impl FsSnapshotSource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot stored under `key`.
    pub fn snapshot_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Path of the layout side-file for `key`.
    pub fn layout_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}{LAYOUT_SUFFIX}"))
    }
}

impl SnapshotSource for FsSnapshotSource {
    fn fetch(&self, key: &str) -> Result<SnapshotBytes, CacheError> {
        if key.is_empty() || Path::new(key).components().count() != 1 || key.contains("..") {
            return Err(CacheError::NotFound(key.to_owned()));
        }
        let snapshot = match fs::read(self.snapshot_path(key)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CacheError::NotFound(key.to_owned()))
            }
            Err(source) => {
                return Err(CacheError::Io {
                    key: key.to_owned(),
                    source,
                })
            }
        };
        let layout = match fs::read(self.layout_path(key)) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    debug!(key, error = %err, "layout side-file unreadable");
                }
                None
            }
        };
        Ok(SnapshotBytes { snapshot, layout })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_snapshot_and_optional_layout() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsSnapshotSource::new(dir.path());
        fs::write(dir.path().join("a.hsc"), b"bytes").unwrap();
        let fetched = source.fetch("a.hsc").unwrap();
        assert_eq!(fetched.snapshot, b"bytes");
        assert_eq!(fetched.layout, None);

        fs::write(source.layout_path("a.hsc"), b"{}").unwrap();
        assert_eq!(source.fetch("a.hsc").unwrap().layout.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn missing_and_escaping_keys_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsSnapshotSource::new(dir.path());
        for key in ["missing", "", "../etc", "a/b"] {
            assert!(matches!(source.fetch(key), Err(CacheError::NotFound(_))), "{key}");
        }
    }
}
