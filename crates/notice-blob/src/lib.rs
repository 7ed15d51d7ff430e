//! Content-addressed blob storage for `StateSnapshot`/`Diff` blobs.
//! The storage path is a function of the bytes' content, so
//! identical inputs always produce identical paths — no locking is
//! needed and two runs with the same result share a blob.
//!
//! Grounded on this workspace's `StorageBackend` trait (same
//! read/write/exists shape as the cloud-storage abstraction) and its
//! `sha2`-based content hashing used for plan ids and webhook
//! signatures.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// A content-addressed blob path: `sha256(bytes)` hex-encoded, with no
/// implied storage backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobPath(String);

impl BlobPath {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal content-addressed blob store.
pub trait BlobStore: Send + Sync {
    /// Write `bytes`, returning its content-addressed path. Writing the
    /// same bytes twice is a no-op the second time.
    fn put(&self, bytes: &[u8]) -> Result<BlobPath>;

    fn get(&self, path: &BlobPath) -> Result<Vec<u8>>;

    fn exists(&self, path: &BlobPath) -> Result<bool>;

    /// The absolute location a `NotificationEvent`'s `state_blob_path`/
    /// `diff_blob_path` should record for this blob, resolved to a
    /// readable path at write time.
    fn resolve(&self, path: &BlobPath) -> String;

    /// Read back the bytes behind a previously `resolve`d location.
    /// Round-trips `resolve` for callers (the producer re-reading a
    /// prior run's state blob) that only have the resolved string, not
    /// the original `BlobPath`.
    fn get_by_resolved(&self, resolved: &str) -> Result<Vec<u8>>;
}

/// Filesystem reference implementation: blobs live under
/// `<root>/<first 2 hex chars>/<rest>`, the same fan-out-by-prefix
/// layout git and cargo registries use to avoid a single directory with
/// millions of entries.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, path: &BlobPath) -> PathBuf {
        let (prefix, rest) = path.0.split_at(2);
        self.root.join(prefix).join(rest)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<BlobPath> {
        let path = BlobPath::of(bytes);
        let file_path = self.file_path(&path);
        if file_path.exists() {
            return Ok(path);
        }

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create blob dir {}", parent.display()))?;
        }

        let tmp = file_path.with_extension("tmp");
        fs::write(&tmp, bytes)
            .with_context(|| format!("failed to write blob tmp file {}", tmp.display()))?;
        fs::rename(&tmp, &file_path)
            .with_context(|| format!("failed to rename blob into {}", file_path.display()))?;
        Ok(path)
    }

    fn get(&self, path: &BlobPath) -> Result<Vec<u8>> {
        let file_path = self.file_path(path);
        fs::read(&file_path)
            .with_context(|| format!("failed to read blob {}", file_path.display()))
    }

    fn exists(&self, path: &BlobPath) -> Result<bool> {
        Ok(self.file_path(path).exists())
    }

    fn resolve(&self, path: &BlobPath) -> String {
        self.file_path(path).display().to_string()
    }

    fn get_by_resolved(&self, resolved: &str) -> Result<Vec<u8>> {
        fs::read(resolved).with_context(|| format!("failed to read blob at {resolved}"))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn identical_bytes_produce_identical_paths() {
        let a = BlobPath::of(b"hello");
        let b = BlobPath::of(b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn different_bytes_produce_different_paths() {
        assert_ne!(BlobPath::of(b"a"), BlobPath::of(b"b"));
    }

    #[test]
    fn put_then_get_roundtrips() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let path = store.put(b"snapshot bytes").unwrap();
        assert!(store.exists(&path).unwrap());
        assert_eq!(store.get(&path).unwrap(), b"snapshot bytes");
    }

    #[test]
    fn writing_same_bytes_twice_is_a_noop() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let first = store.put(b"same").unwrap();
        let second = store.put(b"same").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn resolved_path_is_readable() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let path = store.put(b"content").unwrap();
        let resolved = store.resolve(&path);
        assert_eq!(fs::read(resolved).unwrap(), b"content");
    }

    #[test]
    fn get_by_resolved_round_trips_resolve() {
        let dir = tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        let path = store.put(b"roundtrip").unwrap();
        let resolved = store.resolve(&path);
        assert_eq!(store.get_by_resolved(&resolved).unwrap(), b"roundtrip");
    }
}
