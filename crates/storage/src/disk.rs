//! Filesystem-backed store shared by workers on one host or a network mount.
//!
//! Layout: `{root}/{namespace}/{digest[0..2]}/{digest}.bin`, where `digest` is
//! the SHA-256 of the rendered key. Namespace separators become directory
//! levels so each statistic's entries stay together.
//!
//! Each value is written to a temp file in its final directory and then
//! linked into place without replacing an existing file. Readers therefore
//! see either nothing or a complete value, and concurrent writers of the same
//! key resolve to whichever finished first.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use climate_common::{ClimateError, ClimateResult};

use crate::key::CacheKey;
use crate::store::CacheStore;

/// [`CacheStore`] on the local filesystem.
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> ClimateResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            ClimateError::Cache(format!("failed to create cache dir {}: {}", root.display(), e))
        })?;
        info!(root = %root.display(), "Opened disk cache store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path of `key`'s entry.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let digest = key.digest();
        let mut path = self.root.clone();
        for part in key.namespace.split('/').filter(|p| !p.is_empty()) {
            path.push(sanitize(part));
        }
        path.push(&digest[..2]);
        path.push(format!("{}.bin", digest));
        path
    }
}

fn sanitize(part: &str) -> String {
    if part.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

/// Write `value` next to `path` and link it in unless `path` exists.
fn write_no_clobber(path: &Path, value: &[u8]) -> std::io::Result<bool> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "entry path has no parent"))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new().prefix(".tmp-").tempfile_in(dir)?;
    tmp.write_all(value)?;
    tmp.as_file().sync_all()?;

    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn get(&self, key: &CacheKey) -> ClimateResult<Option<Bytes>> {
        let path = self.entry_path(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ClimateError::Cache(format!("failed to read {}: {}", path.display(), e))),
        }
    }

    async fn put(&self, key: &CacheKey, value: Bytes) -> ClimateResult<bool> {
        let path = self.entry_path(key);
        let target = path.clone();

        let created = tokio::task::spawn_blocking(move || write_no_clobber(&target, &value))
            .await
            .map_err(|e| ClimateError::Cache(format!("cache write task failed: {}", e)))?
            .map_err(|e| ClimateError::Cache(format!("failed to write {}: {}", path.display(), e)))?;

        if !created {
            debug!(key = %key, "Entry already written by another worker");
        }
        Ok(created)
    }

    async fn contains(&self, key: &CacheKey) -> ClimateResult<bool> {
        let path = self.entry_path(key);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| ClimateError::Cache(format!("failed to check {}: {}", path.display(), e)))
    }
}
