//! On-disk record cache
//!
//! Provides:
//! - One file per paper identifier, holding the verbatim upstream response
//! - Raw get/put by identifier
//! - Atomic writes (temp file + rename)

use crate::errors::{AppError, Result};
use crate::models::PaperId;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory-backed key-value store of raw paper responses
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open a cache rooted at `dir`, creating the directory if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Cache {
                message: format!("Failed to create cache dir '{}': {}", dir.display(), e),
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing the entry for `id`
    pub fn path_for(&self, id: &PaperId) -> PathBuf {
        self.dir.join(keys::file_name(id))
    }

    /// Read the raw bytes cached for `id`
    pub async fn get(&self, id: &PaperId) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(paper_id = %id, "Cache hit");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(paper_id = %id, "Cache miss");
                Ok(None)
            }
            Err(e) => Err(AppError::Cache {
                message: format!("Failed to read '{}': {}", path.display(), e),
            }),
        }
    }

    /// Persist raw bytes for `id`, replacing any previous entry
    pub async fn put(&self, id: &PaperId, raw: &[u8]) -> Result<()> {
        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| AppError::Cache {
                message: format!("Failed to write '{}': {}", tmp.display(), e),
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::Cache {
                message: format!("Failed to commit '{}': {}", path.display(), e),
            })?;

        debug!(paper_id = %id, bytes = raw.len(), "Cache set");
        Ok(())
    }

    /// Check if an entry exists for `id`
    pub async fn exists(&self, id: &PaperId) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(id)).await?)
    }
}

/// Cache file naming
pub mod keys {
    use crate::models::PaperId;
    use std::fmt::Write;

    /// Flat file name for an identifier. Bytes outside `[A-Za-z0-9._-]` are
    /// percent-escaped so ids like `arXiv:1705.10311` or DOIs containing `/`
    /// stay inside the cache directory.
    pub fn file_name(id: &PaperId) -> String {
        let mut name = String::with_capacity(id.as_str().len() + 5);
        for byte in id.as_str().bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => name.push(byte as char),
                // a leading dot would hide the file or escape via ".."
                b'.' if !name.is_empty() => name.push('.'),
                _ => {
                    let _ = write!(name, "%{:02X}", byte);
                }
            }
        }
        name.push_str(".json");
        name
    }
}
