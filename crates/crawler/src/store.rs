//! Record store
//!
//! Resolves paper ids to typed records: disk cache first, the paper
//! source on a miss. Fetched bytes are persisted verbatim before they are
//! decoded, so a record that fails to decode is never fetched twice.

use citegraph_common::metrics;
use citegraph_common::{AppError, DiskCache, PaperId, PaperRecord, PaperSource, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};

/// Lookup counters for one store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Lookups answered from the cache
    pub cache_hits: usize,
    /// Lookups that went to the paper source
    pub fetches: usize,
}

pub struct RecordStore {
    cache: DiskCache,
    source: Arc<dyn PaperSource>,
    // At most one lookup per id is in flight; a second caller waits and
    // then finds the entry cached. Entries live only while a lookup for the
    // id is running or waiting.
    locks: Mutex<HashMap<PaperId, Arc<tokio::sync::Mutex<()>>>>,
    cache_hits: AtomicUsize,
    fetches: AtomicUsize,
}

impl RecordStore {
    pub fn new(cache: DiskCache, source: Arc<dyn PaperSource>) -> Self {
        Self {
            cache,
            source,
            locks: Mutex::new(HashMap::new()),
            cache_hits: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Resolve `id` to its record.
    ///
    /// Returns `PaperNotFound` when the service reported the id as unknown,
    /// `Malformed` when the stored bytes are not a paper, and the source's
    /// error when the fetch itself failed.
    #[instrument(skip(self, id), fields(paper_id = %id))]
    pub async fn get(&self, id: &PaperId) -> Result<PaperRecord> {
        let lock = self.lock_for(id)?;
        let raw = {
            let _guard = lock.lock().await;
            self.load(id).await
        };
        self.release(id, &lock);

        PaperRecord::decode(id, &raw?)
    }

    /// Raw bytes for `id`: the cached entry, or a fresh fetch persisted
    /// before it is returned
    async fn load(&self, id: &PaperId) -> Result<Vec<u8>> {
        let raw = match self.cache.get(id).await? {
            Some(raw) => {
                metrics::record_cache_lookup(true);
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                raw
            }
            None => {
                metrics::record_cache_lookup(false);
                self.fetches.fetch_add(1, Ordering::Relaxed);
                debug!(source = self.source.name(), "Fetching paper");

                let raw = self.source.fetch(id).await?;
                if let Err(e) = self.cache.put(id, &raw).await {
                    warn!(error = %e, "Failed to cache paper, continuing without cache");
                }
                raw
            }
        };
        Ok(raw)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
        }
    }

    fn lock_for(&self, id: &PaperId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| AppError::Cache {
            message: "record store lock table poisoned".to_string(),
        })?;
        Ok(locks.entry(id.clone()).or_default().clone())
    }

    /// Drop the lock entry for `id` once no other caller holds or awaits it
    fn release(&self, id: &PaperId, lock: &Arc<tokio::sync::Mutex<()>>) {
        if let Ok(mut locks) = self.locks.lock() {
            // the table and `lock` are the only references left
            let idle = locks
                .get(id)
                .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(lock) == 2);
            if idle {
                locks.remove(id);
            }
        }
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}
