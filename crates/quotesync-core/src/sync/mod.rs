//! Sync engine: keeps the local cache and the durable store in step with the
//! remote API.
//!
//! Every remote result enters the cache through a [`MergeOrigin`]-tagged merge,
//! so locally owned fields (favorite flag, profile data) survive partial
//! updates. Durable writes are handed to the [`StoreWriter`] and never awaited
//! by a sync step.

mod chunking;
mod enrichment;
mod favorites;
mod history;
mod quotes;
mod roster;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::cache::{CacheEvent, LocalCache};
use crate::config::SyncConfig;
use crate::remote::RemoteSource;
use crate::retry::RetryConfig;
use crate::store::{DurableStore, StoreError, StoreWriter, WriteOrigin};
use crate::{StockRecord, SyncError, Symbol};

pub use chunking::chunk;
pub use enrichment::ProfileStream;
pub use roster::reconcile_roster;

/// Orchestrates roster, profile and quote syncs over one shared cache.
///
/// Cloning is cheap; clones share the cache, remote and store writer.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn DurableStore>,
    cache: LocalCache,
    writer: StoreWriter,
    retry: RetryConfig,
    profile_batch_limit: usize,
    poll_interval: Duration,
}

impl SyncEngine {
    /// Build an engine and start its store writer on the current tokio runtime.
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        store: Arc<dyn DurableStore>,
        config: &SyncConfig,
    ) -> Self {
        let writer = StoreWriter::spawn(Arc::clone(&store));
        Self {
            inner: Arc::new(EngineInner {
                remote,
                store,
                cache: LocalCache::new(),
                writer,
                retry: config.retry.clone(),
                profile_batch_limit: config.profile_batch_limit.max(1),
                poll_interval: config.poll_interval,
            }),
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.inner.cache
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.cache.subscribe()
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    pub async fn all(&self) -> Vec<StockRecord> {
        self.inner.cache.all().await
    }

    pub async fn favorites(&self) -> Vec<StockRecord> {
        self.inner.cache.favorites().await
    }

    /// Symbols of every cached favorite, ascending.
    pub async fn favorite_symbols(&self) -> Vec<Symbol> {
        self.favorites()
            .await
            .into_iter()
            .map(|record| record.symbol)
            .collect()
    }

    /// Load the durable store into the cache, replacing whatever it held.
    pub async fn restore(&self) -> Result<Vec<StockRecord>, SyncError> {
        let store = Arc::clone(&self.inner.store);
        let scanned = tokio::task::spawn_blocking(move || store.scan_all())
            .await
            .map_err(|error| StoreError::Read(error.to_string()))??;

        let restored = self.inner.cache.set(scanned).await;
        tracing::info!(count = restored.len(), "restored cache from store");
        Ok(restored)
    }

    /// Persist `records` in the background, e.g. a view's on-exit snapshot.
    pub fn persist(&self, origin: WriteOrigin, records: Vec<StockRecord>) {
        self.inner.writer.enqueue(origin, records);
    }

    /// Wait for every store write queued so far.
    pub async fn flush_store(&self) {
        self.inner.writer.flush().await;
    }

    fn remote(&self) -> &dyn RemoteSource {
        self.inner.remote.as_ref()
    }

    fn retry(&self) -> &RetryConfig {
        &self.inner.retry
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("profile_batch_limit", &self.inner.profile_batch_limit)
            .field("poll_interval", &self.inner.poll_interval)
            .finish_non_exhaustive()
    }
}
