//! In-memory stock cache shared by the sync engine and its consumers.
//!
//! The cache holds at most one record per symbol, enumerates in ascending symbol
//! order, and never evicts. Writes go through [`LocalCache::set`],
//! [`LocalCache::replace_with`] or [`LocalCache::upsert`]; each one publishes a
//! [`CacheEvent`] to subscribers while the write lock is still held, so events
//! arrive in mutation order.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::{StockRecord, Symbol};

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Which fields a partial update is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrigin {
    /// Price only.
    Quote,
    /// Profile fields only; marks the record enriched.
    Profile,
    /// `is_favorite` only.
    Favorite,
}

impl MergeOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Profile => "profile",
            Self::Favorite => "favorite",
        }
    }
}

/// Change notification published after every cache write.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheEvent {
    /// The whole cache was replaced by `records`.
    Replaced { records: Vec<StockRecord> },
    /// `records` were merged in, limited to the fields of `origin`.
    Merged {
        origin: MergeOrigin,
        records: Vec<StockRecord>,
    },
}

impl CacheEvent {
    pub fn records(&self) -> &[StockRecord] {
        match self {
            Self::Replaced { records } | Self::Merged { records, .. } => records,
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    records: BTreeMap<Symbol, StockRecord>,
}

impl CacheInner {
    fn set(&mut self, records: Vec<StockRecord>) {
        self.records = records
            .into_iter()
            .map(|record| (record.symbol.clone(), record))
            .collect();
    }

    fn upsert(
        &mut self,
        records: Vec<StockRecord>,
        origin: MergeOrigin,
        insert_absent: bool,
    ) -> Vec<StockRecord> {
        let mut merged = Vec::with_capacity(records.len());
        for update in records {
            match self.records.get_mut(&update.symbol) {
                Some(existing) => {
                    merge_into(existing, update, origin);
                    merged.push(existing.clone());
                }
                None if insert_absent => {
                    self.records.insert(update.symbol.clone(), update.clone());
                    merged.push(update);
                }
                None => {}
            }
        }
        merged
    }

    fn all(&self) -> Vec<StockRecord> {
        self.records.values().cloned().collect()
    }
}

fn merge_into(existing: &mut StockRecord, update: StockRecord, origin: MergeOrigin) {
    match origin {
        MergeOrigin::Quote => existing.price = update.price,
        MergeOrigin::Profile => existing.apply_profile(update.profile()),
        MergeOrigin::Favorite => existing.is_favorite = update.is_favorite,
    }
}

/// Thread-safe stock cache.
#[derive(Debug, Clone)]
pub struct LocalCache {
    inner: Arc<RwLock<CacheInner>>,
    events: broadcast::Sender<CacheEvent>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Cache whose event channel buffers `capacity` events per lagging subscriber.
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(RwLock::new(CacheInner::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Replace the contents with `records`, returning them sorted by symbol.
    pub async fn set(&self, records: Vec<StockRecord>) -> Vec<StockRecord> {
        self.replace_with(|_| records).await
    }

    /// Replace the contents with whatever `build` derives from the current
    /// records. `build` runs under the write lock, so no merge can slip in
    /// between reading the old state and installing the new one.
    pub async fn replace_with<F>(&self, build: F) -> Vec<StockRecord>
    where
        F: FnOnce(&BTreeMap<Symbol, StockRecord>) -> Vec<StockRecord>,
    {
        let mut store = self.inner.write().await;
        let records = build(&store.records);
        store.set(records);
        let snapshot = store.all();
        let _ = self.events.send(CacheEvent::Replaced {
            records: snapshot.clone(),
        });
        snapshot
    }

    /// Merge `records` by symbol, copying only the fields `origin` owns into
    /// existing entries. Symbols not yet cached are inserted as given.
    pub async fn upsert(&self, records: Vec<StockRecord>, origin: MergeOrigin) -> Vec<StockRecord> {
        self.merge(records, origin, true).await
    }

    /// Like [`upsert`](Self::upsert), but updates for symbols not in the cache
    /// are dropped. Returns only the records that changed.
    pub async fn upsert_existing(
        &self,
        records: Vec<StockRecord>,
        origin: MergeOrigin,
    ) -> Vec<StockRecord> {
        self.merge(records, origin, false).await
    }

    async fn merge(
        &self,
        records: Vec<StockRecord>,
        origin: MergeOrigin,
        insert_absent: bool,
    ) -> Vec<StockRecord> {
        if records.is_empty() {
            return Vec::new();
        }

        let mut store = self.inner.write().await;
        let merged = store.upsert(records, origin, insert_absent);
        if !merged.is_empty() {
            let _ = self.events.send(CacheEvent::Merged {
                origin,
                records: merged.clone(),
            });
        }
        merged
    }

    pub async fn all(&self) -> Vec<StockRecord> {
        let store = self.inner.read().await;
        store.all()
    }

    pub async fn favorites(&self) -> Vec<StockRecord> {
        let store = self.inner.read().await;
        store
            .records
            .values()
            .filter(|record| record.is_favorite)
            .cloned()
            .collect()
    }

    pub async fn get(&self, symbol: &Symbol) -> Option<StockRecord> {
        let store = self.inner.read().await;
        store.records.get(symbol).cloned()
    }

    /// Cached records for `symbols`, in the order requested; unknown symbols are skipped.
    pub async fn get_many(&self, symbols: &[Symbol]) -> Vec<StockRecord> {
        let store = self.inner.read().await;
        symbols
            .iter()
            .filter_map(|symbol| store.records.get(symbol).cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new()
    }
}
