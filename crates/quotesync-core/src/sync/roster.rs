use std::collections::BTreeMap;

use super::SyncEngine;
use crate::remote::RosterEntry;
use crate::store::WriteOrigin;
use crate::{StockRecord, SyncError, Symbol};

impl SyncEngine {
    /// Fetch the full roster and replace the cache with it.
    ///
    /// Favorite flags and profile data already cached for a symbol carry over.
    /// On a remote failure the cache is left alone and the error carries the
    /// cached roster as [`SyncError::StaleFallback`].
    pub async fn refresh_roster(&self) -> Result<Vec<StockRecord>, SyncError> {
        let fetched = self.retry().run(|| self.remote().roster()).await;

        match fetched {
            Ok(entries) => {
                let fetched_count = entries.len();
                let records = self
                    .cache()
                    .replace_with(|current| reconcile_roster(entries, current))
                    .await;
                self.persist(WriteOrigin::Roster, records.clone());
                tracing::info!(fetched = fetched_count, cached = records.len(), "roster refreshed");
                Ok(records)
            }
            Err(cause) => {
                let cached = self.all().await;
                tracing::warn!(
                    code = cause.code(),
                    error = %cause,
                    cached = cached.len(),
                    "roster refresh failed; serving cached roster"
                );
                Err(SyncError::StaleFallback { cached, cause })
            }
        }
    }
}

/// Turn fresh roster entries into cache records, keeping locally owned state
/// from `current`. The result is sorted by symbol with duplicates removed.
pub fn reconcile_roster(
    entries: Vec<RosterEntry>,
    current: &BTreeMap<Symbol, StockRecord>,
) -> Vec<StockRecord> {
    let mut records: Vec<StockRecord> = entries
        .into_iter()
        .map(|entry| {
            let mut record =
                StockRecord::new(entry.symbol, entry.name.unwrap_or_default(), entry.price);
            if let Some(cached) = current.get(&record.symbol) {
                if cached.is_favorite {
                    record.is_favorite = true;
                }
                if cached.has_profile_data {
                    record.apply_profile(cached.profile());
                }
            }
            record
        })
        .collect();

    records.sort_by(|left, right| left.symbol.cmp(&right.symbol));
    records.dedup_by(|later, earlier| later.symbol == earlier.symbol);
    records
}
