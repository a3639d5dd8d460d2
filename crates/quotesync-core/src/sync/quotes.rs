use super::SyncEngine;
use crate::cache::MergeOrigin;
use crate::store::WriteOrigin;
use crate::{StockRecord, SyncError, Symbol};

impl SyncEngine {
    /// Refresh prices for `symbols` with a single request.
    ///
    /// Returns the cached records whose price was updated. Quotes for symbols
    /// that are not cached are ignored. On a remote failure the cache is left
    /// alone and [`SyncError::StaleFallback`] carries the cached records for
    /// `symbols`.
    pub async fn refresh_quotes(&self, symbols: &[Symbol]) -> Result<Vec<StockRecord>, SyncError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        match self.retry().run(|| self.remote().quotes(symbols)).await {
            Ok(quotes) => {
                let updates: Vec<StockRecord> = quotes
                    .into_iter()
                    .map(|quote| StockRecord::new(quote.symbol, String::new(), quote.price))
                    .collect();
                let updated = self
                    .cache()
                    .upsert_existing(updates, MergeOrigin::Quote)
                    .await;
                self.persist(WriteOrigin::Quote, updated.clone());
                tracing::debug!(
                    requested = symbols.len(),
                    updated = updated.len(),
                    "quotes refreshed"
                );
                Ok(updated)
            }
            Err(cause) => {
                let cached = self.cache().get_many(symbols).await;
                tracing::warn!(
                    symbols = %Symbol::join(symbols),
                    code = cause.code(),
                    error = %cause,
                    "quote refresh failed; serving cached prices"
                );
                Err(SyncError::StaleFallback { cached, cause })
            }
        }
    }

    /// Refresh prices for every cached favorite.
    pub async fn refresh_favorites(&self) -> Result<Vec<StockRecord>, SyncError> {
        let symbols = self.favorite_symbols().await;
        self.refresh_quotes(&symbols).await
    }
}
