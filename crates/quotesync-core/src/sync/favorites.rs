use super::SyncEngine;
use crate::cache::MergeOrigin;
use crate::store::WriteOrigin;
use crate::{StockRecord, SyncError, Symbol};

impl SyncEngine {
    /// Mark or unmark `symbol` as a favorite. Local only; no remote call.
    pub async fn set_favorite(
        &self,
        symbol: &Symbol,
        is_favorite: bool,
    ) -> Result<StockRecord, SyncError> {
        let current = self
            .cache()
            .get(symbol)
            .await
            .ok_or_else(|| SyncError::UnknownSymbol(symbol.clone()))?;

        let updated = self
            .cache()
            .upsert_existing(vec![current.favorite(is_favorite)], MergeOrigin::Favorite)
            .await
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::UnknownSymbol(symbol.clone()))?;

        self.persist(WriteOrigin::Favorite, vec![updated.clone()]);
        tracing::debug!(%symbol, is_favorite, "favorite updated");
        Ok(updated)
    }
}
