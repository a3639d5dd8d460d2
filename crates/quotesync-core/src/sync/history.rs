use super::SyncEngine;
use crate::{HistoryWindow, PriceHistory, SyncError, Symbol, TradingDate};

impl SyncEngine {
    /// Daily history for `symbol`, trimmed to `window`.
    ///
    /// Always requests the widest window ending today so switching windows
    /// is a local slice. Nothing is cached or persisted.
    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        window: HistoryWindow,
    ) -> Result<PriceHistory, SyncError> {
        let today = TradingDate::today();
        self.fetch_history_until(symbol, window, today).await
    }

    pub async fn fetch_history_until(
        &self,
        symbol: &Symbol,
        window: HistoryWindow,
        today: TradingDate,
    ) -> Result<PriceHistory, SyncError> {
        let from = HistoryWindow::ThreeYears.start_date(today);
        let history = self
            .retry()
            .run(|| self.remote().history(symbol, from, today))
            .await?;

        let sliced = history.within(window, today);
        tracing::debug!(
            %symbol,
            window = window.as_str(),
            fetched = history.moments.len(),
            kept = sliced.moments.len(),
            "history fetched"
        );
        Ok(sliced)
    }
}
