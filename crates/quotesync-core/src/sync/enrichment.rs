use rust_decimal::Decimal;
use tokio::sync::mpsc;

use super::{chunk, SyncEngine};
use crate::cache::MergeOrigin;
use crate::store::WriteOrigin;
use crate::{StockRecord, Symbol};

/// Profile results delivered chunk by chunk, in arrival order.
///
/// Each chunk is merged into the cache as soon as it arrives, whether or not
/// the stream is being read. Dropping the stream does not cancel the fetches.
#[derive(Debug)]
pub struct ProfileStream {
    rx: mpsc::UnboundedReceiver<Vec<StockRecord>>,
}

impl ProfileStream {
    /// The next enriched subset, or `None` once every chunk has finished.
    pub async fn next(&mut self) -> Option<Vec<StockRecord>> {
        self.rx.recv().await
    }

    /// Drain the stream, returning every enriched record.
    pub async fn collect(mut self) -> Vec<StockRecord> {
        let mut enriched = Vec::new();
        while let Some(batch) = self.next().await {
            enriched.extend(batch);
        }
        enriched
    }
}

impl SyncEngine {
    /// Fetch profiles for `symbols` in provider-sized chunks.
    ///
    /// Chunks run concurrently. A failed chunk is logged and dropped without
    /// affecting the others; symbols missing from a response or from the cache
    /// are left untouched.
    pub fn refresh_profiles(&self, symbols: &[Symbol]) -> ProfileStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let chunks = chunk(symbols, self.inner.profile_batch_limit);
        tracing::debug!(symbols = symbols.len(), chunks = chunks.len(), "refreshing profiles");

        for batch in chunks {
            let engine = self.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(enriched) = engine.enrich_chunk(batch).await {
                    let _ = tx.send(enriched);
                }
            });
        }

        ProfileStream { rx }
    }

    async fn enrich_chunk(&self, batch: Vec<Symbol>) -> Option<Vec<StockRecord>> {
        let fetched = self.retry().run(|| self.remote().profiles(&batch)).await;
        let entries = match fetched {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(
                    symbols = %Symbol::join(&batch),
                    code = error.code(),
                    %error,
                    "dropping failed profile chunk"
                );
                return None;
            }
        };

        // Only the profile fields of these placeholders are read by the merge.
        let updates: Vec<StockRecord> = entries
            .into_iter()
            .map(|entry| {
                StockRecord::new(entry.symbol, String::new(), Decimal::ZERO)
                    .with_profile(entry.profile)
            })
            .collect();

        let enriched = self
            .cache()
            .upsert_existing(updates, MergeOrigin::Profile)
            .await;
        if enriched.is_empty() {
            return None;
        }

        self.persist(WriteOrigin::Profile, enriched.clone());
        tracing::debug!(
            requested = batch.len(),
            enriched = enriched.len(),
            "profile chunk merged"
        );
        Some(enriched)
    }
}
