//! Periodic quote refresh per consumer scope.
//!
//! [`SyncEngine::start_updates`] returns an owned [`PollHandle`]; dropping the
//! handle or passing it to [`SyncEngine::stop_updates`] cancels future ticks.
//! A refresh already issued by an earlier tick is not cancelled and still
//! merges into the cache when it completes.
//!
//! [`ScopedUpdates`] wraps one handle with the `Idle`/`Polling` lifecycle a
//! view needs: starting twice restarts the interval, stopping while idle only
//! flushes the snapshot.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::store::WriteOrigin;
use crate::sync::SyncEngine;
use crate::{StockRecord, SyncError, Symbol};

/// What a poller refreshes on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateScope {
    /// Prices for every cached record.
    Roster,
    /// Prices for cached favorites.
    Favorites,
    /// Price for a single stock.
    Detail(Symbol),
}

impl Display for UpdateScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Roster => f.write_str("roster"),
            Self::Favorites => f.write_str("favorites"),
            Self::Detail(symbol) => write!(f, "detail:{symbol}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    Idle,
    Polling,
}

/// Owned handle to a running poller. Ticks stop when it is dropped.
#[derive(Debug)]
pub struct PollHandle {
    scope: UpdateScope,
    interval: Duration,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn scope(&self) -> &UpdateScope {
        &self.scope
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl SyncEngine {
    /// Start refreshing `scope` at the configured poll interval.
    pub fn start_updates(&self, scope: UpdateScope) -> PollHandle {
        self.start_updates_every(scope, self.poll_interval())
    }

    /// Start refreshing `scope` every `interval`. The first tick fires one
    /// interval from now.
    pub fn start_updates_every(&self, scope: UpdateScope, interval: Duration) -> PollHandle {
        let interval = interval.max(Duration::from_millis(1));
        let engine = self.clone();
        let tick_scope = scope.clone();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Detached so stopping the poller never cancels a fetch in flight.
                let engine = engine.clone();
                let scope = tick_scope.clone();
                tokio::spawn(async move {
                    if let Err(error) = engine.refresh_scope(&scope).await {
                        tracing::warn!(%scope, code = error.code(), %error, "poll tick failed");
                    }
                });
            }
        });

        tracing::info!(%scope, interval_ms = interval.as_millis() as u64, "polling started");
        PollHandle {
            scope,
            interval,
            task,
        }
    }

    /// Cancel future ticks of `handle`, if any, and persist `snapshot`.
    ///
    /// The snapshot is written even when nothing was polling.
    pub fn stop_updates(&self, handle: Option<PollHandle>, snapshot: Vec<StockRecord>) {
        if let Some(handle) = handle {
            tracing::info!(scope = %handle.scope, "polling stopped");
            drop(handle);
        }
        self.persist(WriteOrigin::Snapshot, snapshot);
    }

    /// Run one refresh for `scope`.
    pub async fn refresh_scope(&self, scope: &UpdateScope) -> Result<Vec<StockRecord>, SyncError> {
        match scope {
            UpdateScope::Roster => {
                let symbols: Vec<Symbol> = self
                    .all()
                    .await
                    .into_iter()
                    .map(|record| record.symbol)
                    .collect();
                self.refresh_quotes(&symbols).await
            }
            UpdateScope::Favorites => self.refresh_favorites().await,
            UpdateScope::Detail(symbol) => self.refresh_quotes(std::slice::from_ref(symbol)).await,
        }
    }
}

/// `Idle`/`Polling` lifecycle for one consumer.
#[derive(Debug)]
pub struct ScopedUpdates {
    engine: SyncEngine,
    scope: UpdateScope,
    interval: Duration,
    handle: Option<PollHandle>,
}

impl ScopedUpdates {
    pub fn new(engine: SyncEngine, scope: UpdateScope) -> Self {
        let interval = engine.poll_interval();
        Self::with_interval(engine, scope, interval)
    }

    pub fn with_interval(engine: SyncEngine, scope: UpdateScope, interval: Duration) -> Self {
        Self {
            engine,
            scope,
            interval,
            handle: None,
        }
    }

    pub fn scope(&self) -> &UpdateScope {
        &self.scope
    }

    pub fn state(&self) -> PollState {
        if self.handle.is_some() {
            PollState::Polling
        } else {
            PollState::Idle
        }
    }

    /// Enter `Polling`. When already polling, the interval restarts from now.
    pub fn start(&mut self) {
        if let Some(previous) = self.handle.take() {
            tracing::debug!(scope = %self.scope, "restarting poll interval");
            drop(previous);
        }
        self.handle = Some(
            self.engine
                .start_updates_every(self.scope.clone(), self.interval),
        );
    }

    /// Enter `Idle` and persist `snapshot`.
    pub fn stop(&mut self, snapshot: Vec<StockRecord>) {
        self.engine.stop_updates(self.handle.take(), snapshot);
    }
}
