//! Core of quotesync.
//!
//! This crate contains:
//! - Stock domain models and validation
//! - HTTP transport and the remote API adapter
//! - The local cache, durable store seam and background store writer
//! - The sync engine (roster, profile and quote sync, favorites, history)
//! - Per-scope pollers

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod poller;
pub mod remote;
pub mod retry;
pub mod store;
pub mod sync;
pub mod throttling;

pub use adapters::{fixture_client, FmpAdapter, FIXTURE_BASE_URL};
pub use cache::{CacheEvent, LocalCache, MergeOrigin};
pub use config::{ApiConfig, SyncConfig, DEFAULT_POLL_INTERVAL, PROFILE_BATCH_LIMIT};
pub use domain::{
    HistoricalMoment, HistoryWindow, PriceHistory, StockProfile, StockRecord, Symbol, TradingDate,
};
pub use error::{SyncError, ValidationError};
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpRequest, HttpResponse, MockHttpClient, MockResponse,
    ReqwestHttpClient,
};
pub use poller::{PollHandle, PollState, ScopedUpdates, UpdateScope};
pub use remote::{
    ApiError, Endpoint, NetworkFailure, ProfileEntry, QuoteEntry, RemoteSource, RosterEntry,
};
pub use retry::{Backoff, RetryConfig};
pub use store::{DurableStore, MemoryStore, StoreError, StoreWriter, WriteOrigin};
pub use sync::{chunk, ProfileStream, SyncEngine};
pub use throttling::RequestThrottle;
