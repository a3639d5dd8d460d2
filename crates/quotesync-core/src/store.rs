//! Durable persistence seam for stock records.
//!
//! [`DurableStore`] is the blocking storage contract; it is implemented for the
//! DuckDB-backed [`quotesync_store::Store`] and for the in-memory [`MemoryStore`].
//! The sync engine never calls a store directly on its hot path: it hands
//! batches to a [`StoreWriter`], whose background task applies them in
//! submission order and logs failures.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quotesync_store::{Store, StockRow};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::{StockRecord, Symbol};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store read failed: {0}")]
    Read(String),
    #[error("store write failed: {0}")]
    Write(String),
}

impl StoreError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Read(_) => "store.read",
            Self::Write(_) => "store.write",
        }
    }
}

/// Which sync path produced a write; recorded alongside every stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOrigin {
    Roster,
    Quote,
    Profile,
    Favorite,
    /// Full cache snapshot taken when a view stops polling.
    Snapshot,
}

impl WriteOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::Quote => "quote",
            Self::Profile => "profile",
            Self::Favorite => "favorite",
            Self::Snapshot => "snapshot",
        }
    }
}

impl Display for WriteOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blocking persistent storage for stock records, keyed by symbol.
pub trait DurableStore: Send + Sync {
    /// Insert or replace `records`, all or nothing.
    fn upsert(&self, origin: WriteOrigin, records: &[StockRecord]) -> Result<usize, StoreError>;

    /// Every stored record, ascending by symbol.
    fn scan_all(&self) -> Result<Vec<StockRecord>, StoreError>;
}

impl DurableStore for Store {
    fn upsert(&self, origin: WriteOrigin, records: &[StockRecord]) -> Result<usize, StoreError> {
        let request_id = Uuid::new_v4().to_string();
        let rows: Vec<StockRow> = records.iter().map(to_row).collect();
        self.upsert_stocks(&request_id, origin.as_str(), &rows)
            .map_err(|error| StoreError::Write(error.to_string()))
    }

    fn scan_all(&self) -> Result<Vec<StockRecord>, StoreError> {
        self.scan_stocks()
            .map_err(|error| StoreError::Read(error.to_string()))?
            .into_iter()
            .map(from_row)
            .collect()
    }
}

fn to_row(record: &StockRecord) -> StockRow {
    StockRow {
        symbol: record.symbol.as_str().to_owned(),
        name: record.name.clone(),
        price: record.price.to_string(),
        company_logo_url: record.company_logo_url.clone(),
        percentage_change: record.percentage_change.clone(),
        absolute_change: record.absolute_change.map(|value| value.to_string()),
        last_dividend: record.last_dividend.clone(),
        sector: record.sector.clone(),
        industry: record.industry.clone(),
        is_favorite: record.is_favorite,
        has_profile_data: record.has_profile_data,
    }
}

fn from_row(row: StockRow) -> Result<StockRecord, StoreError> {
    let symbol = Symbol::parse(&row.symbol)
        .map_err(|error| StoreError::Read(format!("stored symbol '{}': {error}", row.symbol)))?;
    let price = parse_decimal(&row.symbol, "price", &row.price)?;
    let absolute_change = row
        .absolute_change
        .as_deref()
        .map(|value| parse_decimal(&row.symbol, "absolute_change", value))
        .transpose()?;

    Ok(StockRecord {
        symbol,
        name: row.name,
        price,
        company_logo_url: row.company_logo_url,
        percentage_change: row.percentage_change,
        absolute_change,
        last_dividend: row.last_dividend,
        sector: row.sector,
        industry: row.industry,
        is_favorite: row.is_favorite,
        has_profile_data: row.has_profile_data,
    })
}

fn parse_decimal(symbol: &str, column: &str, value: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(value)
        .map_err(|error| StoreError::Read(format!("{symbol}.{column} = '{value}': {error}")))
}

/// In-memory [`DurableStore`] with switchable failures, for tests and `--mock` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<Symbol, StockRecord>>,
    writes: Mutex<Vec<(WriteOrigin, Vec<Symbol>)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_count: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(records: Vec<StockRecord>) -> Self {
        let store = Self::default();
        {
            let mut stored = relock(&store.records);
            for record in records {
                stored.insert(record.symbol.clone(), record);
            }
        }
        store
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful upsert calls so far.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Origin and symbols of every successful upsert, oldest first.
    pub fn writes(&self) -> Vec<(WriteOrigin, Vec<Symbol>)> {
        relock(&self.writes).clone()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<StockRecord> {
        relock(&self.records).get(symbol).cloned()
    }
}

impl DurableStore for MemoryStore {
    fn upsert(&self, origin: WriteOrigin, records: &[StockRecord]) -> Result<usize, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write(String::from("memory store rejects writes")));
        }

        let mut stored = relock(&self.records);
        for record in records {
            stored.insert(record.symbol.clone(), record.clone());
        }
        drop(stored);

        relock(&self.writes).push((
            origin,
            records.iter().map(|record| record.symbol.clone()).collect(),
        ));
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(records.len())
    }

    fn scan_all(&self) -> Result<Vec<StockRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read(String::from("memory store rejects reads")));
        }
        Ok(relock(&self.records).values().cloned().collect())
    }
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum WriteCommand {
    Upsert {
        origin: WriteOrigin,
        records: Vec<StockRecord>,
    },
    Flush(oneshot::Sender<()>),
}

/// Background writer that applies store batches in submission order.
///
/// [`enqueue`](Self::enqueue) never blocks and never fails; a rejected batch is
/// logged and dropped. The task exits once every writer handle is dropped.
#[derive(Debug, Clone)]
pub struct StoreWriter {
    tx: mpsc::UnboundedSender<WriteCommand>,
}

impl StoreWriter {
    /// Start the writer task on the current tokio runtime.
    pub fn spawn(store: Arc<dyn DurableStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(store, rx));
        Self { tx }
    }

    pub fn enqueue(&self, origin: WriteOrigin, records: Vec<StockRecord>) {
        if records.is_empty() {
            return;
        }
        if self.tx.send(WriteCommand::Upsert { origin, records }).is_err() {
            tracing::warn!(%origin, "store writer stopped; dropping batch");
        }
    }

    /// Wait until every batch enqueued before this call has been applied or dropped.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(WriteCommand::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

async fn run_writer(store: Arc<dyn DurableStore>, mut rx: mpsc::UnboundedReceiver<WriteCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Upsert { origin, records } => {
                let count = records.len();
                let target = Arc::clone(&store);
                let outcome =
                    tokio::task::spawn_blocking(move || target.upsert(origin, &records)).await;
                match outcome {
                    Ok(Ok(written)) => tracing::debug!(%origin, written, "store batch written"),
                    Ok(Err(error)) => {
                        tracing::warn!(%origin, count, code = error.code(), %error, "store write failed")
                    }
                    Err(error) => tracing::warn!(%origin, count, %error, "store write task aborted"),
                }
            }
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("store writer stopped");
}
