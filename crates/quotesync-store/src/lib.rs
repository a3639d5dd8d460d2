//! # quotesync store
//!
//! DuckDB-backed persistence for stock records.
//!
//! The store is a keyed table: one row per symbol, updated in place on every
//! write. Each write also appends one `sync_log` row per symbol so the origin of
//! a change can be traced after the fact.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `stocks` | Latest record per symbol |
//! | `sync_log` | Append-only write audit |
//! | `schema_migrations` | Applied migration versions |
//!
//! ```rust,no_run
//! use quotesync_store::{StockRow, Store};
//!
//! let store = Store::open_default()?;
//! store.upsert_stocks("req-1", "roster", &[StockRow::new("AAPL", "Apple", "150")])?;
//! for row in store.scan_stocks()? {
//!     println!("{} {}", row.symbol, row.price);
//! }
//! # Ok::<(), quotesync_store::StoreDbError>(())
//! ```

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, ToSql};
use serde::Serialize;
use thiserror::Error;

pub use duckdb::ConnectionPool;

/// Errors raised by store operations.
#[derive(Debug, Error)]
pub enum StoreDbError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("row rejected: {0}")]
    Rejected(String),
}

/// Where the store keeps its files.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for quotesync data.
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl StoreConfig {
    /// Layout rooted at `home`: `<home>/store/stocks.duckdb`.
    pub fn in_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let db_path = home.join("store").join("stocks.duckdb");
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_home(resolve_quotesync_home())
    }
}

/// Flat row shape of a persisted stock record.
///
/// Decimal values travel as text so they round-trip without loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockRow {
    pub symbol: String,
    pub name: String,
    pub price: String,
    pub company_logo_url: Option<String>,
    pub percentage_change: Option<String>,
    pub absolute_change: Option<String>,
    pub last_dividend: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub is_favorite: bool,
    pub has_profile_data: bool,
}

impl StockRow {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price: price.into(),
            company_logo_url: None,
            percentage_change: None,
            absolute_change: None,
            last_dividend: None,
            sector: None,
            industry: None,
            is_favorite: false,
            has_profile_data: false,
        }
    }
}

/// One audit entry written alongside a stock upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncLogEntry {
    pub request_id: String,
    pub symbol: String,
    pub origin: String,
}

/// Durable stock store.
#[derive(Clone)]
pub struct Store {
    config: StoreConfig,
    pool: ConnectionPool,
}

impl Store {
    pub fn open_default() -> Result<Self, StoreDbError> {
        Self::open(StoreConfig::default())
    }

    pub fn open(config: StoreConfig) -> Result<Self, StoreDbError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::open(config.db_path.clone(), config.max_pool_size)?;
        let store = Self { config, pool };
        store.initialize()?;
        Ok(store)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), StoreDbError> {
        let applied = self
            .pool
            .with_connection(|connection| migrations::apply_migrations(connection))?;
        if applied > 0 {
            tracing::info!(applied, path = %self.db_path().display(), "store schema migrated");
        }
        Ok(())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    /// Insert or replace `rows` by symbol inside one transaction.
    ///
    /// Every row also lands in `sync_log` under `request_id` and `origin`. Either
    /// all rows are written or none are.
    pub fn upsert_stocks(
        &self,
        request_id: &str,
        origin: &str,
        rows: &[StockRow],
    ) -> Result<usize, StoreDbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if let Some(row) = rows.iter().find(|row| row.symbol.trim().is_empty()) {
            return Err(StoreDbError::Rejected(format!(
                "stock row '{}' has an empty symbol",
                row.name
            )));
        }

        self.pool.with_connection(|connection| {
            connection.execute_batch("BEGIN TRANSACTION")?;
            let result = (|| -> Result<usize, StoreDbError> {
                for row in rows {
                    let params: [&dyn ToSql; 11] = [
                        &row.symbol,
                        &row.name,
                        &row.price,
                        &row.company_logo_url,
                        &row.percentage_change,
                        &row.absolute_change,
                        &row.last_dividend,
                        &row.sector,
                        &row.industry,
                        &row.is_favorite,
                        &row.has_profile_data,
                    ];
                    connection.execute(
                        "INSERT OR REPLACE INTO stocks \
                         (symbol, name, price, company_logo_url, percentage_change, absolute_change, \
                          last_dividend, sector, industry, is_favorite, has_profile_data, updated_at) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                        params.as_slice(),
                    )?;

                    let params: [&dyn ToSql; 3] = [&request_id, &row.symbol, &origin];
                    connection.execute(
                        "INSERT INTO sync_log (request_id, symbol, origin, timestamp) \
                         VALUES (?, ?, ?, CURRENT_TIMESTAMP)",
                        params.as_slice(),
                    )?;
                }
                Ok(rows.len())
            })();

            finalize_transaction(connection, result)
        })
    }

    /// Every stored row, ascending by symbol.
    pub fn scan_stocks(&self) -> Result<Vec<StockRow>, StoreDbError> {
        self.pool.with_connection(|connection| {
            let mut statement = connection.prepare(
                "SELECT symbol, name, price, company_logo_url, percentage_change, absolute_change, \
                 last_dividend, sector, industry, is_favorite, has_profile_data \
                 FROM stocks ORDER BY symbol",
            )?;
            let rows = statement.query_map([], |row| {
                Ok(StockRow {
                    symbol: row.get(0)?,
                    name: row.get(1)?,
                    price: row.get(2)?,
                    company_logo_url: row.get(3)?,
                    percentage_change: row.get(4)?,
                    absolute_change: row.get(5)?,
                    last_dividend: row.get(6)?,
                    sector: row.get(7)?,
                    industry: row.get(8)?,
                    is_favorite: row.get(9)?,
                    has_profile_data: row.get(10)?,
                })
            })?;

            let mut collected = Vec::new();
            for row in rows {
                collected.push(row?);
            }
            Ok(collected)
        })
    }

    /// Audit entries recorded for `symbol`, oldest first.
    pub fn sync_log(&self, symbol: &str) -> Result<Vec<SyncLogEntry>, StoreDbError> {
        self.pool.with_connection(|connection| {
            let mut statement = connection.prepare(
                "SELECT request_id, symbol, origin FROM sync_log \
                 WHERE symbol = ? ORDER BY timestamp, rowid",
            )?;
            let entries = statement.query_map([symbol], |row| {
                Ok(SyncLogEntry {
                    request_id: row.get(0)?,
                    symbol: row.get(1)?,
                    origin: row.get(2)?,
                })
            })?;

            let mut collected = Vec::new();
            for entry in entries {
                collected.push(entry?);
            }
            Ok(collected)
        })
    }
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, StoreDbError>,
) -> Result<T, StoreDbError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_quotesync_home() -> PathBuf {
    if let Some(path) = env::var_os("QUOTESYNC_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".quotesync");
    }

    PathBuf::from(".quotesync")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_temp(temp: &tempfile::TempDir) -> Store {
        Store::open(StoreConfig::in_home(temp.path().join("home"))).expect("store open")
    }

    #[test]
    fn open_creates_database_under_home() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp(&temp);

        assert!(store.db_path().ends_with("store/stocks.duckdb"));
        assert!(store.db_path().exists());
        assert!(store.scan_stocks().expect("scan").is_empty());
    }

    #[test]
    fn upsert_replaces_rows_by_symbol() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp(&temp);

        store
            .upsert_stocks("req-1", "roster", &[StockRow::new("MSFT", "Microsoft", "410.10")])
            .expect("first write");
        let mut favorite = StockRow::new("MSFT", "Microsoft", "411.00");
        favorite.is_favorite = true;
        store
            .upsert_stocks("req-2", "favorite", &[favorite])
            .expect("second write");

        let rows = store.scan_stocks().expect("scan");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, "411.00");
        assert!(rows[0].is_favorite);
    }

    #[test]
    fn symbols_are_bound_as_parameters() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp(&temp);
        let hostile = r#"AAPL'; DROP TABLE stocks; --"#;

        store
            .upsert_stocks("req-1", "roster", &[StockRow::new(hostile, "Apple", "1")])
            .expect("write");

        let rows = store.scan_stocks().expect("scan");
        assert_eq!(rows[0].symbol, hostile);
    }

    #[test]
    fn empty_symbol_rejects_the_whole_batch() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp(&temp);

        let err = store
            .upsert_stocks(
                "req-1",
                "roster",
                &[StockRow::new("AAPL", "Apple", "1"), StockRow::new(" ", "Blank", "2")],
            )
            .expect_err("must reject");

        assert!(matches!(err, StoreDbError::Rejected(_)));
        assert!(store.scan_stocks().expect("scan").is_empty());
    }

    #[test]
    fn writes_are_audited_per_symbol() {
        let temp = tempdir().expect("tempdir");
        let store = open_temp(&temp);

        store
            .upsert_stocks("req-1", "roster", &[StockRow::new("AAPL", "Apple", "1")])
            .expect("write");
        store
            .upsert_stocks("req-2", "quote", &[StockRow::new("AAPL", "Apple", "2")])
            .expect("write");

        let log = store.sync_log("AAPL").expect("log");
        let origins: Vec<&str> = log.iter().map(|entry| entry.origin.as_str()).collect();
        assert_eq!(origins, vec!["roster", "quote"]);
        assert_eq!(log[1].request_id, "req-2");
    }
}
