//! CLI argument definitions.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `roster` | Refresh the full stock list |
//! | `quotes` | Refresh prices for symbols |
//! | `profiles` | Fetch company profiles in provider-sized batches |
//! | `favorite` | Mark or unmark a favorite |
//! | `favorites` | List cached favorites |
//! | `history` | Daily price history for one symbol |
//! | `watch` | Poll prices for a view and print each update |
//!
//! Flags override the `QUOTESYNC_*` environment variables.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Keep a local stock list in sync with a quote API.
#[derive(Debug, Parser)]
#[command(name = "quotesync", author, version, about)]
pub struct Cli {
    /// Serve a built-in offline fixture instead of calling the API.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// API root, e.g. `https://api.example.com/v3`.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Appended to every request as the `apikey` query parameter.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// DuckDB file to use instead of `$QUOTESYNC_HOME/store/stocks.duckdb`.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log at debug level to stderr (`RUST_LOG` still wins when set).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh the full stock list, keeping favorites and profiles.
    ///
    ///   quotesync roster --pretty
    Roster,

    /// Refresh prices for one or more cached symbols.
    ///
    ///   quotesync quotes AAPL MSFT
    Quotes(SymbolsArgs),

    /// Fetch company profiles, three symbols per request.
    ///
    ///   quotesync profiles AAPL MSFT GOOG AMZN
    Profiles(SymbolsArgs),

    /// Mark a stock as favorite, or clear the mark with `--off`.
    ///
    ///   quotesync favorite AAPL
    ///   quotesync favorite AAPL --off
    Favorite(FavoriteArgs),

    /// List cached favorites.
    Favorites,

    /// Daily price history for a symbol.
    ///
    ///   quotesync history AAPL --window 6m
    History(HistoryArgs),

    /// Poll prices for a view and print every update.
    ///
    ///   quotesync watch favorites --ticks 3
    ///   quotesync watch TSLA --interval-secs 5
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct SymbolsArgs {
    #[arg(required = true)]
    pub symbols: Vec<String>,
}

#[derive(Debug, Args)]
pub struct FavoriteArgs {
    pub symbol: String,

    /// Clear the favorite mark instead of setting it.
    #[arg(long, default_value_t = false)]
    pub off: bool,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    pub symbol: String,

    /// Trailing range: 3m, 6m, 1y or 3y.
    #[arg(long, default_value = "3y")]
    pub window: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// `roster`, `favorites`, or a symbol for a single-stock view.
    pub target: String,

    /// Stop after this many price updates.
    #[arg(long, default_value_t = 3)]
    pub ticks: usize,

    /// Poll period; defaults to `QUOTESYNC_POLL_INTERVAL_SECS` or 15.
    #[arg(long)]
    pub interval_secs: Option<u64>,
}
