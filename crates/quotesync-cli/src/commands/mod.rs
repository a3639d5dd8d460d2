mod favorites;
mod history;
mod profiles;
mod quotes;
mod roster;
mod watch;

use std::sync::Arc;

use quotesync_core::config::validate_base_url;
use quotesync_core::{
    fixture_client, DurableStore, FmpAdapter, HttpClient, MemoryStore, ReqwestHttpClient,
    StockRecord, SyncConfig, SyncEngine, SyncError, Symbol, FIXTURE_BASE_URL,
};
use quotesync_store::{Store, StoreConfig};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::{Envelope, ErrorEntry};

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<ErrorEntry>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_error(mut self, error: &SyncError) -> Self {
        self.errors.push(error_entry(error));
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let config = sync_config(cli)?;
    let engine = build_engine(cli, &config)?;

    let (command, result) = match &cli.command {
        Command::Roster => ("roster", roster::run(&engine).await?),
        Command::Quotes(args) => ("quotes", quotes::run(args, &engine).await?),
        Command::Profiles(args) => ("profiles", profiles::run(args, &engine).await?),
        Command::Favorite(args) => ("favorite", favorites::set(args, &engine).await?),
        Command::Favorites => ("favorites", favorites::list(&engine).await?),
        Command::History(args) => ("history", history::run(args, &engine).await?),
        Command::Watch(args) => ("watch", watch::run(args, &engine).await?),
    };

    engine.flush_store().await;

    let CommandResult {
        data,
        warnings,
        errors,
    } = result;
    tracing::debug!(
        command,
        warnings = warnings.len(),
        errors = errors.len(),
        "command finished"
    );
    Ok(Envelope::new(command, data, warnings, errors))
}

fn sync_config(cli: &Cli) -> Result<SyncConfig, CliError> {
    let mut config = SyncConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = validate_base_url(base_url)?;
    }
    if let Some(api_key) = &cli.api_key {
        config.api.api_key = Some(api_key.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.api.timeout_ms = timeout_ms.max(1);
    }
    if cli.mock {
        config.api.base_url = String::from(FIXTURE_BASE_URL);
        config.api.requests_per_second = None;
    }
    Ok(config)
}

fn build_engine(cli: &Cli, config: &SyncConfig) -> Result<SyncEngine, CliError> {
    let (http_client, store): (Arc<dyn HttpClient>, Arc<dyn DurableStore>) = if cli.mock {
        (Arc::new(fixture_client()), Arc::new(MemoryStore::new()))
    } else {
        let mut store_config = StoreConfig::default();
        if let Some(db_path) = &cli.db_path {
            store_config.db_path = db_path.clone();
        }
        tracing::debug!(path = %store_config.db_path.display(), "opening store");
        (
            Arc::new(ReqwestHttpClient::new()),
            Arc::new(Store::open(store_config)?),
        )
    };

    let remote = Arc::new(FmpAdapter::new(http_client, &config.api));
    Ok(SyncEngine::new(remote, store, config))
}

pub(crate) fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    raw.iter()
        .map(|value| Symbol::parse(value).map_err(CliError::from))
        .collect()
}

pub(crate) fn error_entry(error: &SyncError) -> ErrorEntry {
    ErrorEntry {
        code: error.code().to_owned(),
        message: error.to_string(),
        retryable: error.api_error().is_some_and(|cause| cause.retryable()),
    }
}

/// Load the stored roster, fetching it remotely when the store is empty.
pub(crate) async fn ensure_roster(
    engine: &SyncEngine,
    warnings: &mut Vec<String>,
) -> Result<Vec<StockRecord>, SyncError> {
    match engine.restore().await {
        Ok(records) if !records.is_empty() => return Ok(records),
        Ok(_) => {}
        Err(error) => warnings.push(format!("could not read local store: {error}")),
    }
    engine.refresh_roster().await
}
