use quotesync_core::{StockRecord, Symbol, SyncEngine};
use serde::Serialize;
use serde_json::Value;

use crate::cli::FavoriteArgs;
use crate::error::CliError;

use super::{ensure_roster, CommandResult};

#[derive(Debug, Serialize)]
struct FavoriteResponseData {
    stock: StockRecord,
}

#[derive(Debug, Serialize)]
struct FavoritesResponseData {
    count: usize,
    favorites: Vec<StockRecord>,
}

pub async fn set(args: &FavoriteArgs, engine: &SyncEngine) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let mut warnings = Vec::new();

    if let Err(error) = ensure_roster(engine, &mut warnings).await {
        warnings.push(format!("roster unavailable: {error}"));
    }

    let result = match engine.set_favorite(&symbol, !args.off).await {
        Ok(stock) => CommandResult::ok(serde_json::to_value(FavoriteResponseData { stock })?),
        Err(error) => CommandResult::ok(Value::Null).with_error(&error),
    };
    Ok(result.with_warnings(warnings))
}

pub async fn list(engine: &SyncEngine) -> Result<CommandResult, CliError> {
    let mut warnings = Vec::new();
    if let Err(error) = engine.restore().await {
        warnings.push(format!("could not read local store: {error}"));
    }

    let favorites = engine.favorites().await;
    Ok(CommandResult::ok(serde_json::to_value(FavoritesResponseData {
        count: favorites.len(),
        favorites,
    })?)
    .with_warnings(warnings))
}
