use quotesync_core::{StockRecord, SyncEngine};
use serde::Serialize;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct RosterResponseData {
    stale: bool,
    count: usize,
    stocks: Vec<StockRecord>,
}

pub async fn run(engine: &SyncEngine) -> Result<CommandResult, CliError> {
    let mut warnings = Vec::new();
    if let Err(error) = engine.restore().await {
        warnings.push(format!("could not read local store: {error}"));
    }

    let result = match engine.refresh_roster().await {
        Ok(stocks) => CommandResult::ok(serde_json::to_value(RosterResponseData {
            stale: false,
            count: stocks.len(),
            stocks,
        })?),
        Err(error) => {
            let stocks = error.stale_records().map(<[StockRecord]>::to_vec).unwrap_or_default();
            CommandResult::ok(serde_json::to_value(RosterResponseData {
                stale: true,
                count: stocks.len(),
                stocks,
            })?)
            .with_error(&error)
        }
    };

    Ok(result.with_warnings(warnings))
}
