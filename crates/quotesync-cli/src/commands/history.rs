use quotesync_core::{HistoryWindow, PriceHistory, Symbol, SyncEngine};
use serde::Serialize;
use serde_json::Value;

use crate::cli::HistoryArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct HistoryResponseData {
    window: HistoryWindow,
    count: usize,
    history: PriceHistory,
}

pub async fn run(args: &HistoryArgs, engine: &SyncEngine) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let window: HistoryWindow = args.window.parse()?;

    let result = match engine.fetch_history(&symbol, window).await {
        Ok(history) => CommandResult::ok(serde_json::to_value(HistoryResponseData {
            window,
            count: history.moments.len(),
            history,
        })?),
        Err(error) => CommandResult::ok(Value::Null).with_error(&error),
    };
    Ok(result)
}
