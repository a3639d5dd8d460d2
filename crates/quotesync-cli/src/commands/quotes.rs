use quotesync_core::{StockRecord, SyncEngine};
use serde::Serialize;

use crate::cli::SymbolsArgs;
use crate::error::CliError;

use super::{ensure_roster, parse_symbols, CommandResult};

#[derive(Debug, Serialize)]
struct QuotesResponseData {
    stale: bool,
    quotes: Vec<StockRecord>,
    /// Requested symbols that are not in the roster.
    unknown: Vec<String>,
}

pub async fn run(args: &SymbolsArgs, engine: &SyncEngine) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let mut warnings = Vec::new();

    if let Err(error) = ensure_roster(engine, &mut warnings).await {
        warnings.push(format!("roster unavailable: {error}"));
    }

    let (stale, quotes, failure) = match engine.refresh_quotes(&symbols).await {
        Ok(quotes) => (false, quotes, None),
        Err(error) => {
            let cached = error.stale_records().map(<[StockRecord]>::to_vec).unwrap_or_default();
            (true, cached, Some(error))
        }
    };

    let unknown = symbols
        .iter()
        .filter(|symbol| !quotes.iter().any(|quote| &quote.symbol == *symbol))
        .map(|symbol| symbol.as_str().to_owned())
        .collect();

    let mut result = CommandResult::ok(serde_json::to_value(QuotesResponseData {
        stale,
        quotes,
        unknown,
    })?)
    .with_warnings(warnings);
    if let Some(error) = failure {
        result = result.with_error(&error);
    }
    Ok(result)
}
