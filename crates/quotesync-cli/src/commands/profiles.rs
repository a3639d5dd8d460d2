use quotesync_core::{StockRecord, SyncEngine};
use serde::Serialize;

use crate::cli::SymbolsArgs;
use crate::error::CliError;

use super::{ensure_roster, parse_symbols, CommandResult};

#[derive(Debug, Serialize)]
struct ProfilesResponseData {
    /// Symbols of each merged chunk, in arrival order.
    batches: Vec<Vec<String>>,
    stocks: Vec<StockRecord>,
    missing: Vec<String>,
}

pub async fn run(args: &SymbolsArgs, engine: &SyncEngine) -> Result<CommandResult, CliError> {
    let symbols = parse_symbols(&args.symbols)?;
    let mut warnings = Vec::new();

    if let Err(error) = ensure_roster(engine, &mut warnings).await {
        warnings.push(format!("roster unavailable: {error}"));
    }

    let mut stream = engine.refresh_profiles(&symbols);
    let mut batches = Vec::new();
    let mut stocks: Vec<StockRecord> = Vec::new();
    while let Some(batch) = stream.next().await {
        batches.push(
            batch
                .iter()
                .map(|record| record.symbol.as_str().to_owned())
                .collect(),
        );
        stocks.extend(batch);
    }
    stocks.sort_by(|left, right| left.symbol.cmp(&right.symbol));

    let missing: Vec<String> = symbols
        .iter()
        .filter(|symbol| !stocks.iter().any(|record| &record.symbol == *symbol))
        .map(|symbol| symbol.as_str().to_owned())
        .collect();
    if !missing.is_empty() {
        warnings.push(format!("no profile merged for: {}", missing.join(",")));
    }

    Ok(CommandResult::ok(serde_json::to_value(ProfilesResponseData {
        batches,
        stocks,
        missing,
    })?)
    .with_warnings(warnings))
}
