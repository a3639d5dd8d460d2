use std::time::Duration;

use quotesync_core::{
    CacheEvent, MergeOrigin, PollState, ScopedUpdates, StockRecord, Symbol, SyncEngine, UpdateScope,
};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::time;

use crate::cli::WatchArgs;
use crate::error::CliError;

use super::{ensure_roster, CommandResult};

#[derive(Debug, Serialize)]
struct Tick {
    tick: usize,
    stocks: Vec<StockRecord>,
}

#[derive(Debug, Serialize)]
struct WatchResponseData {
    scope: String,
    interval_secs: u64,
    state: PollState,
    ticks: Vec<Tick>,
    snapshot: Vec<StockRecord>,
}

pub async fn run(args: &WatchArgs, engine: &SyncEngine) -> Result<CommandResult, CliError> {
    let scope = parse_scope(&args.target)?;
    let mut warnings = Vec::new();

    if let Err(error) = ensure_roster(engine, &mut warnings).await {
        warnings.push(format!("roster unavailable: {error}"));
    }
    let mut wanted = args.ticks;
    if scope == UpdateScope::Favorites && engine.favorites().await.is_empty() {
        warnings.push(String::from("no favorites to watch"));
        wanted = 0;
    }

    let interval = args
        .interval_secs
        .map_or_else(|| engine.poll_interval(), |seconds| Duration::from_secs(seconds.max(1)));
    let mut events = engine.subscribe();
    let mut updates = ScopedUpdates::with_interval(engine.clone(), scope.clone(), interval);
    updates.start();

    let mut ticks = Vec::new();
    while ticks.len() < wanted {
        match time::timeout(interval * 3, events.recv()).await {
            Ok(Ok(CacheEvent::Merged {
                origin: MergeOrigin::Quote,
                records,
            })) => ticks.push(Tick {
                tick: ticks.len() + 1,
                stocks: records,
            }),
            Ok(Ok(_)) => {}
            Ok(Err(RecvError::Lagged(skipped))) => {
                warnings.push(format!("missed {skipped} cache events"));
            }
            Ok(Err(RecvError::Closed)) => break,
            Err(_) => {
                warnings.push(format!(
                    "no price update within {}s; stopping",
                    (interval * 3).as_secs()
                ));
                break;
            }
        }
    }

    let snapshot = snapshot_for(engine, &scope).await;
    updates.stop(snapshot.clone());

    Ok(CommandResult::ok(serde_json::to_value(WatchResponseData {
        scope: scope.to_string(),
        interval_secs: interval.as_secs(),
        state: updates.state(),
        ticks,
        snapshot,
    })?)
    .with_warnings(warnings))
}

fn parse_scope(target: &str) -> Result<UpdateScope, CliError> {
    match target.trim().to_ascii_lowercase().as_str() {
        "roster" => Ok(UpdateScope::Roster),
        "favorites" => Ok(UpdateScope::Favorites),
        _ => Ok(UpdateScope::Detail(Symbol::parse(target)?)),
    }
}

async fn snapshot_for(engine: &SyncEngine, scope: &UpdateScope) -> Vec<StockRecord> {
    match scope {
        UpdateScope::Roster => engine.all().await,
        UpdateScope::Favorites => engine.favorites().await,
        UpdateScope::Detail(symbol) => engine.cache().get(symbol).await.into_iter().collect(),
    }
}
