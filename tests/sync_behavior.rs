//! Behavior tests for the sync engine.
//!
//! Each test drives the engine through the real API adapter over a scripted
//! transport and checks what lands in the cache, the store and on the wire.

mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quotesync_core::{
    CacheEvent, HistoryWindow, HttpError, MemoryStore, MergeOrigin, MockHttpClient, MockResponse,
    RetryConfig, SyncError, TradingDate, WriteOrigin,
};
use serde_json::json;
use support::*;

fn roster_client(rows: &'static [(&'static str, &'static str, &'static str)]) -> MockHttpClient {
    MockHttpClient::new(move |request| match request.path() {
        "/list" => MockResponse::json(roster_body(rows)),
        "/quote" => quotes_reply(request, "200"),
        "/profile" => profiles_reply(request),
        _ => not_found(),
    })
}

// =============================================================================
// Roster Sync
// =============================================================================

#[tokio::test]
async fn when_roster_refreshes_favorite_flag_is_preserved() {
    // Given: AAPL is cached as a favorite without profile data
    let client = roster_client(&[("AAPL", "Apple", "150")]);
    let (engine, _store) = engine(&client);
    engine
        .cache()
        .set(vec![record("AAPL", "120").favorite(true)])
        .await;

    // When: The roster comes back without the favorite flag
    let records = engine.refresh_roster().await.expect("roster refresh");

    // Then: The new price and name apply and the favorite survives
    assert_eq!(records.len(), 1);
    let aapl = &records[0];
    assert_eq!(aapl.name, "Apple");
    assert_eq!(aapl.price, price("150"));
    assert!(aapl.is_favorite);
    assert!(!aapl.has_profile_data);
    assert_eq!(engine.favorites().await.len(), 1);
}

#[tokio::test]
async fn when_roster_refreshes_profile_fields_are_preserved() {
    // Given: MSFT was enriched earlier
    let client = roster_client(&[("MSFT", "Microsoft", "310"), ("AAPL", "Apple", "150")]);
    let (engine, _store) = engine(&client);
    let profile = tech_profile("Software");
    engine
        .cache()
        .set(vec![record("MSFT", "300").with_profile(profile.clone())])
        .await;

    // When: The roster is refreshed
    let records = engine.refresh_roster().await.expect("roster refresh");

    // Then: MSFT keeps its profile, AAPL arrives bare, and order is by symbol
    let listed: Vec<&str> = records.iter().map(|record| record.symbol.as_str()).collect();
    assert_eq!(listed, vec!["AAPL", "MSFT"]);
    assert!(records[1].has_profile_data);
    assert_eq!(records[1].profile(), profile);
    assert_eq!(records[1].price, price("310"));
    assert!(!records[0].has_profile_data);
}

#[tokio::test]
async fn when_offline_roster_refresh_serves_cached_records() {
    // Given: Five cached records and no connectivity
    let client = MockHttpClient::new(|_| MockResponse::fail(HttpError::connect("network unreachable")));
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&client, &store, RetryConfig::default());
    let cached = vec![
        record("AAPL", "1"),
        record("AMZN", "2"),
        record("GOOG", "3"),
        record("MSFT", "4"),
        record("TSLA", "5"),
    ];
    engine.cache().set(cached).await;

    // When: The roster refresh runs
    let error = engine.refresh_roster().await.expect_err("offline");

    // Then: The five records come back with the connectivity marker
    let stale = error.stale_records().expect("stale fallback");
    assert_eq!(stale.len(), 5);
    assert!(error.api_error().expect("api error").is_no_connectivity());
    assert_eq!(error.code(), "api.network.no_connectivity");

    // And: The cache is untouched and being offline is not retried
    assert_eq!(engine.all().await.len(), 5);
    assert_eq!(client.request_count(), 1);
}

#[tokio::test]
async fn when_roster_succeeds_store_receives_the_new_roster() {
    let client = roster_client(&[("AAPL", "Apple", "150"), ("MSFT", "Microsoft", "310")]);
    let (engine, store) = engine(&client);

    engine.refresh_roster().await.expect("roster refresh");
    engine.flush_store().await;

    let writes = store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, WriteOrigin::Roster);
    assert_eq!(writes[0].1, symbols(&["AAPL", "MSFT"]));
}

#[tokio::test]
async fn when_store_rejects_writes_roster_refresh_still_succeeds() {
    let client = roster_client(&[("AAPL", "Apple", "150")]);
    let (engine, store) = engine(&client);
    store.fail_writes(true);

    let records = engine.refresh_roster().await.expect("roster refresh");
    engine.flush_store().await;

    assert_eq!(records.len(), 1);
    assert_eq!(engine.all().await.len(), 1);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn when_server_errors_are_transient_roster_refresh_retries() {
    // Given: The first attempt hits a 503, the second succeeds
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = attempts.clone();
    let client = MockHttpClient::new(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            MockResponse::status(503, "{}")
        } else {
            MockResponse::json(roster_body(&[("AAPL", "Apple", "150")]))
        }
    });
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&client, &store, RetryConfig::fixed(Duration::from_millis(250), 2));

    // When: The roster is refreshed
    let records = engine.refresh_roster().await.expect("retried refresh");

    // Then: One retry was enough
    assert_eq!(records.len(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Enrichment Sync
// =============================================================================

#[tokio::test]
async fn when_four_symbols_are_enriched_requests_are_chunked_by_three() {
    // Given: Four cached symbols
    let client = roster_client(&[]);
    let (engine, store) = engine(&client);
    engine
        .cache()
        .set(vec![
            record("AAPL", "1"),
            record("AMZN", "1"),
            record("GOOG", "1"),
            record("MSFT", "1"),
        ])
        .await;

    // When: Profiles are requested in caller order
    let enriched = engine
        .refresh_profiles(&symbols(&["AAPL", "MSFT", "GOOG", "AMZN"]))
        .collect()
        .await;

    // Then: Two calls went out, the second one for a single symbol
    let mut batches: Vec<Vec<String>> = client.requests().iter().map(requested_symbols).collect();
    batches.sort_by_key(Vec::len);
    assert_eq!(batches, vec![vec!["AMZN"], vec!["AAPL", "MSFT", "GOOG"]]);

    // And: The bare single-symbol reply decoded like the wrapped one
    assert_eq!(enriched.len(), 4);
    let amzn = engine
        .cache()
        .get(&symbol("AMZN"))
        .await
        .expect("cached");
    assert!(amzn.has_profile_data);
    assert_eq!(amzn.industry.as_deref(), Some("AMZN industry"));
    assert_eq!(amzn.last_dividend.as_deref(), Some("0.5"));

    engine.flush_store().await;
    assert!(store
        .writes()
        .iter()
        .all(|(origin, _)| *origin == WriteOrigin::Profile));
}

#[tokio::test]
async fn when_a_profile_chunk_fails_other_chunks_still_merge() {
    // Given: The chunk containing MSFT fails upstream
    let client = MockHttpClient::new(|request| {
        if requested_symbols(request).iter().any(|symbol| symbol == "MSFT") {
            MockResponse::status(500, "{}")
        } else {
            profiles_reply(request)
        }
    });
    let (engine, _store) = engine(&client);
    engine
        .cache()
        .set(vec![
            record("AAPL", "1"),
            record("GOOG", "1"),
            record("MSFT", "1"),
            record("TSLA", "1"),
        ])
        .await;

    // When: Two chunks are fetched
    let enriched = engine
        .refresh_profiles(&symbols(&["AAPL", "MSFT", "GOOG", "TSLA"]))
        .collect()
        .await;

    // Then: Only the healthy chunk is merged
    let listed: Vec<&str> = enriched.iter().map(|record| record.symbol.as_str()).collect();
    assert_eq!(listed, vec!["TSLA"]);
    let msft = engine.cache().get(&symbol("MSFT")).await.expect("cached");
    assert!(!msft.has_profile_data);
}

#[tokio::test(start_paused = true)]
async fn when_chunks_finish_out_of_order_results_arrive_in_arrival_order() {
    // Given: The first chunk is slow and the second is fast
    let client = MockHttpClient::new(|request| {
        let reply = profiles_reply(request);
        if requested_symbols(request).len() > 1 {
            reply.after(Duration::from_secs(2))
        } else {
            reply
        }
    });
    let (engine, _store) = engine(&client);
    engine
        .cache()
        .set(vec![
            record("AAPL", "1"),
            record("AMZN", "1"),
            record("GOOG", "1"),
            record("MSFT", "1"),
        ])
        .await;

    // When: The stream is read chunk by chunk
    let mut stream = engine.refresh_profiles(&symbols(&["AAPL", "MSFT", "GOOG", "AMZN"]));
    let first = stream.next().await.expect("first chunk");

    // Then: The fast chunk is already merged while the slow one is pending
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].symbol.as_str(), "AMZN");
    let aapl = engine.cache().get(&symbol("AAPL")).await.expect("cached");
    assert!(!aapl.has_profile_data);

    let second = stream.next().await.expect("second chunk");
    assert_eq!(second.len(), 3);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn when_profiles_omit_or_name_uncached_symbols_nothing_else_changes() {
    // Given: The reply covers AAPL plus an uncached symbol, and skips MSFT
    let client = MockHttpClient::new(|_| {
        MockResponse::json(
            json!({ "profiles": [profile_value("AAPL"), profile_value("NVDA")] }).to_string(),
        )
    });
    let (engine, _store) = engine(&client);
    engine
        .cache()
        .set(vec![record("AAPL", "1"), record("MSFT", "1")])
        .await;

    // When: Profiles are refreshed
    let enriched = engine
        .refresh_profiles(&symbols(&["AAPL", "MSFT"]))
        .collect()
        .await;

    // Then: Only AAPL merges; MSFT is untouched and NVDA is not inserted
    assert_eq!(enriched.len(), 1);
    assert_eq!(engine.all().await.len(), 2);
    let msft = engine.cache().get(&symbol("MSFT")).await.expect("cached");
    assert!(!msft.has_profile_data);
}

// =============================================================================
// Quote Sync
// =============================================================================

#[tokio::test]
async fn when_quotes_refresh_only_prices_change() {
    // Given: A favorite, enriched AAPL
    let client = MockHttpClient::new(|request| quotes_reply(request, "175.50"));
    let (engine, store) = engine(&client);
    engine
        .cache()
        .set(vec![
            record("AAPL", "150")
                .favorite(true)
                .with_profile(tech_profile("Hardware")),
            record("MSFT", "300"),
        ])
        .await;

    // When: AAPL and an uncached symbol are quoted in one request
    let updated = engine
        .refresh_quotes(&symbols(&["AAPL", "ZZZ"]))
        .await
        .expect("quotes");

    // Then: Only AAPL's price changed and everything it owns is intact
    assert_eq!(client.request_count(), 1);
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].price, price("175.50"));
    assert!(updated[0].is_favorite);
    assert!(updated[0].has_profile_data);
    assert_eq!(updated[0].industry.as_deref(), Some("Hardware"));
    assert_eq!(engine.all().await.len(), 2);

    engine.flush_store().await;
    assert_eq!(store.writes(), vec![(WriteOrigin::Quote, symbols(&["AAPL"]))]);
}

#[tokio::test]
async fn when_quote_refresh_fails_cached_prices_are_served() {
    let client = MockHttpClient::new(|_| MockResponse::fail(HttpError::timeout("deadline")));
    let (engine, _store) = engine(&client);
    engine
        .cache()
        .set(vec![record("AAPL", "150"), record("MSFT", "300")])
        .await;

    let error = engine
        .refresh_quotes(&symbols(&["MSFT"]))
        .await
        .expect_err("timeout");

    assert!(matches!(error, SyncError::StaleFallback { .. }));
    let stale = error.stale_records().expect("stale");
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].price, price("300"));
    assert_eq!(error.code(), "api.network.timeout");
}

#[tokio::test]
async fn when_no_symbols_are_requested_no_quote_call_is_made() {
    let client = MockHttpClient::new(|request| quotes_reply(request, "1"));
    let (engine, _store) = engine(&client);

    let updated = engine.refresh_favorites().await.expect("nothing to do");

    assert!(updated.is_empty());
    assert_eq!(client.request_count(), 0);
}

// =============================================================================
// Favorites, restore and events
// =============================================================================

#[tokio::test]
async fn when_favorite_is_toggled_only_the_flag_changes_and_is_persisted() {
    let client = MockHttpClient::new(|_| not_found());
    let (engine, store) = engine(&client);
    engine
        .cache()
        .set(vec![record("AAPL", "150").with_profile(tech_profile("Hardware"))])
        .await;

    let updated = engine
        .set_favorite(&symbol("AAPL"), true)
        .await
        .expect("favorite");
    engine.flush_store().await;

    assert!(updated.is_favorite);
    assert!(updated.has_profile_data);
    assert_eq!(updated.price, price("150"));
    assert_eq!(client.request_count(), 0);
    assert_eq!(store.writes(), vec![(WriteOrigin::Favorite, symbols(&["AAPL"]))]);

    let cleared = engine
        .set_favorite(&symbol("AAPL"), false)
        .await
        .expect("unfavorite");
    assert!(!cleared.is_favorite);
    assert!(engine.favorites().await.is_empty());
    assert_eq!(engine.all().await.len(), 1);
}

#[tokio::test]
async fn when_favorite_symbol_is_not_cached_toggle_is_rejected() {
    let client = MockHttpClient::new(|_| not_found());
    let (engine, _store) = engine(&client);

    let error = engine
        .set_favorite(&symbol("AAPL"), true)
        .await
        .expect_err("unknown");

    assert!(matches!(error, SyncError::UnknownSymbol(_)));
    assert_eq!(error.code(), "sync.unknown_symbol");
}

#[tokio::test]
async fn when_engine_restores_cache_matches_store_in_symbol_order() {
    let client = MockHttpClient::new(|_| not_found());
    let store = Arc::new(MemoryStore::seeded(vec![
        record("TSLA", "900").favorite(true),
        record("AAPL", "150"),
    ]));
    let engine = engine_with(&client, &store, RetryConfig::no_retry());

    let restored = engine.restore().await.expect("restore");

    let listed: Vec<&str> = restored.iter().map(|record| record.symbol.as_str()).collect();
    assert_eq!(listed, vec!["AAPL", "TSLA"]);
    assert_eq!(engine.favorites().await.len(), 1);
}

#[tokio::test]
async fn when_store_cannot_be_read_restore_reports_a_store_error() {
    let client = MockHttpClient::new(|_| not_found());
    let store = Arc::new(MemoryStore::new());
    store.fail_reads(true);
    let engine = engine_with(&client, &store, RetryConfig::no_retry());

    let error = engine.restore().await.expect_err("read failure");

    assert!(matches!(error, SyncError::Store(_)));
    assert_eq!(error.code(), "store.read");
}

#[tokio::test]
async fn when_syncs_run_subscribers_see_every_cache_change() {
    let client = roster_client(&[("AAPL", "Apple", "150")]);
    let (engine, _store) = engine(&client);
    let mut events = engine.subscribe();

    engine.refresh_roster().await.expect("roster");
    engine
        .refresh_quotes(&symbols(&["AAPL"]))
        .await
        .expect("quotes");
    engine
        .set_favorite(&symbol("AAPL"), true)
        .await
        .expect("favorite");

    assert!(matches!(
        events.recv().await.expect("event"),
        CacheEvent::Replaced { .. }
    ));
    assert!(matches!(
        events.recv().await.expect("event"),
        CacheEvent::Merged {
            origin: MergeOrigin::Quote,
            ..
        }
    ));
    let favorite = events.recv().await.expect("event");
    assert!(matches!(
        favorite,
        CacheEvent::Merged {
            origin: MergeOrigin::Favorite,
            ..
        }
    ));
    assert!(favorite.records()[0].is_favorite);
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn when_history_is_fetched_three_years_are_requested_and_sliced_locally() {
    // Given: A provider with four data points spread over three years
    let client = MockHttpClient::new(|request| {
        let row = |date: &str| {
            json!({
                "date": date, "open": "1", "high": "2", "low": "0.5", "close": "1.5",
                "volume": 1000, "changePercent": "0.1", "vwap": "1.2"
            })
        };
        let body = json!({
            "symbol": "AAPL",
            "historical": [
                row("2020-03-01"), row("2019-10-01"), row("2018-01-02"), row("2020-01-15")
            ]
        });
        assert!(request.path().starts_with("/history/AAPL"));
        MockResponse::json(body.to_string())
    });
    let (engine, _store) = engine(&client);
    let today = TradingDate::parse("2020-03-10").expect("date");

    // When: The three-month window is requested
    let history = engine
        .fetch_history_until(&symbol("AAPL"), HistoryWindow::ThreeMonths, today)
        .await
        .expect("history");

    // Then: The request spans three years and only recent points are kept, oldest first
    let request = &client.requests()[0];
    assert_eq!(request.query_param("from").as_deref(), Some("2017-03-10"));
    assert_eq!(request.query_param("to").as_deref(), Some("2020-03-10"));
    let dates: Vec<String> = history
        .moments
        .iter()
        .map(|moment| moment.date.format())
        .collect();
    assert_eq!(dates, vec!["2020-01-15", "2020-03-01"]);
    assert!(engine.all().await.is_empty());
}
