#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use quotesync_core::{
    ApiConfig, FmpAdapter, HttpRequest, MemoryStore, MockHttpClient, MockResponse, RetryConfig,
    StockProfile, StockRecord, SyncConfig, SyncEngine, Symbol,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};

pub const MOCK_BASE_URL: &str = "http://mock.test";

pub fn symbol(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid symbol")
}

pub fn symbols(raw: &[&str]) -> Vec<Symbol> {
    raw.iter().map(|value| symbol(value)).collect()
}

pub fn price(raw: &str) -> Decimal {
    Decimal::from_str(raw).expect("valid decimal")
}

pub fn record(raw_symbol: &str, raw_price: &str) -> StockRecord {
    StockRecord::new(symbol(raw_symbol), format!("{raw_symbol} Inc."), price(raw_price))
}

pub fn tech_profile(industry: &str) -> StockProfile {
    StockProfile {
        company_logo_url: Some(format!("https://logo.test/{industry}.png")),
        percentage_change: Some(String::from("(+1.10%)")),
        absolute_change: Some(price("1.10")),
        last_dividend: Some(String::from("0.24")),
        sector: Some(String::from("Technology")),
        industry: Some(industry.to_owned()),
    }
}

pub fn sync_config(retry: RetryConfig) -> SyncConfig {
    SyncConfig {
        api: ApiConfig {
            base_url: String::from(MOCK_BASE_URL),
            requests_per_second: None,
            ..ApiConfig::default()
        },
        retry,
        ..SyncConfig::default()
    }
}

/// Engine over the real API adapter, a scripted transport and an in-memory store.
pub fn engine_with(client: &MockHttpClient, store: &Arc<MemoryStore>, retry: RetryConfig) -> SyncEngine {
    let config = sync_config(retry);
    let remote = Arc::new(FmpAdapter::new(Arc::new(client.clone()), &config.api));
    SyncEngine::new(remote, store.clone(), &config)
}

pub fn engine(client: &MockHttpClient) -> (SyncEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (engine_with(client, &store, RetryConfig::no_retry()), store)
}

/// Symbols of the `symbols` query parameter, in request order.
pub fn requested_symbols(request: &HttpRequest) -> Vec<String> {
    request
        .query_param("symbols")
        .map(|value| value.split(',').map(str::to_owned).collect())
        .unwrap_or_default()
}

pub fn roster_body(rows: &[(&str, &str, &str)]) -> String {
    let stocks: Vec<Value> = rows
        .iter()
        .map(|(symbol, name, price)| json!({"symbol": symbol, "name": name, "price": price}))
        .collect();
    json!({ "stocks": stocks }).to_string()
}

pub fn quotes_body(rows: &[(&str, &str)]) -> String {
    let prices: Vec<Value> = rows
        .iter()
        .map(|(symbol, price)| json!({"symbol": symbol, "price": price}))
        .collect();
    json!({ "prices": prices }).to_string()
}

pub fn profile_value(symbol: &str) -> Value {
    json!({
        "symbol": symbol,
        "data": {
            "image": format!("https://logo.test/{symbol}.png"),
            "changesPercentage": "(+2.00%)",
            "changes": "2.00",
            "lastDiv": 0.5,
            "sector": "Technology",
            "industry": format!("{symbol} industry"),
        }
    })
}

/// Provider-shaped profile reply: bare object for one symbol, wrapped list otherwise.
pub fn profiles_reply(request: &HttpRequest) -> MockResponse {
    let requested = requested_symbols(request);
    let body = match requested.as_slice() {
        [single] => profile_value(single),
        many => json!({
            "profiles": many.iter().map(|symbol| profile_value(symbol)).collect::<Vec<_>>()
        }),
    };
    MockResponse::json(body.to_string())
}

/// Quote reply pricing every requested symbol at `price`.
pub fn quotes_reply(request: &HttpRequest, price: &str) -> MockResponse {
    let requested = requested_symbols(request);
    let rows: Vec<(&str, &str)> = requested.iter().map(|symbol| (symbol.as_str(), price)).collect();
    MockResponse::json(quotes_body(&rows))
}

pub fn not_found() -> MockResponse {
    MockResponse::status(404, "{}")
}
