//! Offline stock universe served over a [`MockHttpClient`].
//!
//! Answers every [`FmpAdapter`](super::FmpAdapter) route with deterministic
//! data, so the CLI `--mock` mode and demos run without network access. Quote
//! prices drift by one cent per quote request so polling visibly changes data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::http_client::{HttpRequest, MockHttpClient, MockResponse};
use crate::TradingDate;

pub const FIXTURE_BASE_URL: &str = "http://fixture.quotesync.local";

struct FixtureStock {
    symbol: &'static str,
    name: &'static str,
    /// Price in cents.
    price: i64,
    change: &'static str,
    sector: &'static str,
    industry: &'static str,
}

const UNIVERSE: &[FixtureStock] = &[
    FixtureStock {
        symbol: "AAPL",
        name: "Apple Inc.",
        price: 31_396,
        change: "(+1.24%)",
        sector: "Technology",
        industry: "Computer Hardware",
    },
    FixtureStock {
        symbol: "AMZN",
        name: "Amazon.com Inc.",
        price: 209_528,
        change: "(-0.63%)",
        sector: "Consumer Cyclical",
        industry: "Specialty Retail",
    },
    FixtureStock {
        symbol: "GOOG",
        name: "Alphabet Inc.",
        price: 152_410,
        change: "(+0.22%)",
        sector: "Technology",
        industry: "Online Media",
    },
    FixtureStock {
        symbol: "MSFT",
        name: "Microsoft Corporation",
        price: 18_422,
        change: "(-0.15%)",
        sector: "Technology",
        industry: "Application Software",
    },
    FixtureStock {
        symbol: "TSLA",
        name: "Tesla Inc.",
        price: 89_912,
        change: "(+3.81%)",
        sector: "Consumer Cyclical",
        industry: "Auto Manufacturers",
    },
];

/// Transport serving the fixture universe.
pub fn fixture_client() -> MockHttpClient {
    let quote_requests = Arc::new(AtomicU64::new(0));
    MockHttpClient::new(move |request| route(request, &quote_requests))
}

fn route(request: &HttpRequest, quote_requests: &AtomicU64) -> MockResponse {
    let path = request.path();
    match path {
        "/list" => MockResponse::json(roster_body().to_string()),
        "/quote" => {
            let tick = quote_requests.fetch_add(1, Ordering::Relaxed);
            MockResponse::json(quotes_body(&requested(request), tick).to_string())
        }
        "/profile" => match profiles_body(&requested(request)) {
            Some(body) => MockResponse::json(body.to_string()),
            None => MockResponse::status(400, r#"{"error":"symbols required"}"#),
        },
        _ => match path.strip_prefix("/history/") {
            Some(symbol) => history_body(symbol, request)
                .map_or_else(|| MockResponse::status(404, "{}"), |body| MockResponse::json(body.to_string())),
            None => MockResponse::status(404, "{}"),
        },
    }
}

fn requested(request: &HttpRequest) -> Vec<&'static FixtureStock> {
    let symbols = request.query_param("symbols").unwrap_or_default();
    symbols
        .split(',')
        .filter_map(|symbol| UNIVERSE.iter().find(|stock| stock.symbol == symbol))
        .collect()
}

fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn roster_body() -> Value {
    let stocks: Vec<Value> = UNIVERSE
        .iter()
        .map(|stock| json!({"symbol": stock.symbol, "name": stock.name, "price": price(stock.price)}))
        .collect();
    json!({ "stocks": stocks })
}

fn quotes_body(stocks: &[&FixtureStock], tick: u64) -> Value {
    let drift = i64::try_from(tick % 100).unwrap_or_default();
    let prices: Vec<Value> = stocks
        .iter()
        .map(|stock| json!({"symbol": stock.symbol, "price": price(stock.price + drift)}))
        .collect();
    json!({ "prices": prices })
}

fn profile_value(stock: &FixtureStock) -> Value {
    json!({
        "symbol": stock.symbol,
        "data": {
            "image": format!("https://images.quotesync.local/{}.png", stock.symbol),
            "changesPercentage": stock.change,
            "changes": price(stock.price / 100),
            "lastDiv": "0.82",
            "sector": stock.sector,
            "industry": stock.industry,
        }
    })
}

fn profiles_body(stocks: &[&FixtureStock]) -> Option<Value> {
    match stocks {
        [] => None,
        [single] => Some(profile_value(single)),
        many => Some(json!({
            "profiles": many.iter().map(|stock| profile_value(stock)).collect::<Vec<_>>()
        })),
    }
}

fn history_body(symbol: &str, request: &HttpRequest) -> Option<Value> {
    let stock = UNIVERSE.iter().find(|stock| stock.symbol == symbol)?;
    let from = TradingDate::parse(&request.query_param("from")?).ok()?;
    let to = TradingDate::parse(&request.query_param("to")?).ok()?;

    let mut historical = Vec::new();
    let mut day = from.into_inner();
    let mut index: i64 = 0;
    while day <= to.into_inner() {
        let close = stock.price + (index % 40) * 25 - 500;
        historical.push(json!({
            "date": TradingDate::from_date(day).format(),
            "open": price(close - 40),
            "high": price(close + 120),
            "low": price(close - 130),
            "close": price(close),
            "volume": 1_000_000 + index * 1_000,
            "changePercent": Decimal::new((index % 7) - 3, 1),
            "vwap": price(close - 10),
        }));
        index += 1;
        day = match day.next_day() {
            Some(next) => next,
            None => break,
        };
    }

    Some(json!({ "symbol": stock.symbol, "historical": historical }))
}
