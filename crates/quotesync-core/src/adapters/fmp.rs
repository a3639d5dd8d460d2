use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{DeserializeOwned, Error as DeError};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::http_client::{HttpClient, HttpError, HttpErrorKind, HttpRequest};
use crate::remote::{
    ApiError, Endpoint, NetworkFailure, ProfileEntry, QuoteEntry, RemoteFuture, RemoteSource,
    RosterEntry,
};
use crate::throttling::RequestThrottle;
use crate::{HistoricalMoment, PriceHistory, StockProfile, Symbol, TradingDate};

/// Adapter for Financial Modeling Prep style quote APIs.
///
/// Routes, relative to the configured base URL:
///
/// | Call | Route |
/// |------|-------|
/// | roster | `GET /list` |
/// | quotes | `GET /quote?symbols=A,B` |
/// | profiles | `GET /profile?symbols=A,B` |
/// | history | `GET /history/{symbol}?from=YYYY-MM-DD&to=YYYY-MM-DD` |
///
/// The profile route answers a single-symbol request with a bare profile object
/// and a multi-symbol request with a wrapped list; the decoder is picked from
/// the request size.
#[derive(Clone)]
pub struct FmpAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
    throttle: Option<RequestThrottle>,
}

impl FmpAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: &ApiConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
            throttle: config.requests_per_second.map(RequestThrottle::per_second),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut pairs: Vec<String> = query
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect();
        if let Some(api_key) = &self.api_key {
            pairs.push(format!("apikey={}", urlencoding::encode(api_key)));
        }

        let mut url = format!("{}{path}", self.base_url);
        if !pairs.is_empty() {
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        url
    }

    async fn fetch(&self, endpoint: Endpoint, url: String) -> Result<String, ApiError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::invalid_request(
                endpoint,
                format!("base url '{}' is not an http(s) url", self.base_url),
            ));
        }

        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }

        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| transport_error(endpoint, &error))?;

        if !response.is_success() {
            return Err(ApiError::network(
                endpoint,
                NetworkFailure::Status(response.status),
                format!("upstream returned status {}", response.status),
            ));
        }

        Ok(response.body)
    }
}

impl RemoteSource for FmpAdapter {
    fn roster<'a>(&'a self) -> RemoteFuture<'a, Vec<RosterEntry>> {
        Box::pin(async move {
            let body = self.fetch(Endpoint::Roster, self.url("/list", &[])).await?;
            let payload: RosterBody = decode(Endpoint::Roster, &body)?;

            let total = payload.stocks.len();
            let entries: Vec<RosterEntry> = payload
                .stocks
                .into_iter()
                .filter_map(|row| {
                    Symbol::parse(&row.symbol).ok().map(|symbol| RosterEntry {
                        symbol,
                        name: row.name,
                        price: row.price,
                    })
                })
                .collect();
            if entries.len() < total {
                tracing::debug!(
                    skipped = total - entries.len(),
                    "roster rows with unusable symbols skipped"
                );
            }
            Ok(entries)
        })
    }

    fn quotes<'a>(&'a self, symbols: &'a [Symbol]) -> RemoteFuture<'a, Vec<QuoteEntry>> {
        Box::pin(async move {
            if symbols.is_empty() {
                return Err(ApiError::invalid_request(
                    Endpoint::Quotes,
                    "quote request requires at least one symbol",
                ));
            }

            let url = self.url("/quote", &[("symbols", Symbol::join(symbols))]);
            let body = self.fetch(Endpoint::Quotes, url).await?;
            let rows = match decode::<QuotesBody>(Endpoint::Quotes, &body)? {
                QuotesBody::Batch { prices } => prices,
                QuotesBody::Single(row) => vec![row],
            };

            Ok(rows
                .into_iter()
                .map(|row| QuoteEntry {
                    symbol: row.symbol,
                    price: row.price,
                })
                .collect())
        })
    }

    fn profiles<'a>(&'a self, symbols: &'a [Symbol]) -> RemoteFuture<'a, Vec<ProfileEntry>> {
        Box::pin(async move {
            if symbols.is_empty() {
                return Err(ApiError::invalid_request(
                    Endpoint::Profiles,
                    "profile request requires at least one symbol",
                ));
            }

            let url = self.url("/profile", &[("symbols", Symbol::join(symbols))]);
            let body = self.fetch(Endpoint::Profiles, url).await?;
            let rows = if symbols.len() == 1 {
                vec![decode::<ProfileRow>(Endpoint::Profiles, &body)?]
            } else {
                decode::<ProfileBatchBody>(Endpoint::Profiles, &body)?.profiles
            };

            Ok(rows.into_iter().map(ProfileRow::into_entry).collect())
        })
    }

    fn history<'a>(
        &'a self,
        symbol: &'a Symbol,
        from: TradingDate,
        to: TradingDate,
    ) -> RemoteFuture<'a, PriceHistory> {
        Box::pin(async move {
            if from > to {
                return Err(ApiError::invalid_request(
                    Endpoint::History,
                    format!("history range starts after it ends: {from} > {to}"),
                ));
            }

            let path = format!("/history/{}", urlencoding::encode(symbol.as_str()));
            let url = self.url(&path, &[("from", from.format()), ("to", to.format())]);
            let body = self.fetch(Endpoint::History, url).await?;
            let payload: HistoryBody = decode(Endpoint::History, &body)?;

            let moments = payload
                .historical
                .into_iter()
                .map(HistoryRow::into_moment)
                .collect();
            Ok(PriceHistory::new(
                payload.symbol.unwrap_or_else(|| symbol.clone()),
                moments,
            ))
        })
    }
}

fn transport_error(endpoint: Endpoint, error: &HttpError) -> ApiError {
    let failure = match error.kind() {
        HttpErrorKind::Connect => NetworkFailure::NoConnectivity,
        HttpErrorKind::Timeout => NetworkFailure::Timeout,
        HttpErrorKind::Other => NetworkFailure::Transport,
    };
    ApiError::network(endpoint, failure, error.message())
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|error| ApiError::decoding(endpoint, error.to_string()))
}

#[derive(Debug, Deserialize)]
struct RosterBody {
    #[serde(alias = "symbolsList")]
    stocks: Vec<RosterRow>,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuotesBody {
    Batch {
        #[serde(alias = "companiesPriceList")]
        prices: Vec<QuoteRow>,
    },
    Single(QuoteRow),
}

#[derive(Debug, Deserialize)]
struct QuoteRow {
    symbol: Symbol,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct ProfileBatchBody {
    #[serde(alias = "companyProfiles")]
    profiles: Vec<ProfileRow>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    symbol: Symbol,
    #[serde(alias = "profile")]
    data: ProfileData,
}

impl ProfileRow {
    fn into_entry(self) -> ProfileEntry {
        let data = self.data;
        ProfileEntry {
            symbol: self.symbol,
            profile: StockProfile {
                company_logo_url: data.image.filter(|url| !url.is_empty()),
                percentage_change: data.changes_percentage,
                absolute_change: data.changes,
                last_dividend: data.last_div,
                sector: data.sector,
                industry: data.industry,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData {
    image: Option<String>,
    #[serde(default, deserialize_with = "text_or_number")]
    changes_percentage: Option<String>,
    changes: Option<Decimal>,
    #[serde(default, deserialize_with = "text_or_number")]
    last_div: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    symbol: Option<Symbol>,
    #[serde(default)]
    historical: Vec<HistoryRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRow {
    date: TradingDate,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    change_percent: Decimal,
    vwap: Decimal,
}

impl HistoryRow {
    fn into_moment(self) -> HistoricalMoment {
        HistoricalMoment {
            date: self.date,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume.trunc().to_u64().unwrap_or_default(),
            change_percent: self.change_percent,
            vwap: self.vwap,
        }
    }
}

/// Provider fields that arrive either as strings or as bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected text or number, found {other}"
        ))),
    }
}
