//! Remote quote/profile API contract.
//!
//! [`RemoteSource`] is the seam between the sync engine and whatever serves
//! stock data. Every call resolves exactly once, either with a fully decoded
//! payload or with an [`ApiError`]; no call retries on its own.
//!
//! | Endpoint | Call | Payload |
//! |----------|------|---------|
//! | Roster | [`RemoteSource::roster`] | [`RosterEntry`] list |
//! | Quotes | [`RemoteSource::quotes`] | [`QuoteEntry`] list |
//! | Profiles | [`RemoteSource::profiles`] | [`ProfileEntry`] list |
//! | History | [`RemoteSource::history`] | [`PriceHistory`] |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PriceHistory, StockProfile, Symbol, TradingDate};

/// Remote endpoint, used for error context and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Roster,
    Quotes,
    Profiles,
    History,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Roster => "roster",
            Self::Quotes => "quotes",
            Self::Profiles => "profiles",
            Self::History => "history",
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a request never produced a usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkFailure {
    /// The device is offline or the host cannot be reached at all.
    NoConnectivity,
    Timeout,
    /// The server answered with a non-success status.
    Status(u16),
    Transport,
}

impl Display for NetworkFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoConnectivity => f.write_str("no connectivity"),
            Self::Timeout => f.write_str("timeout"),
            Self::Status(status) => write!(f, "status {status}"),
            Self::Transport => f.write_str("transport"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("invalid {endpoint} request: {message}")]
    InvalidRequest { endpoint: Endpoint, message: String },

    #[error("{endpoint} request failed ({failure}): {message}")]
    Network {
        endpoint: Endpoint,
        failure: NetworkFailure,
        message: String,
    },

    #[error("could not decode {endpoint} response: {message}")]
    Decoding { endpoint: Endpoint, message: String },
}

impl ApiError {
    pub fn invalid_request(endpoint: Endpoint, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            endpoint,
            message: message.into(),
        }
    }

    pub fn network(endpoint: Endpoint, failure: NetworkFailure, message: impl Into<String>) -> Self {
        Self::Network {
            endpoint,
            failure,
            message: message.into(),
        }
    }

    pub fn decoding(endpoint: Endpoint, message: impl Into<String>) -> Self {
        Self::Decoding {
            endpoint,
            message: message.into(),
        }
    }

    pub const fn endpoint(&self) -> Endpoint {
        match self {
            Self::InvalidRequest { endpoint, .. }
            | Self::Network { endpoint, .. }
            | Self::Decoding { endpoint, .. } => *endpoint,
        }
    }

    pub const fn network_failure(&self) -> Option<NetworkFailure> {
        match self {
            Self::Network { failure, .. } => Some(*failure),
            _ => None,
        }
    }

    pub const fn is_no_connectivity(&self) -> bool {
        matches!(
            self,
            Self::Network {
                failure: NetworkFailure::NoConnectivity,
                ..
            }
        )
    }

    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Being offline is not retryable: the caller falls back to cached data
    /// immediately instead of burning its retry budget.
    pub const fn retryable(&self) -> bool {
        match self {
            Self::Network { failure, .. } => match failure {
                NetworkFailure::NoConnectivity => false,
                NetworkFailure::Timeout | NetworkFailure::Transport => true,
                NetworkFailure::Status(status) => *status == 408 || *status == 429 || *status >= 500,
            },
            Self::InvalidRequest { .. } | Self::Decoding { .. } => false,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "api.invalid_request",
            Self::Network { failure, .. } => match failure {
                NetworkFailure::NoConnectivity => "api.network.no_connectivity",
                NetworkFailure::Timeout => "api.network.timeout",
                NetworkFailure::Status(_) => "api.network.status",
                NetworkFailure::Transport => "api.network.transport",
            },
            Self::Decoding { .. } => "api.decoding",
        }
    }
}

/// One row of the full stock list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub symbol: Symbol,
    pub name: Option<String>,
    pub price: Decimal,
}

/// Latest price for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEntry {
    pub symbol: Symbol,
    pub price: Decimal,
}

/// Enrichment profile for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub symbol: Symbol,
    pub profile: StockProfile,
}

/// Boxed future returned by every [`RemoteSource`] call.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Remote stock data provider.
pub trait RemoteSource: Send + Sync {
    fn roster<'a>(&'a self) -> RemoteFuture<'a, Vec<RosterEntry>>;

    /// Prices for all `symbols` in one request.
    fn quotes<'a>(&'a self, symbols: &'a [Symbol]) -> RemoteFuture<'a, Vec<QuoteEntry>>;

    /// Profiles for one batch of `symbols`. Callers keep batches within the
    /// provider's per-call limit.
    fn profiles<'a>(&'a self, symbols: &'a [Symbol]) -> RemoteFuture<'a, Vec<ProfileEntry>>;

    /// Daily history between `from` and `to`, both inclusive.
    fn history<'a>(
        &'a self,
        symbol: &'a Symbol,
        from: TradingDate,
        to: TradingDate,
    ) -> RemoteFuture<'a, PriceHistory>;
}
