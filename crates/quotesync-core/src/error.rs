use thiserror::Error;

use crate::remote::ApiError;
use crate::store::StoreError;
use crate::{StockRecord, Symbol};

/// Input validation errors for domain values and configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("history window must be one of 3m, 6m, 1y, 3y: '{value}'")]
    InvalidHistoryWindow { value: String },

    #[error("configuration value {key}='{value}' is invalid: {reason}")]
    InvalidConfig {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Failure of a sync engine operation.
///
/// Remote and store failures never escape as panics; callers always get one of
/// these, and roster/quote refreshes attach the cached records they fell back to.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("serving {} cached records after remote failure: {cause}", cached.len())]
    StaleFallback {
        cached: Vec<StockRecord>,
        cause: ApiError,
    },

    #[error("symbol '{0}' is not in the local cache")]
    UnknownSymbol(Symbol),
}

impl SyncError {
    /// Records served instead of fresh data, if this is a fallback.
    pub fn stale_records(&self) -> Option<&[StockRecord]> {
        match self {
            Self::StaleFallback { cached, .. } => Some(cached.as_slice()),
            _ => None,
        }
    }

    /// The underlying remote failure, when there is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) | Self::StaleFallback { cause: error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Api(error) | Self::StaleFallback { cause: error, .. } => error.code(),
            Self::Store(error) => error.code(),
            Self::UnknownSymbol(_) => "sync.unknown_symbol",
        }
    }
}
