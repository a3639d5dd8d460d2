use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Longest ticker accepted, share-class suffix included.
const MAX_TICKER_LEN: usize = 15;

/// Uppercase exchange ticker such as `AAPL` or `BRK.B`.
///
/// This is the identity of a [`StockRecord`](crate::StockRecord): cache and
/// store are keyed by it, and its `Ord` is the cache enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Trim, uppercase and validate a ticker.
    ///
    /// Tickers start with a letter and otherwise hold letters, digits and the
    /// `.`/`-` class separators.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let ticker = input.trim().to_ascii_uppercase();

        let mut chars = ticker.chars().enumerate();
        match chars.next() {
            None => return Err(ValidationError::EmptySymbol),
            Some((_, first)) if !first.is_ascii_alphabetic() => {
                return Err(ValidationError::SymbolInvalidStart { ch: first })
            }
            Some(_) => {}
        }
        if let Some((index, ch)) =
            chars.find(|(_, ch)| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-')))
        {
            return Err(ValidationError::SymbolInvalidChar { ch, index });
        }
        if ticker.len() > MAX_TICKER_LEN {
            return Err(ValidationError::SymbolTooLong {
                len: ticker.len(),
                max: MAX_TICKER_LEN,
            });
        }

        Ok(Self(ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Comma-joined form used in batch request parameters.
    pub fn join(symbols: &[Symbol]) -> String {
        let mut joined = String::new();
        for (position, symbol) in symbols.iter().enumerate() {
            if position > 0 {
                joined.push(',');
            }
            joined.push_str(symbol.as_str());
        }
        joined
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}
