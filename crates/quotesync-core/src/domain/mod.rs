//! # Domain Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated ticker, the record identity |
//! | [`StockRecord`] | Cached/persisted stock with locally owned flags |
//! | [`StockProfile`] | Enrichment fields from the profile endpoint |
//! | [`HistoricalMoment`] | One day of OHLC history |
//! | [`HistoryWindow`] | Trailing chart ranges (3m, 6m, 1y, 3y) |
//! | [`TradingDate`] | UTC calendar day, `YYYY-MM-DD` |

mod date;
mod history;
mod stock;
mod symbol;

pub use date::TradingDate;
pub use history::{HistoricalMoment, HistoryWindow, PriceHistory};
pub use stock::{StockProfile, StockRecord};
pub use symbol::Symbol;
