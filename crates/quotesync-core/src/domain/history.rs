use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Symbol, TradingDate, ValidationError};

/// One trading day of price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalMoment {
    pub date: TradingDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    pub change_percent: Decimal,
    pub vwap: Decimal,
}

/// Daily history for one symbol, ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    pub symbol: Symbol,
    pub moments: Vec<HistoricalMoment>,
}

impl PriceHistory {
    pub fn new(symbol: Symbol, mut moments: Vec<HistoricalMoment>) -> Self {
        moments.sort_by_key(|moment| moment.date);
        Self { symbol, moments }
    }

    /// The trailing `window` ending at `today`, as a new history.
    pub fn within(&self, window: HistoryWindow, today: TradingDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            moments: window.slice(&self.moments, today).to_vec(),
        }
    }
}

/// Trailing ranges offered by the detail chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryWindow {
    ThreeMonths,
    SixMonths,
    OneYear,
    #[default]
    ThreeYears,
}

impl HistoryWindow {
    pub const ALL: [Self; 4] = [
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::ThreeYears,
    ];

    pub const fn months(self) -> u32 {
        match self {
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::OneYear => 12,
            Self::ThreeYears => 36,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::OneYear => "1y",
            Self::ThreeYears => "3y",
        }
    }

    pub fn start_date(self, today: TradingDate) -> TradingDate {
        today.months_back(self.months())
    }

    /// Moments dated on or after the window start. `moments` must be ascending.
    pub fn slice(self, moments: &[HistoricalMoment], today: TradingDate) -> &[HistoricalMoment] {
        let start = self.start_date(today);
        let first = moments.partition_point(|moment| moment.date < start);
        &moments[first..]
    }
}

impl Display for HistoryWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryWindow {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|window| window.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidHistoryWindow {
                value: value.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moment(date: &str) -> HistoricalMoment {
        HistoricalMoment {
            date: TradingDate::parse(date).expect("date"),
            open: Decimal::ONE,
            high: Decimal::ONE,
            low: Decimal::ONE,
            close: Decimal::ONE,
            volume: 10,
            change_percent: Decimal::ZERO,
            vwap: Decimal::ONE,
        }
    }

    #[test]
    fn new_history_sorts_ascending() {
        let history = PriceHistory::new(
            Symbol::parse("AAPL").expect("symbol"),
            vec![moment("2020-02-20"), moment("2019-01-02"), moment("2020-01-15")],
        );

        let dates: Vec<String> = history.moments.iter().map(|m| m.date.to_string()).collect();
        assert_eq!(dates, vec!["2019-01-02", "2020-01-15", "2020-02-20"]);
    }

    #[test]
    fn windows_keep_only_trailing_moments() {
        let today = TradingDate::parse("2020-02-21").expect("date");
        let moments = vec![
            moment("2017-01-03"),
            moment("2019-01-02"),
            moment("2019-09-03"),
            moment("2019-12-02"),
            moment("2020-02-20"),
        ];

        assert_eq!(HistoryWindow::ThreeMonths.slice(&moments, today).len(), 2);
        assert_eq!(HistoryWindow::SixMonths.slice(&moments, today).len(), 3);
        assert_eq!(HistoryWindow::OneYear.slice(&moments, today).len(), 3);
        assert_eq!(HistoryWindow::ThreeYears.slice(&moments, today).len(), 4);
    }

    #[test]
    fn window_start_is_inclusive() {
        let today = TradingDate::parse("2020-02-21").expect("date");
        let moments = vec![moment("2019-11-20"), moment("2019-11-21")];

        let slice = HistoryWindow::ThreeMonths.slice(&moments, today);
        assert_eq!(slice.len(), 1);
        assert_eq!(slice[0].date.to_string(), "2019-11-21");
    }

    #[test]
    fn parses_window_labels() {
        assert_eq!("1Y".parse::<HistoryWindow>(), Ok(HistoryWindow::OneYear));
        assert!(matches!(
            "2w".parse::<HistoryWindow>(),
            Err(ValidationError::InvalidHistoryWindow { .. })
        ));
    }
}
