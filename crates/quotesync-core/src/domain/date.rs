use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

use crate::ValidationError;

const DAY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Calendar day in UTC, written as `YYYY-MM-DD` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDate(Date);

impl TradingDate {
    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Date::parse(input.trim(), DAY_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: input.to_owned(),
            })
    }

    pub const fn from_date(date: Date) -> Self {
        Self(date)
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }

    /// The same day `months` calendar months earlier, clamped to the last day of
    /// a shorter target month (May 31 minus three months is Feb 28/29).
    pub fn months_back(self, months: u32) -> Self {
        let date = self.0;
        let index = date.year() * 12 + i32::from(u8::from(date.month())) - 1 - months as i32;
        let year = index.div_euclid(12);
        let month = match Month::try_from(index.rem_euclid(12) as u8 + 1) {
            Ok(month) => month,
            Err(_) => return self,
        };

        (1..=date.day())
            .rev()
            .find_map(|day| Date::from_calendar_date(year, month, day).ok())
            .map_or(self, Self)
    }

    pub fn format(self) -> String {
        self.0
            .format(DAY_FORMAT)
            .unwrap_or_else(|_| self.0.to_string())
    }
}

impl Display for TradingDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

impl Serialize for TradingDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for TradingDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_iso_days() {
        let day = TradingDate::parse("2020-02-21").expect("date");
        assert_eq!(day.to_string(), "2020-02-21");
    }

    #[test]
    fn rejects_timestamps_and_garbage() {
        assert!(matches!(
            TradingDate::parse("2020-02-21T00:00:00Z"),
            Err(ValidationError::InvalidDate { .. })
        ));
        assert!(TradingDate::parse("21/02/2020").is_err());
    }

    #[test]
    fn months_back_crosses_year_boundary() {
        let day = TradingDate::parse("2021-02-15").expect("date");
        assert_eq!(day.months_back(3).to_string(), "2020-11-15");
        assert_eq!(day.months_back(36).to_string(), "2018-02-15");
    }

    #[test]
    fn months_back_clamps_to_month_end() {
        let day = TradingDate::parse("2020-05-31").expect("date");
        assert_eq!(day.months_back(3).to_string(), "2020-02-29");
        assert_eq!(day.months_back(1).to_string(), "2020-04-30");
    }
}
