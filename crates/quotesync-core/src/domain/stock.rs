use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Enrichment fields delivered by the profile endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockProfile {
    pub company_logo_url: Option<String>,
    /// Signed change as the provider formats it, e.g. `"(+1.23%)"`.
    pub percentage_change: Option<String>,
    pub absolute_change: Option<Decimal>,
    pub last_dividend: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

/// One tradable stock as shown to the user.
///
/// Identity is the symbol alone: two records with the same symbol compare equal
/// whatever their other fields hold. `is_favorite`, `has_profile_data` and the
/// profile fields are owned locally and survive partial remote updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    pub symbol: Symbol,
    pub name: String,
    pub price: Decimal,
    pub company_logo_url: Option<String>,
    pub percentage_change: Option<String>,
    pub absolute_change: Option<Decimal>,
    pub last_dividend: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub is_favorite: bool,
    pub has_profile_data: bool,
}

impl StockRecord {
    /// A roster-shaped record: no profile, not a favorite.
    pub fn new(symbol: Symbol, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            symbol,
            name: name.into(),
            price,
            company_logo_url: None,
            percentage_change: None,
            absolute_change: None,
            last_dividend: None,
            sector: None,
            industry: None,
            is_favorite: false,
            has_profile_data: false,
        }
    }

    pub fn profile(&self) -> StockProfile {
        StockProfile {
            company_logo_url: self.company_logo_url.clone(),
            percentage_change: self.percentage_change.clone(),
            absolute_change: self.absolute_change,
            last_dividend: self.last_dividend.clone(),
            sector: self.sector.clone(),
            industry: self.industry.clone(),
        }
    }

    /// Overwrite the profile fields and mark the record as enriched.
    pub fn apply_profile(&mut self, profile: StockProfile) {
        self.company_logo_url = profile.company_logo_url;
        self.percentage_change = profile.percentage_change;
        self.absolute_change = profile.absolute_change;
        self.last_dividend = profile.last_dividend;
        self.sector = profile.sector;
        self.industry = profile.industry;
        self.has_profile_data = true;
    }

    pub fn with_profile(mut self, profile: StockProfile) -> Self {
        self.apply_profile(profile);
        self
    }

    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    /// Percentage change without the provider's surrounding parentheses.
    pub fn display_percentage_change(&self) -> Option<&str> {
        self.percentage_change
            .as_deref()
            .map(|value| value.trim_matches(|ch| ch == '(' || ch == ')'))
    }

    pub fn is_percentage_change_positive(&self) -> bool {
        self.display_percentage_change()
            .is_some_and(|value| value.starts_with('+'))
    }
}

impl PartialEq for StockRecord {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for StockRecord {}

impl Hash for StockRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(symbol: &str, price: i64) -> StockRecord {
        StockRecord::new(
            Symbol::parse(symbol).expect("symbol"),
            symbol,
            Decimal::new(price, 0),
        )
    }

    #[test]
    fn equality_is_by_symbol_only() {
        let cheap = record("AAPL", 1);
        let dear = record("AAPL", 999).favorite(true);

        assert_eq!(cheap, dear);
        assert_ne!(cheap, record("MSFT", 1));

        let set: HashSet<StockRecord> = [cheap, dear].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn applying_a_profile_marks_the_record_enriched() {
        let enriched = record("AAPL", 150).with_profile(StockProfile {
            sector: Some(String::from("Technology")),
            percentage_change: Some(String::from("(+1.25%)")),
            ..StockProfile::default()
        });

        assert!(enriched.has_profile_data);
        assert_eq!(enriched.sector.as_deref(), Some("Technology"));
        assert_eq!(enriched.profile().sector.as_deref(), Some("Technology"));
    }

    #[test]
    fn percentage_change_display_strips_parentheses() {
        let mut up = record("AAPL", 1);
        up.percentage_change = Some(String::from("(+1.25%)"));
        let mut down = record("MSFT", 1);
        down.percentage_change = Some(String::from("(-0.40%)"));

        assert_eq!(up.display_percentage_change(), Some("+1.25%"));
        assert!(up.is_percentage_change_positive());
        assert_eq!(down.display_percentage_change(), Some("-0.40%"));
        assert!(!down.is_percentage_change_positive());
        assert!(!record("GOOG", 1).is_percentage_change_positive());
    }
}
