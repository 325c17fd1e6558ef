use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Fraction, ValidationError};

const MARKET_SUFFIX: &str = "_market";

/// Markets with a known region code on the provider side.
pub const PREDEFINED_MARKETS: [&str; 12] = [
    "us_market",
    "gb_market",
    "de_market",
    "fr_market",
    "jp_market",
    "hk_market",
    "cn_market",
    "ca_market",
    "au_market",
    "in_market",
    "kr_market",
    "br_market",
];

/// Market identifier of the form `<region>_market` (`us_market`, `jp_market`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MarketId(String);

impl MarketId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_lowercase();
        let region = normalized.strip_suffix(MARKET_SUFFIX).unwrap_or_default();
        let valid = region.len() == 2 && region.chars().all(|ch| ch.is_ascii_lowercase());
        if !valid {
            return Err(ValidationError::InvalidMarket {
                value: input.trim().to_owned(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn us() -> Self {
        Self(String::from("us_market"))
    }

    pub fn predefined() -> impl Iterator<Item = Self> {
        PREDEFINED_MARKETS
            .into_iter()
            .map(|id| Self(id.to_owned()))
    }

    pub fn is_predefined(&self) -> bool {
        PREDEFINED_MARKETS.contains(&self.0.as_str())
    }

    /// Uppercase region code sent as the `region` query parameter.
    pub fn region(&self) -> String {
        self.0
            .trim_end_matches(MARKET_SUFFIX)
            .to_ascii_uppercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MarketId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MarketId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MarketId> for String {
    fn from(value: MarketId) -> Self {
        value.0
    }
}

/// Timezone block of the markettime payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTimezone {
    /// Offset from GMT in milliseconds.
    pub gmt_offset_ms: i64,
    pub short: Option<String>,
    pub long: Option<String>,
}

/// Trading hours and state of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketStatus {
    pub id: MarketId,
    pub open: Option<DateTime<FixedOffset>>,
    pub close: Option<DateTime<FixedOffset>>,
    pub timezone: Option<MarketTimezone>,
    /// Provider state such as `open`, `closed`, `pre` or `post`.
    pub state: Option<String>,
}

/// One headline index or asset of a market summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSummaryItem {
    pub exchange: String,
    pub symbol: Option<String>,
    pub short_name: Option<String>,
    pub full_exchange_name: Option<String>,
    pub market_state: Option<String>,
    pub quote_type: Option<String>,
    pub price: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Fraction>,
    pub previous_close: Option<Decimal>,
    pub market_time: Option<DateTime<Utc>>,
    pub source_interval_secs: Option<u64>,
    pub data_delay_secs: Option<u64>,
}

/// Headline items of one market keyed by exchange code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub market: MarketId,
    items: BTreeMap<String, MarketSummaryItem>,
}

impl MarketSummary {
    pub fn new(market: MarketId, items: BTreeMap<String, MarketSummaryItem>) -> Self {
        Self { market, items }
    }

    pub fn get(&self, exchange: &str) -> Option<&MarketSummaryItem> {
        self.items.get(exchange)
    }

    pub fn items(&self) -> &BTreeMap<String, MarketSummaryItem> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predefined_and_custom_markets() {
        let us = MarketId::parse(" US_MARKET ").expect("must parse");
        assert_eq!(us, MarketId::us());
        assert!(us.is_predefined());
        assert_eq!(us.region(), "US");

        let custom = MarketId::parse("sg_market").expect("must parse");
        assert!(!custom.is_predefined());
        assert_eq!(custom.region(), "SG");
    }

    #[test]
    fn rejects_malformed_market_ids() {
        for raw in ["us", "usa_market", "u1_market", "_market", ""] {
            let err = MarketId::parse(raw).expect_err("must fail");
            assert!(matches!(err, ValidationError::InvalidMarket { .. }), "{raw}");
        }
    }

    #[test]
    fn predefined_list_has_twelve_markets() {
        assert_eq!(MarketId::predefined().count(), 12);
        assert!(MarketId::predefined().all(|id| id.is_predefined()));
    }
}
