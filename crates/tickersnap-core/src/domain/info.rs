use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Fraction, Symbol};

/// Company attributes exposed by [`CompanyInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoField {
    LongName,
    ShortName,
    Sector,
    Industry,
    Country,
    City,
    Website,
    FullTimeEmployees,
    Currency,
    Exchange,
    QuoteType,
    MarketCap,
    EnterpriseValue,
    TrailingPe,
    ForwardPe,
    PegRatio,
    PriceToBook,
    Beta,
    TotalRevenue,
    ProfitMargins,
    GrossMargins,
    OperatingMargins,
    RevenueGrowth,
    DividendYield,
    HeldByInsiders,
    HeldByInstitutions,
    RecommendationKey,
    RecommendationMean,
    AnalystOpinions,
    TargetMeanPrice,
}

impl InfoField {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LongName => "long_name",
            Self::ShortName => "short_name",
            Self::Sector => "sector",
            Self::Industry => "industry",
            Self::Country => "country",
            Self::City => "city",
            Self::Website => "website",
            Self::FullTimeEmployees => "full_time_employees",
            Self::Currency => "currency",
            Self::Exchange => "exchange",
            Self::QuoteType => "quote_type",
            Self::MarketCap => "market_cap",
            Self::EnterpriseValue => "enterprise_value",
            Self::TrailingPe => "trailing_pe",
            Self::ForwardPe => "forward_pe",
            Self::PegRatio => "peg_ratio",
            Self::PriceToBook => "price_to_book",
            Self::Beta => "beta",
            Self::TotalRevenue => "total_revenue",
            Self::ProfitMargins => "profit_margins",
            Self::GrossMargins => "gross_margins",
            Self::OperatingMargins => "operating_margins",
            Self::RevenueGrowth => "revenue_growth",
            Self::DividendYield => "dividend_yield",
            Self::HeldByInsiders => "held_by_insiders",
            Self::HeldByInstitutions => "held_by_institutions",
            Self::RecommendationKey => "recommendation_key",
            Self::RecommendationMean => "recommendation_mean",
            Self::AnalystOpinions => "analyst_opinions",
            Self::TargetMeanPrice => "target_mean_price",
        }
    }
}

impl Display for InfoField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical value produced by the field normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Count(u64),
    Decimal(Decimal),
    Fraction(Fraction),
    Instant(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub const fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_fraction(&self) -> Option<Fraction> {
        match self {
            Self::Fraction(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(value) => Some(*value),
            _ => None,
        }
    }
}

/// Company profile and key statistics.
///
/// Every attribute is independently optional. Attributes the provider sent
/// but that failed normalization are absent and listed in [`rejected`].
///
/// [`rejected`]: CompanyInfo::rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub symbol: Symbol,
    fields: BTreeMap<InfoField, FieldValue>,
    rejected: Vec<InfoField>,
}

impl CompanyInfo {
    pub fn new(
        symbol: Symbol,
        fields: BTreeMap<InfoField, FieldValue>,
        mut rejected: Vec<InfoField>,
    ) -> Self {
        rejected.sort_unstable();
        rejected.dedup();
        Self {
            symbol,
            fields,
            rejected,
        }
    }

    pub fn get(&self, field: InfoField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn fields(&self) -> &BTreeMap<InfoField, FieldValue> {
        &self.fields
    }

    pub fn rejected(&self) -> &[InfoField] {
        &self.rejected
    }

    pub fn text(&self, field: InfoField) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn decimal(&self, field: InfoField) -> Option<Decimal> {
        self.get(field).and_then(FieldValue::as_decimal)
    }

    pub fn count(&self, field: InfoField) -> Option<u64> {
        self.get(field).and_then(FieldValue::as_count)
    }

    pub fn fraction(&self, field: InfoField) -> Option<Fraction> {
        self.get(field).and_then(FieldValue::as_fraction)
    }

    pub fn long_name(&self) -> Option<&str> {
        self.text(InfoField::LongName)
    }

    pub fn short_name(&self) -> Option<&str> {
        self.text(InfoField::ShortName)
    }

    pub fn sector(&self) -> Option<&str> {
        self.text(InfoField::Sector)
    }

    pub fn industry(&self) -> Option<&str> {
        self.text(InfoField::Industry)
    }

    pub fn country(&self) -> Option<&str> {
        self.text(InfoField::Country)
    }

    pub fn city(&self) -> Option<&str> {
        self.text(InfoField::City)
    }

    pub fn website(&self) -> Option<&str> {
        self.text(InfoField::Website)
    }

    pub fn full_time_employees(&self) -> Option<u64> {
        self.count(InfoField::FullTimeEmployees)
    }

    pub fn currency(&self) -> Option<&str> {
        self.text(InfoField::Currency)
    }

    pub fn exchange(&self) -> Option<&str> {
        self.text(InfoField::Exchange)
    }

    pub fn quote_type(&self) -> Option<&str> {
        self.text(InfoField::QuoteType)
    }

    pub fn market_cap(&self) -> Option<Decimal> {
        self.decimal(InfoField::MarketCap)
    }

    pub fn enterprise_value(&self) -> Option<Decimal> {
        self.decimal(InfoField::EnterpriseValue)
    }

    pub fn trailing_pe(&self) -> Option<Decimal> {
        self.decimal(InfoField::TrailingPe)
    }

    pub fn forward_pe(&self) -> Option<Decimal> {
        self.decimal(InfoField::ForwardPe)
    }

    pub fn peg_ratio(&self) -> Option<Decimal> {
        self.decimal(InfoField::PegRatio)
    }

    pub fn price_to_book(&self) -> Option<Decimal> {
        self.decimal(InfoField::PriceToBook)
    }

    pub fn beta(&self) -> Option<Decimal> {
        self.decimal(InfoField::Beta)
    }

    pub fn total_revenue(&self) -> Option<Decimal> {
        self.decimal(InfoField::TotalRevenue)
    }

    pub fn profit_margins(&self) -> Option<Fraction> {
        self.fraction(InfoField::ProfitMargins)
    }

    pub fn gross_margins(&self) -> Option<Fraction> {
        self.fraction(InfoField::GrossMargins)
    }

    pub fn operating_margins(&self) -> Option<Fraction> {
        self.fraction(InfoField::OperatingMargins)
    }

    pub fn revenue_growth(&self) -> Option<Fraction> {
        self.fraction(InfoField::RevenueGrowth)
    }

    pub fn dividend_yield(&self) -> Option<Fraction> {
        self.fraction(InfoField::DividendYield)
    }

    pub fn held_by_insiders(&self) -> Option<Fraction> {
        self.fraction(InfoField::HeldByInsiders)
    }

    pub fn held_by_institutions(&self) -> Option<Fraction> {
        self.fraction(InfoField::HeldByInstitutions)
    }

    pub fn recommendation_key(&self) -> Option<&str> {
        self.text(InfoField::RecommendationKey)
    }

    pub fn recommendation_mean(&self) -> Option<Decimal> {
        self.decimal(InfoField::RecommendationMean)
    }

    pub fn analyst_opinions(&self) -> Option<u64> {
        self.count(InfoField::AnalystOpinions)
    }

    pub fn target_mean_price(&self) -> Option<Decimal> {
        self.decimal(InfoField::TargetMeanPrice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_respect_value_kind() {
        let mut fields = BTreeMap::new();
        fields.insert(InfoField::Sector, FieldValue::Text(String::from("Technology")));
        fields.insert(InfoField::FullTimeEmployees, FieldValue::Count(161_000));
        let info = CompanyInfo::new(Symbol::parse("AAPL").expect("symbol"), fields, Vec::new());

        assert_eq!(info.sector(), Some("Technology"));
        assert_eq!(info.full_time_employees(), Some(161_000));
        assert_eq!(info.decimal(InfoField::Sector), None);
        assert_eq!(info.industry(), None);
    }

    #[test]
    fn rejected_list_is_sorted_and_unique() {
        let info = CompanyInfo::new(
            Symbol::parse("AAPL").expect("symbol"),
            BTreeMap::new(),
            vec![InfoField::Beta, InfoField::MarketCap, InfoField::Beta],
        );
        assert_eq!(info.rejected(), &[InfoField::MarketCap, InfoField::Beta]);
    }

    #[test]
    fn info_field_serializes_as_snake_case() {
        let json = serde_json::to_string(&InfoField::HeldByInstitutions).expect("serialize");
        assert_eq!(json, "\"held_by_institutions\"");
        assert_eq!(InfoField::TrailingPe.to_string(), "trailing_pe");
    }
}
