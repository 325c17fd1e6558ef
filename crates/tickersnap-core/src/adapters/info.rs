use tracing::debug;

use crate::adapters::EndpointAdapter;
use crate::decode::{DecodeError, DecodedTree};
use crate::normalize::{normalize_fields, FieldKind, FieldPolicy, FieldSpec, PercentScale};
use crate::transport::{EndpointKind, FetchRequest};
use crate::{AdapterError, CompanyInfo, InfoField, Symbol};

/// quoteSummary modules requested for [`CompanyInfo`].
pub const INFO_MODULES: &str =
    "assetProfile,summaryDetail,defaultKeyStatistics,financialData,price,quoteType";

const FRACTION: FieldKind = FieldKind::Percent(PercentScale::Fraction);

// Repeated keys are fallback sources, tried in order.
const INFO_FIELDS: &[FieldSpec<InfoField>] = &[
    FieldSpec::new(InfoField::LongName, "price.longName", FieldKind::Text),
    FieldSpec::new(InfoField::LongName, "quoteType.longName", FieldKind::Text),
    FieldSpec::new(InfoField::ShortName, "price.shortName", FieldKind::Text),
    FieldSpec::new(InfoField::ShortName, "quoteType.shortName", FieldKind::Text),
    FieldSpec::new(InfoField::Sector, "assetProfile.sector", FieldKind::Text),
    FieldSpec::new(InfoField::Industry, "assetProfile.industry", FieldKind::Text),
    FieldSpec::new(InfoField::Country, "assetProfile.country", FieldKind::Text),
    FieldSpec::new(InfoField::City, "assetProfile.city", FieldKind::Text),
    FieldSpec::new(InfoField::Website, "assetProfile.website", FieldKind::Text),
    FieldSpec::new(
        InfoField::FullTimeEmployees,
        "assetProfile.fullTimeEmployees",
        FieldKind::Count,
    ),
    FieldSpec::new(InfoField::Currency, "price.currency", FieldKind::Text),
    FieldSpec::new(InfoField::Currency, "summaryDetail.currency", FieldKind::Text),
    FieldSpec::new(InfoField::Exchange, "price.exchangeName", FieldKind::Text),
    FieldSpec::new(InfoField::Exchange, "quoteType.exchange", FieldKind::Text),
    FieldSpec::new(InfoField::QuoteType, "quoteType.quoteType", FieldKind::Text),
    FieldSpec::new(InfoField::QuoteType, "price.quoteType", FieldKind::Text),
    FieldSpec::new(InfoField::MarketCap, "price.marketCap", FieldKind::Decimal),
    FieldSpec::new(InfoField::MarketCap, "summaryDetail.marketCap", FieldKind::Decimal),
    FieldSpec::new(
        InfoField::EnterpriseValue,
        "defaultKeyStatistics.enterpriseValue",
        FieldKind::Decimal,
    ),
    FieldSpec::new(InfoField::TrailingPe, "summaryDetail.trailingPE", FieldKind::Decimal),
    FieldSpec::new(InfoField::ForwardPe, "summaryDetail.forwardPE", FieldKind::Decimal),
    FieldSpec::new(InfoField::ForwardPe, "defaultKeyStatistics.forwardPE", FieldKind::Decimal),
    FieldSpec::new(InfoField::PegRatio, "defaultKeyStatistics.pegRatio", FieldKind::Decimal),
    FieldSpec::new(
        InfoField::PriceToBook,
        "defaultKeyStatistics.priceToBook",
        FieldKind::Decimal,
    ),
    FieldSpec::new(InfoField::Beta, "summaryDetail.beta", FieldKind::Decimal),
    FieldSpec::new(InfoField::Beta, "defaultKeyStatistics.beta", FieldKind::Decimal),
    FieldSpec::new(InfoField::TotalRevenue, "financialData.totalRevenue", FieldKind::Decimal),
    FieldSpec::new(InfoField::ProfitMargins, "financialData.profitMargins", FRACTION),
    FieldSpec::new(InfoField::ProfitMargins, "defaultKeyStatistics.profitMargins", FRACTION),
    FieldSpec::new(InfoField::GrossMargins, "financialData.grossMargins", FRACTION),
    FieldSpec::new(InfoField::OperatingMargins, "financialData.operatingMargins", FRACTION),
    FieldSpec::new(InfoField::RevenueGrowth, "financialData.revenueGrowth", FRACTION),
    FieldSpec::new(InfoField::DividendYield, "summaryDetail.dividendYield", FRACTION),
    FieldSpec::new(
        InfoField::HeldByInsiders,
        "defaultKeyStatistics.heldPercentInsiders",
        FRACTION,
    ),
    FieldSpec::new(
        InfoField::HeldByInstitutions,
        "defaultKeyStatistics.heldPercentInstitutions",
        FRACTION,
    ),
    FieldSpec::new(
        InfoField::RecommendationKey,
        "financialData.recommendationKey",
        FieldKind::Text,
    ),
    FieldSpec::new(
        InfoField::RecommendationMean,
        "financialData.recommendationMean",
        FieldKind::Decimal,
    ),
    FieldSpec::new(
        InfoField::AnalystOpinions,
        "financialData.numberOfAnalystOpinions",
        FieldKind::Count,
    ),
    FieldSpec::new(
        InfoField::TargetMeanPrice,
        "financialData.targetMeanPrice",
        FieldKind::Price,
    ),
];

/// Company profile and key statistics of one symbol.
///
/// Lenient: an attribute that fails conversion is dropped and reported in
/// [`CompanyInfo::rejected`] instead of failing the slot.
#[derive(Debug, Clone)]
pub struct InfoAdapter {
    symbol: Symbol,
}

impl InfoAdapter {
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol }
    }
}

impl EndpointAdapter for InfoAdapter {
    type Output = CompanyInfo;

    fn endpoint(&self) -> EndpointKind {
        EndpointKind::Info
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::for_symbol(EndpointKind::Info, self.symbol.clone())
            .with_param("modules", INFO_MODULES)
    }

    fn adapt(&self, tree: &DecodedTree) -> Result<CompanyInfo, AdapterError> {
        let endpoint = self.endpoint();
        let result = tree
            .path("quoteSummary.result.0")
            .filter(|node| node.as_map().is_some())
            .ok_or(DecodeError::UnexpectedSchema {
                endpoint,
                marker: "quoteSummary.result[0]",
                hint: None,
            })?;

        let normalized = normalize_fields(result, INFO_FIELDS, FieldPolicy::Lenient)?;
        let rejected: Vec<InfoField> = normalized.rejected.iter().map(|(key, _)| *key).collect();

        debug!(
            symbol = %self.symbol,
            fields = normalized.values.len(),
            rejected = rejected.len(),
            "info adapted"
        );

        Ok(CompanyInfo::new(self.symbol.clone(), normalized.values, rejected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fraction;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn adapt(json: &str) -> Result<CompanyInfo, AdapterError> {
        let tree = DecodedTree::from_json(json.as_bytes()).expect("test json");
        InfoAdapter::new(Symbol::parse("MSFT").expect("symbol")).adapt(&tree)
    }

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).expect("decimal literal")
    }

    #[test]
    fn unconvertible_attribute_is_rejected_not_fatal() {
        let info = adapt(
            r#"{"quoteSummary":{"result":[{
                "assetProfile":{"sector":"Technology","fullTimeEmployees":"lots"},
                "summaryDetail":{"trailingPE":{"raw":35.2,"fmt":"35.20"},"dividendYield":{"raw":0.0071,"fmt":"0.71%"}}
            }]}}"#,
        )
        .expect("info");
        assert_eq!(info.sector(), Some("Technology"));
        assert_eq!(info.full_time_employees(), None);
        assert_eq!(info.rejected(), &[InfoField::FullTimeEmployees]);
        assert_eq!(info.trailing_pe(), Some(dec("35.2")));
        assert_eq!(info.dividend_yield(), Some(Fraction::new(dec("0.0071"))));
    }

    #[test]
    fn falls_back_to_second_source() {
        let info = adapt(
            r#"{"quoteSummary":{"result":[{
                "price":{"shortName":"Microsoft"},
                "quoteType":{"longName":"Microsoft Corporation","exchange":"NMS","quoteType":"EQUITY"}
            }]}}"#,
        )
        .expect("info");
        assert_eq!(info.long_name(), Some("Microsoft Corporation"));
        assert_eq!(info.short_name(), Some("Microsoft"));
        assert_eq!(info.exchange(), Some("NMS"));
        assert_eq!(info.quote_type(), Some("EQUITY"));
    }

    #[test]
    fn empty_modules_give_empty_info() {
        let info = adapt(r#"{"quoteSummary":{"result":[{}]}}"#).expect("info");
        assert!(info.fields().is_empty());
        assert!(info.rejected().is_empty());
    }

    #[test]
    fn missing_result_is_unexpected_schema() {
        let err = adapt(r#"{"quoteSummary":{"result":[]}}"#).expect_err("must fail");
        assert!(matches!(
            err,
            AdapterError::Decode(DecodeError::UnexpectedSchema { .. })
        ));
    }

    #[test]
    fn request_lists_modules() {
        let adapter = InfoAdapter::new(Symbol::parse("MSFT").expect("symbol"));
        assert_eq!(adapter.request().param("modules"), Some(INFO_MODULES));
    }
}
