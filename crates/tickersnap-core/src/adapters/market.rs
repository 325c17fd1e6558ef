//! Market-level lookups keyed by [`MarketId`] instead of a symbol.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use crate::adapters::EndpointAdapter;
use crate::decode::{DecodeError, DecodedTree};
use crate::normalize::{
    normalize_fields, optional, to_decimal, to_text, FieldKind, FieldPolicy, FieldSpec,
    NormalizeError, PercentScale,
};
use crate::transport::{EndpointKind, FetchRequest};
use crate::{AdapterError, MarketId, MarketStatus, MarketSummary, MarketSummaryItem, MarketTimezone};

const SUMMARY_QUERY_FIELDS: &str =
    "shortName,regularMarketPrice,regularMarketChange,regularMarketChangePercent";

/// Opening hours and state of one market.
#[derive(Debug, Clone)]
pub struct MarketStatusAdapter {
    market: MarketId,
}

impl MarketStatusAdapter {
    pub fn new(market: MarketId) -> Self {
        Self { market }
    }
}

impl EndpointAdapter for MarketStatusAdapter {
    type Output = MarketStatus;

    fn endpoint(&self) -> EndpointKind {
        EndpointKind::MarketTime
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::for_market(EndpointKind::MarketTime, self.market.clone())
            .with_param("formatted", "true")
            .with_param("key", "finance")
            .with_param("lang", "en-US")
            .with_param("region", self.market.region())
    }

    fn adapt(&self, tree: &DecodedTree) -> Result<MarketStatus, AdapterError> {
        let endpoint = self.endpoint();
        let markets = tree
            .path("finance.marketTimes")
            .and_then(DecodedTree::as_seq)
            .unwrap_or_default();

        let entry = markets
            .iter()
            .find(|entry| {
                entry
                    .get("id")
                    .and_then(DecodedTree::as_text)
                    .is_some_and(|id| id.eq_ignore_ascii_case(self.market.as_str()))
            })
            .or_else(|| markets.first())
            .and_then(|entry| entry.path("marketTime.0"))
            .ok_or(DecodeError::UnexpectedSchema {
                endpoint,
                marker: "finance.marketTimes[0].marketTime[0]",
                hint: None,
            })?;

        let timezone = optional(entry.path("timezone.0"))
            .map(market_timezone)
            .transpose()?;

        Ok(MarketStatus {
            id: self.market.clone(),
            open: offset_instant(entry.get("open"), "marketTime.open")?,
            close: offset_instant(entry.get("close"), "marketTime.close")?,
            timezone,
            state: optional(entry.get("status"))
                .map(|raw| to_text(raw, "marketTime.status"))
                .transpose()?,
        })
    }
}

/// Instant that keeps the venue's UTC offset.
fn offset_instant(
    raw: Option<&DecodedTree>,
    field: &str,
) -> Result<Option<DateTime<FixedOffset>>, NormalizeError> {
    let Some(raw) = optional(raw) else {
        return Ok(None);
    };
    let text = to_text(raw, field)?;
    DateTime::parse_from_rfc3339(&text)
        .map(Some)
        .map_err(|_| NormalizeError::InvalidDate {
            field: field.to_owned(),
            value: text,
        })
}

fn market_timezone(raw: &DecodedTree) -> Result<MarketTimezone, NormalizeError> {
    let offset_field = "marketTime.timezone.gmtoffset";
    let gmt_offset_ms = match optional(raw.get("gmtoffset")) {
        Some(offset) => {
            let value = to_decimal(offset, offset_field)?;
            value.to_i64().ok_or_else(|| NormalizeError::NotInteger {
                field: offset_field.to_owned(),
                value: value.to_string(),
            })?
        }
        None => 0,
    };
    let text = |key: &str| {
        optional(raw.get(key))
            .map(|value| to_text(value, key))
            .transpose()
    };

    Ok(MarketTimezone {
        gmt_offset_ms,
        short: text("short")?,
        long: text("$text")?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SummaryField {
    Symbol,
    ShortName,
    FullExchangeName,
    MarketState,
    QuoteType,
    Price,
    Change,
    ChangePercent,
    PreviousClose,
    MarketTime,
    SourceInterval,
    DataDelay,
}

const SUMMARY_FIELDS: &[FieldSpec<SummaryField>] = &[
    FieldSpec::new(SummaryField::Symbol, "symbol", FieldKind::Text),
    FieldSpec::new(SummaryField::ShortName, "shortName", FieldKind::Text),
    FieldSpec::new(SummaryField::FullExchangeName, "fullExchangeName", FieldKind::Text),
    FieldSpec::new(SummaryField::MarketState, "marketState", FieldKind::Text),
    FieldSpec::new(SummaryField::QuoteType, "quoteType", FieldKind::Text),
    FieldSpec::new(SummaryField::Price, "regularMarketPrice", FieldKind::Price),
    FieldSpec::new(SummaryField::Change, "regularMarketChange", FieldKind::Decimal),
    FieldSpec::new(
        SummaryField::ChangePercent,
        "regularMarketChangePercent",
        FieldKind::Percent(PercentScale::PercentPoints),
    ),
    FieldSpec::new(
        SummaryField::PreviousClose,
        "regularMarketPreviousClose",
        FieldKind::Price,
    ),
    FieldSpec::new(SummaryField::MarketTime, "regularMarketTime", FieldKind::Instant),
    FieldSpec::new(SummaryField::SourceInterval, "sourceInterval", FieldKind::Count),
    FieldSpec::new(SummaryField::DataDelay, "exchangeDataDelayedBy", FieldKind::Count),
];

/// Headline indices of one market, keyed by exchange code.
#[derive(Debug, Clone)]
pub struct MarketSummaryAdapter {
    market: MarketId,
}

impl MarketSummaryAdapter {
    pub fn new(market: MarketId) -> Self {
        Self { market }
    }
}

impl EndpointAdapter for MarketSummaryAdapter {
    type Output = MarketSummary;

    fn endpoint(&self) -> EndpointKind {
        EndpointKind::MarketSummary
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::for_market(EndpointKind::MarketSummary, self.market.clone())
            .with_param("fields", SUMMARY_QUERY_FIELDS)
            .with_param("formatted", "false")
            .with_param("lang", "en-US")
            .with_param("region", self.market.region())
    }

    fn adapt(&self, tree: &DecodedTree) -> Result<MarketSummary, AdapterError> {
        let endpoint = self.endpoint();
        let results = tree
            .path("marketSummaryResponse.result")
            .and_then(DecodedTree::as_seq)
            .unwrap_or_default();

        let mut items: BTreeMap<String, MarketSummaryItem> = BTreeMap::new();
        for (index, node) in results.iter().enumerate() {
            let exchange = optional(node.get("exchange"))
                .and_then(DecodedTree::as_text)
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .ok_or_else(|| {
                    DecodeError::malformed(endpoint, format!("result {index} has no exchange code"))
                })?;

            if items.contains_key(exchange) {
                warn!(market = %self.market, exchange, "duplicate exchange in market summary");
                continue;
            }

            let fields = normalize_fields(node, SUMMARY_FIELDS, FieldPolicy::Strict)?;
            let item = MarketSummaryItem {
                exchange: exchange.to_owned(),
                symbol: fields.text(SummaryField::Symbol),
                short_name: fields.text(SummaryField::ShortName),
                full_exchange_name: fields.text(SummaryField::FullExchangeName),
                market_state: fields.text(SummaryField::MarketState),
                quote_type: fields.text(SummaryField::QuoteType),
                price: fields.decimal(SummaryField::Price),
                change: fields.decimal(SummaryField::Change),
                change_percent: fields.fraction(SummaryField::ChangePercent),
                previous_close: fields.decimal(SummaryField::PreviousClose),
                market_time: fields.instant(SummaryField::MarketTime),
                source_interval_secs: fields.count(SummaryField::SourceInterval),
                data_delay_secs: fields.count(SummaryField::DataDelay),
            };
            items.insert(exchange.to_owned(), item);
        }

        debug!(market = %self.market, items = items.len(), "market summary adapted");
        Ok(MarketSummary::new(self.market.clone(), items))
    }
}
