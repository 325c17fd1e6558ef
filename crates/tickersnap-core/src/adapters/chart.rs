//! Pieces shared by the chart-backed adapters (history, dividends, splits).

use rust_decimal::prelude::ToPrimitive;

use crate::decode::{DecodeError, DecodedTree};
use crate::normalize::{optional, to_decimal, to_text};
use crate::transport::{EndpointKind, FetchRequest};
use crate::{validate_currency_code, AdapterError, ExchangeTimezone, Symbol};

/// Chart request for the full event history of `symbol`.
pub(crate) fn events_request(endpoint: EndpointKind, symbol: Symbol, events: &str) -> FetchRequest {
    FetchRequest::for_symbol(endpoint, symbol)
        .with_param("range", "max")
        .with_param("interval", "1d")
        .with_param("events", events)
}

/// First entry of `chart.result`.
pub(crate) fn chart_result(
    tree: &DecodedTree,
    endpoint: EndpointKind,
) -> Result<&DecodedTree, DecodeError> {
    let result = tree
        .path("chart.result.0")
        .filter(|node| !node.is_null())
        .ok_or(DecodeError::UnexpectedSchema {
            endpoint,
            marker: "chart.result[0]",
            hint: None,
        })?;
    if result.as_map().is_none() {
        return Err(DecodeError::malformed(
            endpoint,
            format!("chart.result[0] is {}, expected object", result.kind_name()),
        ));
    }
    Ok(result)
}

/// Venue details from `chart.result[0].meta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChartMeta {
    pub timezone: ExchangeTimezone,
    pub currency: Option<String>,
}

pub(crate) fn chart_meta(
    result: &DecodedTree,
    endpoint: EndpointKind,
) -> Result<ChartMeta, AdapterError> {
    let meta = result.get("meta");
    let zone_name = optional(meta.and_then(|m| m.get("exchangeTimezoneName")))
        .and_then(DecodedTree::as_text);
    let gmt_offset = optional(meta.and_then(|m| m.get("gmtoffset")))
        .and_then(|raw| to_decimal(raw, "meta.gmtoffset").ok())
        .and_then(|offset| offset.to_i64());

    Ok(ChartMeta {
        timezone: ExchangeTimezone::resolve(zone_name, gmt_offset),
        currency: currency_field(meta.and_then(|m| m.get("currency")), "meta.currency", endpoint)?,
    })
}

/// Optional currency code; a present but invalid code fails the record.
pub(crate) fn currency_field(
    raw: Option<&DecodedTree>,
    field: &str,
    endpoint: EndpointKind,
) -> Result<Option<String>, AdapterError> {
    let Some(raw) = optional(raw) else {
        return Ok(None);
    };
    let text = to_text(raw, field)?;
    validate_currency_code(&text)
        .map(Some)
        .map_err(|error| DecodeError::malformed(endpoint, format!("{field}: {error}")).into())
}

/// Entries of `events.<name>`; a missing block means no events.
pub(crate) fn event_entries<'a>(
    result: &'a DecodedTree,
    name: &str,
    endpoint: EndpointKind,
) -> Result<Vec<(&'a str, &'a DecodedTree)>, DecodeError> {
    let Some(block) = optional(result.get("events").and_then(|events| events.get(name))) else {
        return Ok(Vec::new());
    };
    let entries = block.as_map().ok_or_else(|| {
        DecodeError::malformed(
            endpoint,
            format!("events.{name} is {}, expected object", block.kind_name()),
        )
    })?;
    Ok(entries
        .iter()
        .map(|(key, value)| (key.as_str(), value))
        .collect())
}
