use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::adapters::chart::{chart_meta, chart_result, ChartMeta};
use crate::adapters::EndpointAdapter;
use crate::decode::{DecodeError, DecodedTree};
use crate::normalize::{optional, to_count, to_decimal_price, to_instant, PRICE_SCALE};
use crate::transport::{EndpointKind, FetchRequest};
use crate::{AdapterError, HistoryRequest, PricePoint, PriceSeries, Symbol};

const OHLCV: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// OHLCV history of one symbol.
#[derive(Debug, Clone)]
pub struct HistoryAdapter {
    symbol: Symbol,
    request: HistoryRequest,
}

impl HistoryAdapter {
    pub fn new(symbol: Symbol, request: HistoryRequest) -> Self {
        Self { symbol, request }
    }
}

impl EndpointAdapter for HistoryAdapter {
    type Output = PriceSeries;

    fn endpoint(&self) -> EndpointKind {
        EndpointKind::History
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::for_symbol(EndpointKind::History, self.symbol.clone())
            .with_param("range", self.request.period().as_str())
            .with_param("interval", self.request.interval().as_str())
            .with_param("includePrePost", "false")
    }

    fn adapt(&self, tree: &DecodedTree) -> Result<PriceSeries, AdapterError> {
        let endpoint = self.endpoint();
        let result = chart_result(tree, endpoint)?;
        let meta = chart_meta(result, endpoint)?;

        let timestamps = match optional(result.get("timestamp")) {
            Some(node) => node.as_seq().ok_or_else(|| {
                DecodeError::malformed(endpoint, format!("timestamp is {}", node.kind_name()))
            })?,
            None => &[],
        };

        let mut points = Vec::with_capacity(timestamps.len());
        if !timestamps.is_empty() {
            let adjusted = self.request.is_adjusted();
            let columns = Columns::read(result, timestamps.len(), adjusted, endpoint)?;
            for (index, raw_ts) in timestamps.iter().enumerate() {
                if let Some(point) = columns.point(index, raw_ts, &meta, endpoint)? {
                    points.push(point);
                }
            }
        }

        debug!(
            symbol = %self.symbol,
            rows = timestamps.len(),
            points = points.len(),
            timezone = meta.timezone.name(),
            "history adapted"
        );

        PriceSeries::new(
            self.symbol.clone(),
            self.request,
            meta.currency,
            meta.timezone.name(),
            points,
        )
        .map_err(|error| DecodeError::malformed(endpoint, error.to_string()).into())
    }
}

/// Parallel value arrays of a chart result.
struct Columns<'a> {
    ohlcv: [&'a [DecodedTree]; 5],
    adjclose: Option<&'a [DecodedTree]>,
}

impl<'a> Columns<'a> {
    fn read(
        result: &'a DecodedTree,
        rows: usize,
        adjusted: bool,
        endpoint: EndpointKind,
    ) -> Result<Self, DecodeError> {
        let quote = result
            .path("indicators.quote.0")
            .ok_or_else(|| DecodeError::malformed(endpoint, "indicators.quote[0] is missing"))?;

        let mut ohlcv: [&'a [DecodedTree]; 5] = [&[]; 5];
        for (slot, name) in ohlcv.iter_mut().zip(OHLCV) {
            *slot = column(quote.get(name), name, rows, endpoint)?;
        }

        let adjclose = if adjusted {
            Some(column(
                result.path("indicators.adjclose.0.adjclose"),
                "adjclose",
                rows,
                endpoint,
            )?)
        } else {
            None
        };

        Ok(Self { ohlcv, adjclose })
    }

    /// Row `index` as a point; `None` for provider padding rows.
    fn point(
        &self,
        index: usize,
        raw_ts: &DecodedTree,
        meta: &ChartMeta,
        endpoint: EndpointKind,
    ) -> Result<Option<PricePoint>, AdapterError> {
        let values = self.ohlcv.map(|values| optional(values.get(index)));
        if values.iter().all(Option::is_none) {
            return Ok(None);
        }
        if let Some(position) = values.iter().position(Option::is_none) {
            return Err(DecodeError::malformed(
                endpoint,
                format!("row {index} has a null {}", OHLCV[position]),
            )
            .into());
        }
        let [Some(open), Some(high), Some(low), Some(close), Some(volume)] = values else {
            return Ok(None);
        };

        let timestamp = to_instant(raw_ts, "timestamp")?;
        let mut open = to_decimal_price(open, "open")?;
        let mut high = to_decimal_price(high, "high")?;
        let mut low = to_decimal_price(low, "low")?;
        let mut close = to_decimal_price(close, "close")?;
        let volume = to_count(volume, "volume")?;

        if let Some(adjclose) = self.adjclose {
            let raw = optional(adjclose.get(index)).ok_or_else(|| {
                DecodeError::malformed(endpoint, format!("row {index} has a null adjclose"))
            })?;
            let adjusted = to_decimal_price(raw, "adjclose")?;
            let factor = adjustment_factor(adjusted, close).ok_or_else(|| {
                DecodeError::malformed(
                    endpoint,
                    format!("row {index} has a zero close with a non-zero adjclose"),
                )
            })?;
            open = scale(open, factor);
            high = scale(high, factor);
            low = scale(low, factor);
            close = adjusted;
        }

        let date = meta.timezone.local_date(timestamp);
        PricePoint::new(date, timestamp, open, high, low, close, volume)
            .map(Some)
            .map_err(|error| {
                DecodeError::malformed(endpoint, format!("row {index}: {error}")).into()
            })
    }
}

/// A value column that must line up with the timestamps.
fn column<'a>(
    node: Option<&'a DecodedTree>,
    name: &str,
    rows: usize,
    endpoint: EndpointKind,
) -> Result<&'a [DecodedTree], DecodeError> {
    let values = node
        .and_then(DecodedTree::as_seq)
        .ok_or_else(|| DecodeError::malformed(endpoint, format!("column '{name}' is missing")))?;
    if values.len() != rows {
        return Err(DecodeError::malformed(
            endpoint,
            format!("column '{name}' has {} values for {rows} timestamps", values.len()),
        ));
    }
    Ok(values)
}

/// `adjclose / close`; a zero close is only consistent with a zero adjclose.
fn adjustment_factor(adjusted: Decimal, close: Decimal) -> Option<Decimal> {
    if close.is_zero() {
        return adjusted.is_zero().then_some(Decimal::ONE);
    }
    adjusted.checked_div(close)
}

fn scale(price: Decimal, factor: Decimal) -> Decimal {
    (price * factor).round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointNearestEven)
}
