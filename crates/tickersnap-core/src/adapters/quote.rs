use crate::adapters::chart::currency_field;
use crate::adapters::EndpointAdapter;
use crate::decode::{DecodeError, DecodedTree};
use crate::normalize::{
    normalize_fields, FieldKind, FieldPolicy, FieldSpec, NormalizeError, PercentScale,
};
use crate::transport::{EndpointKind, FetchRequest};
use crate::{AdapterError, Quote, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum QuoteField {
    LastPrice,
    PreviousClose,
    DayLow,
    DayHigh,
    YearLow,
    YearHigh,
    LastVolume,
    MarketCap,
    Change,
    DividendYield,
}

const LAST_PRICE_PATH: &str = "regularMarketPrice";

const QUOTE_FIELDS: &[FieldSpec<QuoteField>] = &[
    FieldSpec::new(QuoteField::LastPrice, LAST_PRICE_PATH, FieldKind::Price),
    FieldSpec::new(QuoteField::PreviousClose, "regularMarketPreviousClose", FieldKind::Price),
    FieldSpec::new(QuoteField::DayLow, "regularMarketDayLow", FieldKind::Price),
    FieldSpec::new(QuoteField::DayHigh, "regularMarketDayHigh", FieldKind::Price),
    FieldSpec::new(QuoteField::YearLow, "fiftyTwoWeekLow", FieldKind::Price),
    FieldSpec::new(QuoteField::YearHigh, "fiftyTwoWeekHigh", FieldKind::Price),
    FieldSpec::new(QuoteField::LastVolume, "regularMarketVolume", FieldKind::Count),
    FieldSpec::new(QuoteField::MarketCap, "marketCap", FieldKind::Decimal),
    FieldSpec::new(
        QuoteField::Change,
        "regularMarketChangePercent",
        FieldKind::Percent(PercentScale::PercentPoints),
    ),
    FieldSpec::new(
        QuoteField::DividendYield,
        "dividendYield",
        FieldKind::Percent(PercentScale::PercentPoints),
    ),
];

/// Latest quote of one symbol.
#[derive(Debug, Clone)]
pub struct QuoteAdapter {
    symbol: Symbol,
}

impl QuoteAdapter {
    pub fn new(symbol: Symbol) -> Self {
        Self { symbol }
    }
}

impl EndpointAdapter for QuoteAdapter {
    type Output = Quote;

    fn endpoint(&self) -> EndpointKind {
        EndpointKind::Quote
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::for_symbol(EndpointKind::Quote, self.symbol.clone())
    }

    fn adapt(&self, tree: &DecodedTree) -> Result<Quote, AdapterError> {
        let endpoint = self.endpoint();
        let results = tree
            .path("quoteResponse.result")
            .and_then(DecodedTree::as_seq)
            .unwrap_or_default();

        let node = results
            .iter()
            .find(|item| {
                item.get("symbol")
                    .and_then(DecodedTree::as_text)
                    .is_some_and(|symbol| symbol.trim().eq_ignore_ascii_case(self.symbol.as_str()))
            })
            .ok_or_else(|| DecodeError::UnexpectedSchema {
                endpoint,
                marker: "quoteResponse.result[symbol]",
                hint: Some(format!("no result for {}", self.symbol)),
            })?;

        let fields = normalize_fields(node, QUOTE_FIELDS, FieldPolicy::Strict)?;
        let last_price = fields
            .decimal(QuoteField::LastPrice)
            .ok_or_else(|| NormalizeError::missing(LAST_PRICE_PATH))?;

        Ok(Quote {
            symbol: self.symbol.clone(),
            currency: currency_field(node.get("currency"), "currency", endpoint)?,
            last_price,
            previous_close: fields.decimal(QuoteField::PreviousClose),
            day_low: fields.decimal(QuoteField::DayLow),
            day_high: fields.decimal(QuoteField::DayHigh),
            year_low: fields.decimal(QuoteField::YearLow),
            year_high: fields.decimal(QuoteField::YearHigh),
            last_volume: fields.count(QuoteField::LastVolume),
            market_cap: fields.decimal(QuoteField::MarketCap),
            change: fields.fraction(QuoteField::Change),
            dividend_yield: fields.fraction(QuoteField::DividendYield),
        })
    }
}
