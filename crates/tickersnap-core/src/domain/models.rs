use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Adjustment, HistoryRequest, Interval, Period, Symbol, ValidationError};

/// Share of a whole on the 0..1 scale (`0.023` is 2.3%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fraction(Decimal);

impl Fraction {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Build from percent points (`2.3` becomes `0.023`).
    pub fn from_percent_points(points: Decimal) -> Self {
        Self(points / Decimal::ONE_HUNDRED)
    }

    pub const fn value(self) -> Decimal {
        self.0
    }

    pub fn as_percent_points(self) -> Decimal {
        self.0 * Decimal::ONE_HUNDRED
    }
}

impl Display for Fraction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.as_percent_points().normalize())
    }
}

/// Canonical quote snapshot.
///
/// Only `last_price` is guaranteed; instruments such as ETFs or indices do
/// not report every metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub currency: Option<String>,
    pub last_price: Decimal,
    pub previous_close: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub year_low: Option<Decimal>,
    pub year_high: Option<Decimal>,
    pub last_volume: Option<u64>,
    pub market_cap: Option<Decimal>,
    pub change: Option<Fraction>,
    pub dividend_yield: Option<Fraction>,
}

impl Quote {
    pub fn day_range(&self) -> Option<(Decimal, Decimal)> {
        self.day_low.zip(self.day_high)
    }

    pub fn year_range(&self) -> Option<(Decimal, Decimal)> {
        self.year_low.zip(self.year_high)
    }
}

/// One OHLCV observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PricePointFields")]
pub struct PricePoint {
    /// Trading date on the exchange's calendar.
    pub date: NaiveDate,
    /// Bar start instant as reported by the provider.
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl PricePoint {
    pub fn new(
        date: NaiveDate,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            date,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Wire form of [`PricePoint`]; checked by [`PricePoint::new`].
#[derive(Deserialize)]
struct PricePointFields {
    date: NaiveDate,
    timestamp: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: u64,
}

impl TryFrom<PricePointFields> for PricePoint {
    type Error = ValidationError;

    fn try_from(raw: PricePointFields) -> Result<Self, Self::Error> {
        Self::new(
            raw.date,
            raw.timestamp,
            raw.open,
            raw.high,
            raw.low,
            raw.close,
            raw.volume,
        )
    }
}

/// Chronological OHLCV series for one symbol.
///
/// Daily-or-coarser series are keyed by date, intraday series by timestamp;
/// keys are strictly increasing. Adjusted and unadjusted prices are never
/// mixed inside one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PriceSeriesFields")]
pub struct PriceSeries {
    pub symbol: Symbol,
    pub period: Period,
    pub interval: Interval,
    pub adjustment: Adjustment,
    pub currency: Option<String>,
    pub timezone: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(
        symbol: Symbol,
        request: HistoryRequest,
        currency: Option<String>,
        timezone: impl Into<String>,
        points: Vec<PricePoint>,
    ) -> Result<Self, ValidationError> {
        let by_date = !request.interval.is_intraday();
        for (index, pair) in points.windows(2).enumerate() {
            let (previous, current) = (&pair[0], &pair[1]);
            let ordering = if by_date {
                current.date.cmp(&previous.date)
            } else {
                current.timestamp.cmp(&previous.timestamp)
            };
            match ordering {
                std::cmp::Ordering::Greater => {}
                std::cmp::Ordering::Equal => {
                    return Err(ValidationError::DuplicatePoint { index: index + 1 });
                }
                std::cmp::Ordering::Less => {
                    return Err(ValidationError::UnorderedPoint { index: index + 1 });
                }
            }
        }

        Ok(Self {
            symbol,
            period: request.period,
            interval: request.interval,
            adjustment: request.adjustment,
            currency,
            timezone: timezone.into(),
            points,
        })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// The most recent `count` points, oldest first.
    pub fn tail(&self, count: usize) -> &[PricePoint] {
        let start = self.points.len().saturating_sub(count);
        &self.points[start..]
    }
}

#[derive(Deserialize)]
struct PriceSeriesFields {
    symbol: Symbol,
    period: Period,
    interval: Interval,
    adjustment: Adjustment,
    currency: Option<String>,
    timezone: String,
    points: Vec<PricePoint>,
}

impl TryFrom<PriceSeriesFields> for PriceSeries {
    type Error = ValidationError;

    fn try_from(raw: PriceSeriesFields) -> Result<Self, Self::Error> {
        let request = HistoryRequest::new(
            raw.period,
            raw.interval,
            matches!(raw.adjustment, Adjustment::Adjusted),
        )?;
        let currency = raw
            .currency
            .as_deref()
            .map(validate_currency_code)
            .transpose()?;
        Self::new(raw.symbol, request, currency, raw.timezone, raw.points)
    }
}

/// Cash dividend keyed by ex-date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DividendFields")]
pub struct DividendEvent {
    pub ex_date: NaiveDate,
    pub amount: Decimal,
}

impl DividendEvent {
    pub fn new(ex_date: NaiveDate, amount: Decimal) -> Result<Self, ValidationError> {
        validate_non_negative("amount", amount)?;
        Ok(Self { ex_date, amount })
    }
}

#[derive(Deserialize)]
struct DividendFields {
    ex_date: NaiveDate,
    amount: Decimal,
}

impl TryFrom<DividendFields> for DividendEvent {
    type Error = ValidationError;

    fn try_from(raw: DividendFields) -> Result<Self, Self::Error> {
        Self::new(raw.ex_date, raw.amount)
    }
}

/// Stock split expressed as `numerator:denominator` (4:1 quadruples shares).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SplitFields")]
pub struct SplitEvent {
    pub date: NaiveDate,
    pub numerator: u32,
    pub denominator: u32,
}

impl SplitEvent {
    pub fn new(date: NaiveDate, numerator: u32, denominator: u32) -> Result<Self, ValidationError> {
        if numerator == 0 || denominator == 0 {
            return Err(ValidationError::InvalidSplitRatio {
                numerator,
                denominator,
            });
        }

        Ok(Self {
            date,
            numerator,
            denominator,
        })
    }

    /// Shares held after the split per share held before it.
    pub fn ratio(&self) -> Decimal {
        Decimal::from(self.numerator) / Decimal::from(self.denominator)
    }
}

#[derive(Deserialize)]
struct SplitFields {
    date: NaiveDate,
    numerator: u32,
    denominator: u32,
}

impl TryFrom<SplitFields> for SplitEvent {
    type Error = ValidationError;

    fn try_from(raw: SplitFields) -> Result<Self, Self::Error> {
        Self::new(raw.date, raw.numerator, raw.denominator)
    }
}

impl Display for SplitEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.numerator, self.denominator)
    }
}

/// Validate a 3-letter currency code.
///
/// Single-case codes are uppercased. Mixed-case codes denote minor units
/// (`GBp` is pence sterling) and are kept as they are.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    let is_valid = trimmed.len() == 3 && trimmed.chars().all(|ch| ch.is_ascii_alphabetic());
    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    let single_case = trimmed.chars().all(|ch| ch.is_ascii_uppercase())
        || trimmed.chars().all(|ch| ch.is_ascii_lowercase());
    if single_case {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Ok(trimmed.to_owned())
    }
}

fn validate_non_negative(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
