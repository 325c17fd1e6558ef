//! # Domain Models
//!
//! Canonical, unit-consistent types returned by the endpoint adapters.
//!
//! All models validate their invariants at construction and carry exact
//! decimals (`rust_decimal`) for prices and ratios:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated ticker |
//! | [`Quote`] | Latest price snapshot |
//! | [`PricePoint`] / [`PriceSeries`] | OHLCV history |
//! | [`CompanyInfo`] | Profile and key statistics |
//! | [`DividendEvent`] / [`SplitEvent`] | Corporate actions |
//! | [`HistoryRequest`] | Validated period, interval and adjustment |
//! | [`ExchangeTimezone`] | Venue timezone used for calendar dates |
//! | [`MarketStatus`] / [`MarketSummary`] | Market-level lookups |
//!
//! ```rust,ignore
//! use tickersnap_core::{HistoryRequest, ValidationError};
//!
//! // One-minute bars only reach back seven days.
//! let err = HistoryRequest::parse("1mo", "1m", false);
//! assert!(matches!(err, Err(ValidationError::IntervalPeriodMismatch { .. })));
//! ```

mod history;
mod info;
mod market;
mod models;
mod symbol;
mod timezone;

pub use history::{Adjustment, HistoryRequest, Interval, Period};
pub use info::{CompanyInfo, FieldValue, InfoField};
pub use market::{
    MarketId, MarketStatus, MarketSummary, MarketSummaryItem, MarketTimezone, PREDEFINED_MARKETS,
};
pub use models::{
    validate_currency_code, DividendEvent, Fraction, PricePoint, PriceSeries, Quote, SplitEvent,
};
pub use symbol::Symbol;
pub use timezone::ExchangeTimezone;
