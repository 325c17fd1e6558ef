use std::time::Duration;

use thiserror::Error;

use crate::decode::DecodeError;
use crate::normalize::NormalizeError;
use crate::transport::{EndpointKind, TransportError};

/// Validation and contract errors exposed by `tickersnap-core`.
///
/// Input variants (symbol, period, interval, options, market) are raised
/// before any network I/O. The remaining variants guard domain invariants
/// and are converted into slot errors by the adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter, digit or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid period '{value}', expected one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max")]
    InvalidPeriod { value: String },
    #[error(
        "invalid interval '{value}', expected one of 1m, 2m, 5m, 15m, 30m, 60m, 90m, 1h, 1d, 5d, 1wk, 1mo, 3mo"
    )]
    InvalidInterval { value: String },
    #[error("interval '{interval}' only covers the last {max_days} days, period '{period}' is too long")]
    IntervalPeriodMismatch {
        interval: String,
        period: String,
        max_days: u32,
    },
    #[error("adjusted prices are not published for intraday interval '{interval}'")]
    AdjustmentUnavailable { interval: String },
    #[error("snapshot options must request at least one endpoint")]
    NothingRequested,
    #[error("deadline must be greater than zero")]
    ZeroDeadline,

    #[error("invalid market id '{value}', expected '<region>_market'")]
    InvalidMarket { value: String },

    #[error("currency must be a 3-letter ISO code: '{value}'")]
    InvalidCurrency { value: String },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,
    #[error("point {index} repeats the key of the previous point")]
    DuplicatePoint { index: usize },
    #[error("point {index} is earlier than the previous point")]
    UnorderedPoint { index: usize },

    #[error("split ratio {numerator}:{denominator} must use positive integers")]
    InvalidSplitRatio { numerator: u32, denominator: u32 },
}

impl ValidationError {
    /// Whether this error describes caller input rather than provider data.
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptySymbol
                | Self::SymbolTooLong { .. }
                | Self::SymbolInvalidStart { .. }
                | Self::SymbolInvalidChar { .. }
                | Self::InvalidPeriod { .. }
                | Self::InvalidInterval { .. }
                | Self::IntervalPeriodMismatch { .. }
                | Self::AdjustmentUnavailable { .. }
                | Self::NothingRequested
                | Self::ZeroDeadline
                | Self::InvalidMarket { .. }
        )
    }
}

/// Slot-scoped failure of one endpoint adapter.
///
/// Never aborts sibling fetches; the facade stores it in the slot of the
/// endpoint that produced it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdapterError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("{endpoint} fetch did not complete within {}ms", .deadline.as_millis())]
    Timeout {
        endpoint: EndpointKind,
        deadline: Duration,
    },
}

impl AdapterError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "adapter.transport",
            Self::Decode(_) => "adapter.decode",
            Self::Normalize(_) => "adapter.normalize",
            Self::Timeout { .. } => "adapter.timeout",
        }
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Invalid configuration values, mostly from `TICKERSNAP_*` variables.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
