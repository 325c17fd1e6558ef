//! # Tickersnap Core
//!
//! Per-symbol market data retrieval and normalization.
//!
//! ## Overview
//!
//! Given a ticker symbol, this crate fetches the quote, price history,
//! company profile, dividends and splits from Yahoo Finance and returns
//! them as strongly typed, unit-consistent values:
//!
//! - **Exact decimals** for prices and ratios (`rust_decimal`)
//! - **Fractions** for every percentage, whatever scale the provider used
//! - **Exchange-local calendar dates** resolved through the venue timezone
//! - **Per-endpoint slots** so one failing endpoint never hides the others
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Endpoint adapters (quote, history, info, dividends, splits, market) |
//! | [`config`] | Client and transport configuration |
//! | [`decode`] | Payload decoding and schema markers |
//! | [`domain`] | Canonical domain models |
//! | [`error`] | Core error types |
//! | [`normalize`] | Field conversion to canonical units |
//! | [`snapshot`] | [`TickerClient`] facade and [`SymbolSnapshot`] |
//! | [`transport`] | Transport contract, Yahoo and fixture transports, retry policy |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickersnap_core::{SnapshotOptions, TickerClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = TickerClient::from_env()?;
//!     let snapshot = client.get_snapshot("AAPL", SnapshotOptions::default()).await?;
//!
//!     if let Some(quote) = snapshot.quote.ready() {
//!         println!("AAPL last: {}", quote.last_price);
//!     }
//!     for (endpoint, error) in snapshot.failures() {
//!         eprintln!("{endpoint}: {error}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  TickerClient   │  validate, fan out, one deadline
//! └────────┬────────┘
//!          │ JoinSet + Semaphore
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Endpoint        │────▶│ Transport        │
//! │ Adapters        │     │ (Yahoo/Fixture)  │
//! └────────┬────────┘     └──────────────────┘
//!          │ decode + normalize
//!          ▼
//! ┌─────────────────┐
//! │ Domain Models   │
//! │ in Slots        │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Invalid input is a [`ValidationError`] raised before any network I/O.
//! Everything else is an [`AdapterError`] scoped to one slot:
//!
//! ```rust
//! use tickersnap_core::{AdapterError, Slot, Quote};
//!
//! fn describe(slot: &Slot<Quote>) -> String {
//!     match slot {
//!         Slot::Ready(quote) => format!("last {}", quote.last_price),
//!         Slot::Failed(error @ AdapterError::Timeout { .. }) => format!("slow: {error}"),
//!         Slot::Failed(error) => format!("{}: {error}", error.code()),
//!         Slot::Skipped => String::from("not requested"),
//!     }
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod decode;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod snapshot;
pub mod transport;

// Adapters
pub use adapters::{
    fetch_and_adapt, DividendsAdapter, EndpointAdapter, HistoryAdapter, InfoAdapter,
    MarketStatusAdapter, MarketSummaryAdapter, QuoteAdapter, SplitsAdapter, INFO_MODULES,
};

// Configuration
pub use config::{ClientConfig, TransportConfig};

// Decoding
pub use decode::{DecodeError, DecodedTree};

// Domain models
pub use domain::{
    validate_currency_code, Adjustment, CompanyInfo, DividendEvent, ExchangeTimezone, FieldValue,
    Fraction, HistoryRequest, InfoField, Interval, MarketId, MarketStatus, MarketSummary,
    MarketSummaryItem, MarketTimezone, Period, PricePoint, PriceSeries, Quote, SplitEvent, Symbol,
    PREDEFINED_MARKETS,
};

// Error types
pub use error::{AdapterError, ConfigError, CoreError, ValidationError};

// Normalization
pub use normalize::NormalizeError;

// Facade
pub use snapshot::{Slot, SnapshotOptions, SymbolSnapshot, TickerClient};

// Transport
pub use transport::{
    Backoff, EndpointKind, FetchRequest, FetchTarget, FixtureTransport, RawResponse, RetryConfig,
    Transport, TransportError, YahooTransport,
};
