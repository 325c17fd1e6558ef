//! Transport contract between the adapters and the provider.
//!
//! The core only ever calls [`Transport::fetch`]. Session handling and
//! retries belong to the implementation; [`YahooTransport`] talks to the
//! live provider and [`FixtureTransport`] replays canned payloads.

mod fixture;
mod retry;
mod yahoo;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MarketId, Symbol};

pub use fixture::FixtureTransport;
pub use retry::{Backoff, RetryConfig};
pub use yahoo::YahooTransport;

/// Provider endpoint a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Quote,
    History,
    Info,
    Dividends,
    Splits,
    MarketTime,
    MarketSummary,
}

impl EndpointKind {
    pub const SYMBOL_ENDPOINTS: [Self; 5] = [
        Self::Quote,
        Self::History,
        Self::Info,
        Self::Dividends,
        Self::Splits,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::History => "history",
            Self::Info => "info",
            Self::Dividends => "dividends",
            Self::Splits => "splits",
            Self::MarketTime => "market_time",
            Self::MarketSummary => "market_summary",
        }
    }

    /// Whether the endpoint is served by the chart API.
    pub const fn is_chart(self) -> bool {
        matches!(self, Self::History | Self::Dividends | Self::Splits)
    }
}

impl Display for EndpointKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a request is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    Symbol(Symbol),
    Market(MarketId),
}

impl Display for FetchTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Symbol(symbol) => Display::fmt(symbol, f),
            Self::Market(market) => Display::fmt(market, f),
        }
    }
}

/// Logical request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub endpoint: EndpointKind,
    pub target: FetchTarget,
    pub params: BTreeMap<String, String>,
}

impl FetchRequest {
    pub fn for_symbol(endpoint: EndpointKind, symbol: Symbol) -> Self {
        Self {
            endpoint,
            target: FetchTarget::Symbol(symbol),
            params: BTreeMap::new(),
        }
    }

    pub fn for_market(endpoint: EndpointKind, market: MarketId) -> Self {
        Self {
            endpoint,
            target: FetchTarget::Market(market),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Status and raw body of a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failure to obtain a usable response from the provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("{endpoint} request returned HTTP {status}")]
    Upstream { endpoint: EndpointKind, status: u16 },
    #[error("{endpoint} request could not connect: {message}")]
    Connection {
        endpoint: EndpointKind,
        message: String,
    },
    #[error("{endpoint} request timed out")]
    Timeout { endpoint: EndpointKind },
    #[error("provider session could not be established: {message}")]
    Session { message: String },
    #[error("{endpoint} request failed: {message}")]
    Request {
        endpoint: EndpointKind,
        message: String,
    },
}

impl TransportError {
    pub fn request(endpoint: EndpointKind, message: impl Into<String>) -> Self {
        Self::Request {
            endpoint,
            message: message.into(),
        }
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::Session {
            message: message.into(),
        }
    }
}

/// Async provider transport.
pub trait Transport: Send + Sync {
    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        (**self).fetch(request)
    }
}
