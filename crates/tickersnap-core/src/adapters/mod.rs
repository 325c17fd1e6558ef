//! Endpoint adapters.
//!
//! Each adapter knows one provider endpoint: the request it needs and how
//! to map the decoded payload onto a canonical entity. They are pure apart
//! from the single transport call made by [`fetch_and_adapt`].
//!
//! | Adapter | Endpoint | Output |
//! |---------|----------|--------|
//! | [`QuoteAdapter`] | v7 quote | [`Quote`](crate::Quote) |
//! | [`HistoryAdapter`] | v8 chart | [`PriceSeries`](crate::PriceSeries) |
//! | [`InfoAdapter`] | v10 quoteSummary | [`CompanyInfo`](crate::CompanyInfo) |
//! | [`DividendsAdapter`] | v8 chart, `events=div` | `Vec<DividendEvent>` |
//! | [`SplitsAdapter`] | v8 chart, `events=split` | `Vec<SplitEvent>` |
//! | [`MarketStatusAdapter`] | v6 markettime | [`MarketStatus`](crate::MarketStatus) |
//! | [`MarketSummaryAdapter`] | v6 marketSummary | [`MarketSummary`](crate::MarketSummary) |

mod chart;
mod dividends;
mod history;
mod info;
mod market;
mod quote;
mod splits;

use tracing::{debug, instrument};

use crate::decode::{decode, DecodedTree};
use crate::transport::{EndpointKind, FetchRequest, Transport, TransportError};
use crate::AdapterError;

pub use dividends::DividendsAdapter;
pub use history::HistoryAdapter;
pub use info::{InfoAdapter, INFO_MODULES};
pub use market::{MarketStatusAdapter, MarketSummaryAdapter};
pub use quote::QuoteAdapter;
pub use splits::SplitsAdapter;

/// Maps one provider endpoint onto a canonical entity.
pub trait EndpointAdapter: Send + Sync {
    type Output: Send + 'static;

    fn endpoint(&self) -> EndpointKind;

    fn request(&self) -> FetchRequest;

    fn adapt(&self, tree: &DecodedTree) -> Result<Self::Output, AdapterError>;
}

/// Fetch, check the status, decode and adapt.
#[instrument(level = "debug", skip_all, fields(endpoint = %adapter.endpoint()))]
pub async fn fetch_and_adapt<A, T>(adapter: &A, transport: &T) -> Result<A::Output, AdapterError>
where
    A: EndpointAdapter + ?Sized,
    T: Transport + ?Sized,
{
    let request = adapter.request();
    let endpoint = request.endpoint;
    debug!(%endpoint, target = %request.target, "fetching");

    let response = transport.fetch(request).await?;
    if !response.is_success() {
        return Err(TransportError::Upstream {
            endpoint,
            status: response.status,
        }
        .into());
    }

    let tree = decode(endpoint, &response.body)?;
    adapter.adapt(&tree)
}
