//! Per-symbol facade.
//!
//! [`TickerClient::get_snapshot`] validates its input, fans the requested
//! endpoints out onto a [`JoinSet`] bounded by a per-call [`Semaphore`], and
//! collects them under one deadline. Every endpoint lands in its own
//! [`Slot`], so one failing or slow endpoint never hides the others.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{
    fetch_and_adapt, DividendsAdapter, EndpointAdapter, HistoryAdapter, InfoAdapter,
    MarketStatusAdapter, MarketSummaryAdapter, QuoteAdapter, SplitsAdapter,
};
use crate::transport::{EndpointKind, Transport, TransportError, YahooTransport};
use crate::{
    AdapterError, ClientConfig, CompanyInfo, ConfigError, CoreError, DividendEvent,
    HistoryRequest, Interval, MarketId, MarketStatus, MarketSummary, Period, PriceSeries, Quote,
    SplitEvent, Symbol, ValidationError,
};

/// Stand-in expiry for deadlines too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Outcome of one endpoint inside a [`SymbolSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Slot<T> {
    /// Not requested.
    Skipped,
    Ready(T),
    #[serde(serialize_with = "serialize_failure")]
    Failed(AdapterError),
}

fn serialize_failure<S>(error: &AdapterError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeStruct;

    let mut state = serializer.serialize_struct("Failure", 2)?;
    state.serialize_field("code", error.code())?;
    state.serialize_field("message", &error.to_string())?;
    state.end()
}

impl<T> Slot<T> {
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AdapterError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    fn from_result(result: Result<T, AdapterError>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(error) => Self::Failed(error),
        }
    }
}

/// Which endpoints a snapshot fetches, and with which history parameters.
///
/// The default requests everything: one month of adjusted daily history
/// under the client's deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub include_quote: bool,
    pub include_history: bool,
    pub include_info: bool,
    pub include_dividends: bool,
    pub include_splits: bool,
    pub history_period: Period,
    pub history_interval: Interval,
    pub adjusted: bool,
    /// Overrides [`ClientConfig::deadline`] for this call.
    pub deadline: Option<Duration>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            include_quote: true,
            include_history: true,
            include_info: true,
            include_dividends: true,
            include_splits: true,
            history_period: Period::OneMonth,
            history_interval: Interval::OneDay,
            adjusted: true,
            deadline: None,
        }
    }
}

impl SnapshotOptions {
    /// Options requesting nothing; combine with the `with_*` builders.
    pub fn none() -> Self {
        Self {
            include_quote: false,
            include_history: false,
            include_info: false,
            include_dividends: false,
            include_splits: false,
            ..Self::default()
        }
    }

    pub fn with_quote(mut self) -> Self {
        self.include_quote = true;
        self
    }

    pub fn with_history(mut self, period: Period, interval: Interval, adjusted: bool) -> Self {
        self.include_history = true;
        self.history_period = period;
        self.history_interval = interval;
        self.adjusted = adjusted;
        self
    }

    /// [`SnapshotOptions::with_history`] from caller-supplied text such as
    /// `"1mo"` and `"1d"`.
    pub fn with_history_text(
        self,
        period: &str,
        interval: &str,
        adjusted: bool,
    ) -> Result<Self, ValidationError> {
        Ok(self.with_history(period.parse()?, interval.parse()?, adjusted))
    }

    pub fn with_info(mut self) -> Self {
        self.include_info = true;
        self
    }

    pub fn with_dividends(mut self) -> Self {
        self.include_dividends = true;
        self
    }

    pub fn with_splits(mut self) -> Self {
        self.include_splits = true;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Requested endpoints in fixed order.
    pub fn requested(&self) -> Vec<EndpointKind> {
        [
            (self.include_quote, EndpointKind::Quote),
            (self.include_history, EndpointKind::History),
            (self.include_info, EndpointKind::Info),
            (self.include_dividends, EndpointKind::Dividends),
            (self.include_splits, EndpointKind::Splits),
        ]
        .into_iter()
        .filter_map(|(included, kind)| included.then_some(kind))
        .collect()
    }

    /// History parameters, validated only when history is requested.
    fn history_request(&self) -> Result<Option<HistoryRequest>, ValidationError> {
        if !self.include_history {
            return Ok(None);
        }
        HistoryRequest::new(self.history_period, self.history_interval, self.adjusted).map(Some)
    }
}

/// Everything fetched about one symbol; each endpoint in its own slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSnapshot {
    pub symbol: Symbol,
    pub quote: Slot<Quote>,
    pub history: Slot<PriceSeries>,
    pub info: Slot<CompanyInfo>,
    pub dividends: Slot<Vec<DividendEvent>>,
    pub splits: Slot<Vec<SplitEvent>>,
}

impl SymbolSnapshot {
    fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            quote: Slot::Skipped,
            history: Slot::Skipped,
            info: Slot::Skipped,
            dividends: Slot::Skipped,
            splits: Slot::Skipped,
        }
    }

    fn record(&mut self, fetched: Fetched) {
        match fetched {
            Fetched::Quote(result) => self.quote = Slot::from_result(result),
            Fetched::History(result) => self.history = Slot::from_result(result),
            Fetched::Info(result) => self.info = Slot::from_result(result),
            Fetched::Dividends(result) => self.dividends = Slot::from_result(result),
            Fetched::Splits(result) => self.splits = Slot::from_result(result),
        }
    }

    fn fail(&mut self, endpoint: EndpointKind, error: AdapterError) {
        match endpoint {
            EndpointKind::Quote => self.quote = Slot::Failed(error),
            EndpointKind::History => self.history = Slot::Failed(error),
            EndpointKind::Info => self.info = Slot::Failed(error),
            EndpointKind::Dividends => self.dividends = Slot::Failed(error),
            EndpointKind::Splits => self.splits = Slot::Failed(error),
            EndpointKind::MarketTime | EndpointKind::MarketSummary => {}
        }
    }

    /// Failed slots with the endpoint that produced them.
    pub fn failures(&self) -> Vec<(EndpointKind, &AdapterError)> {
        [
            (EndpointKind::Quote, self.quote.error()),
            (EndpointKind::History, self.history.error()),
            (EndpointKind::Info, self.info.error()),
            (EndpointKind::Dividends, self.dividends.error()),
            (EndpointKind::Splits, self.splits.error()),
        ]
        .into_iter()
        .filter_map(|(kind, error)| error.map(|error| (kind, error)))
        .collect()
    }

    /// Whether no requested slot failed.
    pub fn is_complete(&self) -> bool {
        self.failures().is_empty()
    }
}

/// Result of one spawned endpoint task.
enum Fetched {
    Quote(Result<Quote, AdapterError>),
    History(Result<PriceSeries, AdapterError>),
    Info(Result<CompanyInfo, AdapterError>),
    Dividends(Result<Vec<DividendEvent>, AdapterError>),
    Splits(Result<Vec<SplitEvent>, AdapterError>),
}

/// Market-data client over a [`Transport`].
///
/// Holds no mutable state of its own; clones share the transport.
#[derive(Clone)]
pub struct TickerClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl std::fmt::Debug for TickerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickerClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TickerClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Client backed by the Yahoo Finance HTTP transport.
    pub fn yahoo(config: ClientConfig) -> Result<Self, ConfigError> {
        let transport = YahooTransport::new(config.transport.clone())?;
        Ok(Self::with_config(Arc::new(transport), config))
    }

    /// [`TickerClient::yahoo`] configured from `TICKERSNAP_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::yahoo(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the requested endpoints of `symbol` concurrently.
    ///
    /// Only invalid input is an error. Endpoint failures, including the
    /// deadline expiring, are reported in the snapshot's slots.
    #[instrument(level = "debug", skip(self, options))]
    pub async fn get_snapshot(
        &self,
        symbol: &str,
        options: SnapshotOptions,
    ) -> Result<SymbolSnapshot, ValidationError> {
        let symbol = Symbol::parse(symbol)?;
        let requested = options.requested();
        if requested.is_empty() {
            return Err(ValidationError::NothingRequested);
        }
        let history = options.history_request()?;
        let deadline = self.deadline(options.deadline)?;

        let permits = requested.len().min(self.config.max_concurrency).max(1);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut tasks = JoinSet::new();
        info!(
            %symbol,
            endpoints = ?requested,
            permits,
            deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            "dispatching snapshot"
        );

        for kind in &requested {
            match kind {
                EndpointKind::Quote => self.spawn(
                    &mut tasks,
                    &semaphore,
                    QuoteAdapter::new(symbol.clone()),
                    Fetched::Quote,
                ),
                EndpointKind::History => {
                    if let Some(request) = history {
                        self.spawn(
                            &mut tasks,
                            &semaphore,
                            HistoryAdapter::new(symbol.clone(), request),
                            Fetched::History,
                        );
                    }
                }
                EndpointKind::Info => self.spawn(
                    &mut tasks,
                    &semaphore,
                    InfoAdapter::new(symbol.clone()),
                    Fetched::Info,
                ),
                EndpointKind::Dividends => self.spawn(
                    &mut tasks,
                    &semaphore,
                    DividendsAdapter::new(symbol.clone()),
                    Fetched::Dividends,
                ),
                EndpointKind::Splits => self.spawn(
                    &mut tasks,
                    &semaphore,
                    SplitsAdapter::new(symbol.clone()),
                    Fetched::Splits,
                ),
                EndpointKind::MarketTime | EndpointKind::MarketSummary => {}
            }
        }

        let mut snapshot = SymbolSnapshot::empty(symbol);
        let mut pending: BTreeSet<EndpointKind> = requested.into_iter().collect();
        let now = Instant::now();
        let expires_at = now
            .checked_add(deadline)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let mut expired = false;

        loop {
            match tokio::time::timeout_at(expires_at, tasks.join_next()).await {
                Ok(Some(Ok((endpoint, fetched)))) => {
                    pending.remove(&endpoint);
                    snapshot.record(fetched);
                }
                Ok(Some(Err(join_error))) => {
                    warn!(
                        symbol = %snapshot.symbol,
                        error = %join_error,
                        "endpoint task ended abnormally"
                    );
                }
                Ok(None) => break,
                Err(_) => {
                    expired = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        for endpoint in pending {
            let error = if expired {
                AdapterError::Timeout { endpoint, deadline }
            } else {
                TransportError::request(endpoint, "fetch task ended without a result").into()
            };
            snapshot.fail(endpoint, error);
        }

        for (endpoint, error) in snapshot.failures() {
            warn!(symbol = %snapshot.symbol, %endpoint, code = error.code(), %error, "slot failed");
        }
        debug!(
            symbol = %snapshot.symbol,
            complete = snapshot.is_complete(),
            expired,
            "snapshot collected"
        );

        Ok(snapshot)
    }

    fn spawn<A>(
        &self,
        tasks: &mut JoinSet<(EndpointKind, Fetched)>,
        semaphore: &Arc<Semaphore>,
        adapter: A,
        wrap: fn(Result<A::Output, AdapterError>) -> Fetched,
    ) where
        A: EndpointAdapter + 'static,
    {
        let transport = Arc::clone(&self.transport);
        let semaphore = Arc::clone(semaphore);
        tasks.spawn(async move {
            let endpoint = adapter.endpoint();
            let outcome = match semaphore.acquire_owned().await {
                Ok(permit) => {
                    let outcome = fetch_and_adapt(&adapter, transport.as_ref()).await;
                    drop(permit);
                    outcome
                }
                Err(_) => {
                    Err(TransportError::request(endpoint, "concurrency limiter closed").into())
                }
            };
            debug!(%endpoint, ok = outcome.is_ok(), "endpoint finished");
            (endpoint, wrap(outcome))
        });
    }

    fn deadline(&self, requested: Option<Duration>) -> Result<Duration, ValidationError> {
        let deadline = requested.unwrap_or(self.config.deadline);
        if deadline.is_zero() {
            return Err(ValidationError::ZeroDeadline);
        }
        Ok(deadline)
    }

    /// Run one adapter under the configured deadline.
    async fn run_single<A>(&self, adapter: A) -> Result<A::Output, CoreError>
    where
        A: EndpointAdapter,
    {
        let deadline = self.deadline(None)?;
        let endpoint = adapter.endpoint();
        let fetch = fetch_and_adapt(&adapter, self.transport.as_ref());
        let result = tokio::time::timeout(deadline, fetch)
            .await
            .unwrap_or(Err(AdapterError::Timeout { endpoint, deadline }));
        if let Err(error) = &result {
            warn!(%endpoint, code = error.code(), %error, "single fetch failed");
        }
        Ok(result?)
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.run_single(QuoteAdapter::new(symbol)).await
    }

    pub async fn history(
        &self,
        symbol: &str,
        request: HistoryRequest,
    ) -> Result<PriceSeries, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        let request = request.validated()?;
        self.run_single(HistoryAdapter::new(symbol, request)).await
    }

    pub async fn info(&self, symbol: &str) -> Result<CompanyInfo, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.run_single(InfoAdapter::new(symbol)).await
    }

    pub async fn dividends(&self, symbol: &str) -> Result<Vec<DividendEvent>, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.run_single(DividendsAdapter::new(symbol)).await
    }

    pub async fn splits(&self, symbol: &str) -> Result<Vec<SplitEvent>, CoreError> {
        let symbol = Symbol::parse(symbol)?;
        self.run_single(SplitsAdapter::new(symbol)).await
    }

    /// Trading hours of a market such as `us_market`.
    pub async fn market_status(&self, market: &str) -> Result<MarketStatus, CoreError> {
        let market = MarketId::parse(market)?;
        self.run_single(MarketStatusAdapter::new(market)).await
    }

    /// Headline indices of a market, keyed by exchange code.
    pub async fn market_summary(&self, market: &str) -> Result<MarketSummary, CoreError> {
        let market = MarketId::parse(market)?;
        self.run_single(MarketSummaryAdapter::new(market)).await
    }
}
