use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, REFERER};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{EndpointKind, FetchRequest, FetchTarget, RawResponse, Transport, TransportError};
use crate::config::TransportConfig;
use crate::ConfigError;

const FINANCE_REFERER: &str = "https://finance.yahoo.com/";
const CRUMB_TTL: Duration = Duration::from_secs(3_600);
const MAX_CRUMB_LEN: usize = 100;

#[derive(Debug, Clone)]
struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Cookie/crumb session shared by all requests of one transport.
///
/// The provider wants a consent cookie (set by the session page and kept in
/// the reqwest cookie jar) plus a crumb token passed as a query parameter.
/// The mutex is held across the refresh so concurrent fetches wait for a
/// single refresh instead of racing.
#[derive(Debug)]
struct YahooSession {
    crumb: Mutex<Option<CachedCrumb>>,
    ttl: Duration,
}

impl YahooSession {
    fn new(ttl: Duration) -> Self {
        Self {
            crumb: Mutex::new(None),
            ttl,
        }
    }

    async fn crumb(
        &self,
        client: &reqwest::Client,
        config: &TransportConfig,
    ) -> Result<String, TransportError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            if crumb.fetched_at.elapsed() < self.ttl {
                return Ok(crumb.value.clone());
            }
        }

        debug!(session_url = %config.session_url, "refreshing provider session");
        // The session page answers 404 but still sets the cookie.
        client
            .get(&config.session_url)
            .header(REFERER, FINANCE_REFERER)
            .send()
            .await
            .map_err(|error| {
                TransportError::session(format!("failed to fetch session cookie: {error}"))
            })?;

        let response = client
            .get(&config.crumb_url)
            .header(REFERER, FINANCE_REFERER)
            .send()
            .await
            .map_err(|error| TransportError::session(format!("failed to fetch crumb: {error}")))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| {
            TransportError::session(format!("failed to read crumb response: {error}"))
        })?;

        if status == 429 {
            return Err(TransportError::session("rate limited while fetching crumb"));
        }
        if !(200..300).contains(&status) {
            return Err(TransportError::session(format!(
                "crumb endpoint returned HTTP {status}"
            )));
        }

        let value = validate_crumb(&body)
            .ok_or_else(|| TransportError::session("crumb endpoint returned an unusable token"))?;
        *cached = Some(CachedCrumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    async fn invalidate(&self) {
        *self.crumb.lock().await = None;
    }
}

/// Live transport for the Yahoo Finance query API.
#[derive(Debug)]
pub struct YahooTransport {
    client: reqwest::Client,
    config: TransportConfig,
    session: YahooSession,
}

impl YahooTransport {
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| ConfigError::HttpClient(error.to_string()))?;

        Ok(Self {
            client,
            config,
            session: YahooSession::new(CRUMB_TTL),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn send_with_retry(
        &self,
        endpoint: EndpointKind,
        url: &str,
    ) -> Result<RawResponse, TransportError> {
        let retry = &self.config.retry;
        let mut attempt = 0;

        loop {
            let can_retry = attempt < retry.max_retries;
            let sent = self
                .client
                .get(url)
                .header(REFERER, FINANCE_REFERER)
                .header(ACCEPT, "application/json")
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(error) => {
                    let retryable = (error.is_timeout() && retry.retry_on_timeout)
                        || (error.is_connect() && retry.retry_on_connect);
                    if retryable && can_retry {
                        let delay = retry.delay_for_attempt(attempt);
                        warn!(%endpoint, attempt, ?delay, %error, "transport error, retrying");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(classify_send_error(endpoint, &error));
                }
            };

            let status = response.status().as_u16();
            if retry.should_retry_status(status) && can_retry {
                let delay = retry.delay_for_attempt(attempt);
                warn!(%endpoint, attempt, status, ?delay, "retryable status, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let body = response.bytes().await.map_err(|error| {
                TransportError::request(endpoint, format!("failed to read body: {error}"))
            })?;
            debug!(
                %endpoint,
                status,
                bytes = body.len(),
                attempts = attempt + 1,
                "response received"
            );
            return Ok(RawResponse {
                status,
                body: body.to_vec(),
            });
        }
    }
}

impl Transport for YahooTransport {
    #[instrument(
        level = "debug",
        skip_all,
        fields(endpoint = %request.endpoint, target = %request.target)
    )]
    fn fetch<'a>(
        &'a self,
        request: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let mut session_refreshed = false;
            loop {
                let crumb = self.session.crumb(&self.client, &self.config).await?;
                let url = endpoint_url(&self.config.query_base_url, &request, &crumb)?;
                let response = self.send_with_retry(request.endpoint, &url).await?;

                if matches!(response.status, 401 | 403) && !session_refreshed {
                    warn!(
                        endpoint = %request.endpoint,
                        status = response.status,
                        "session rejected, refreshing crumb"
                    );
                    self.session.invalidate().await;
                    session_refreshed = true;
                    continue;
                }

                return Ok(response);
            }
        })
    }
}

/// Build the provider URL for `request`, crumb included.
fn endpoint_url(
    base_url: &str,
    request: &FetchRequest,
    crumb: &str,
) -> Result<String, TransportError> {
    let base = base_url.trim_end_matches('/');
    let endpoint = request.endpoint;

    let (mut url, mut has_query) = match (endpoint, &request.target) {
        (EndpointKind::Quote, FetchTarget::Symbol(symbol)) => (
            format!(
                "{base}/v7/finance/quote?symbols={}",
                urlencoding::encode(symbol.as_str())
            ),
            true,
        ),
        (
            EndpointKind::History | EndpointKind::Dividends | EndpointKind::Splits,
            FetchTarget::Symbol(symbol),
        ) => (
            format!(
                "{base}/v8/finance/chart/{}",
                urlencoding::encode(symbol.as_str())
            ),
            false,
        ),
        (EndpointKind::Info, FetchTarget::Symbol(symbol)) => (
            format!(
                "{base}/v10/finance/quoteSummary/{}",
                urlencoding::encode(symbol.as_str())
            ),
            false,
        ),
        (EndpointKind::MarketTime, FetchTarget::Market(_)) => {
            (format!("{base}/v6/finance/markettime"), false)
        }
        (EndpointKind::MarketSummary, FetchTarget::Market(_)) => {
            (format!("{base}/v6/finance/quote/marketSummary"), false)
        }
        (_, target) => {
            return Err(TransportError::request(
                endpoint,
                format!("target '{target}' is not valid for this endpoint"),
            ));
        }
    };

    let params = request
        .params
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .chain(std::iter::once(("crumb", crumb)));
    for (name, value) in params {
        url.push(if has_query { '&' } else { '?' });
        url.push_str(&urlencoding::encode(name));
        url.push('=');
        url.push_str(&urlencoding::encode(value));
        has_query = true;
    }

    Ok(url)
}

/// Accept the crumb body only when it looks like a token, not an error page.
fn validate_crumb(body: &str) -> Option<String> {
    let crumb = body.trim();
    let looks_like_page =
        crumb.contains('<') || crumb.to_ascii_lowercase().contains("too many requests");
    if crumb.is_empty()
        || crumb.len() >= MAX_CRUMB_LEN
        || crumb.contains(char::is_whitespace)
        || looks_like_page
    {
        return None;
    }
    Some(crumb.to_owned())
}

fn classify_send_error(endpoint: EndpointKind, error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout { endpoint }
    } else if error.is_connect() {
        TransportError::Connection {
            endpoint,
            message: error.to_string(),
        }
    } else {
        TransportError::request(endpoint, error.to_string())
    }
}
