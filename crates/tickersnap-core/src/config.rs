//! Client and transport configuration.
//!
//! Both structs have defaults suitable for the live provider and can be
//! overridden through builder methods, `TICKERSNAP_*` environment variables
//! or any serde format a host application embeds them in.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `TICKERSNAP_DEADLINE_MS` | [`ClientConfig::deadline`] | 10000 |
//! | `TICKERSNAP_MAX_CONCURRENCY` | [`ClientConfig::max_concurrency`] | 5 |
//! | `TICKERSNAP_QUERY_BASE_URL` | [`TransportConfig::query_base_url`] | `https://query1.finance.yahoo.com` |
//! | `TICKERSNAP_USER_AGENT` | [`TransportConfig::user_agent`] | browser-like agent |
//! | `TICKERSNAP_REQUEST_TIMEOUT_MS` | [`TransportConfig::request_timeout`] | 10000 |
//! | `TICKERSNAP_MAX_RETRIES` | [`RetryConfig::max_retries`] | 2 |

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::RetryConfig;
use crate::ConfigError;

pub const DEFAULT_QUERY_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_SESSION_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const ENV_DEADLINE_MS: &str = "TICKERSNAP_DEADLINE_MS";
const ENV_MAX_CONCURRENCY: &str = "TICKERSNAP_MAX_CONCURRENCY";
const ENV_QUERY_BASE_URL: &str = "TICKERSNAP_QUERY_BASE_URL";
const ENV_USER_AGENT: &str = "TICKERSNAP_USER_AGENT";
const ENV_REQUEST_TIMEOUT_MS: &str = "TICKERSNAP_REQUEST_TIMEOUT_MS";
const ENV_MAX_RETRIES: &str = "TICKERSNAP_MAX_RETRIES";

/// Settings of the live HTTP transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub query_base_url: String,
    /// Page visited once per session to obtain the consent cookie.
    pub session_url: String,
    pub crumb_url: String,
    pub user_agent: String,
    /// Per-attempt HTTP timeout.
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            query_base_url: String::from(DEFAULT_QUERY_BASE_URL),
            session_url: String::from(DEFAULT_SESSION_URL),
            crumb_url: String::from(DEFAULT_CRUMB_URL),
            user_agent: String::from(DEFAULT_USER_AGENT),
            request_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

impl TransportConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply `TICKERSNAP_*` overrides resolved through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_QUERY_BASE_URL) {
            let url = url.trim().trim_end_matches('/');
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: ENV_QUERY_BASE_URL,
                    value: url.to_owned(),
                    reason: "expected an http(s) URL",
                });
            }
            self.query_base_url = url.to_owned();
        }
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            let agent = agent.trim();
            if !agent.is_empty() {
                self.user_agent = agent.to_owned();
            }
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            self.request_timeout = parse_millis(ENV_REQUEST_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            self.retry.max_retries =
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_MAX_RETRIES,
                        value: raw.clone(),
                        reason: "expected a non-negative integer",
                    })?;
        }
        Ok(self)
    }

    pub fn with_query_base_url(mut self, url: impl Into<String>) -> Self {
        self.query_base_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Settings of a [`TickerClient`](crate::TickerClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Overall budget of one snapshot or single-endpoint call.
    pub deadline: Duration,
    /// Upper bound of concurrent endpoint fetches per call.
    pub max_concurrency: usize,
    pub transport: TransportConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(10),
            max_concurrency: 5,
            transport: TransportConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_DEADLINE_MS) {
            self.deadline = parse_millis(ENV_DEADLINE_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            self.max_concurrency = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: ENV_MAX_CONCURRENCY,
                    value: raw.clone(),
                    reason: "expected a positive integer",
                })?;
        }
        self.transport = self.transport.with_overrides(lookup)?;
        Ok(self)
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| ConfigError::InvalidValue {
            key,
            value: raw.to_owned(),
            reason: "expected a positive number of milliseconds",
        })
}
