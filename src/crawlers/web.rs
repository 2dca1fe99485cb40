//! HTTP fetcher with retry and exponential backoff on transient failures.

use crate::config::CrawlerConfig;
use crate::crawlers::fetcher::Fetcher;
use crate::error::FetchFailure;
use crate::utils::{Sleeper, TokioSleeper, backoff_delay};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Default number of attempts per fetch, including the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for the backoff sequence
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Retry bound and backoff base for one fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF_BASE)
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before attempt `attempt_index` (0-based); zero for the first attempt
    pub fn delay_before(&self, attempt_index: u32) -> Duration {
        if attempt_index == 0 {
            Duration::ZERO
        } else {
            backoff_delay(self.base_delay, attempt_index)
        }
    }
}

/// Result of a single request, before retry handling
#[derive(Debug)]
enum Attempt {
    Body(String),
    NotFound,
    Transient(String),
    Permanent { status: Option<u16>, reason: String },
}

/// Status classes that are worth retrying
fn is_transient_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Network-level errors (timeout, reset, DNS) are transient; the rest are not
fn is_transient_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

/// Shared-client fetcher sending a fixed identity on every request
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl HttpFetcher {
    /// Build a fetcher from the crawler configuration.
    ///
    /// The referer is the site origin; the client is created once and shared.
    pub fn from_config(config: &CrawlerConfig, referer: &str) -> Result<Self, reqwest::Error> {
        let client = build_client(
            &config.user_agent,
            referer,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.backoff_base_ms),
        );
        Ok(Self::with_client(client, policy))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if is_transient_error(&e) => return Attempt::Transient(e.to_string()),
            Err(e) => {
                return Attempt::Permanent {
                    status: None,
                    reason: e.to_string(),
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.text().await {
                Ok(body) => Attempt::Body(body),
                Err(e) => Attempt::Transient(format!("failed reading body: {}", e)),
            };
        }

        if status == StatusCode::NOT_FOUND {
            Attempt::NotFound
        } else if is_transient_status(status) {
            Attempt::Transient(format!("HTTP {}", status.as_u16()))
        } else {
            Attempt::Permanent {
                status: Some(status.as_u16()),
                reason: format!("HTTP {}", status.as_u16()),
            }
        }
    }
}

/// Builds the shared client with user agent and referer on every request
pub fn build_client(
    user_agent: &str,
    referer: &str,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    match HeaderValue::from_str(referer) {
        Ok(value) => {
            headers.insert(REFERER, value);
        }
        Err(e) => ::log::warn!("Referer {:?} is not a valid header value: {}", referer, e),
    }

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(timeout)
        .build()
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure> {
        let max_attempts = self.policy.max_attempts();
        let mut last_error = String::new();

        for attempt_index in 0..max_attempts {
            let delay = self.policy.delay_before(attempt_index);
            if !delay.is_zero() {
                ::log::debug!(
                    "Retrying {} in {:?} (attempt {} of {})",
                    url,
                    delay,
                    attempt_index + 1,
                    max_attempts
                );
                self.sleeper.sleep(delay).await;
            }

            match self.attempt(url).await {
                Attempt::Body(body) => {
                    ::log::trace!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                Attempt::NotFound => {
                    ::log::debug!("Not found: {}", url);
                    return Err(FetchFailure::NotFound {
                        url: url.to_string(),
                    });
                }
                Attempt::Permanent { status, reason } => {
                    ::log::debug!("Permanent failure for {}: {}", url, reason);
                    return Err(FetchFailure::Permanent {
                        url: url.to_string(),
                        status,
                        reason,
                    });
                }
                Attempt::Transient(reason) => {
                    ::log::warn!(
                        "Transient failure for {} (attempt {} of {}): {}",
                        url,
                        attempt_index + 1,
                        max_attempts,
                        reason
                    );
                    last_error = reason;
                }
            }
        }

        Err(FetchFailure::Exhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }
}
