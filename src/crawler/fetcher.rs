//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - HEAD requests to check Content-Type before spending a GET
//! - GET requests with a hard per-page timeout
//! - Retry with exponential backoff for transient failures
//! - Error classification (transient vs permanent)

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::state::PageState;
use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a single request attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("rate limited (HTTP 429)")]
    RateLimited { retry_after: Option<Duration> },

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("too many redirects")]
    RedirectLimit,

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    /// Returns true if another attempt may succeed
    ///
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Timeout | yes |
    /// | HTTP 5xx | yes |
    /// | HTTP 429 | yes (longer backoff) |
    /// | Connection refused/reset | yes |
    /// | Body read interrupted | yes |
    /// | HTTP 4xx (other) | no |
    /// | Redirect chain too long | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::RateLimited { .. } => true,
            Self::Connect(_) | Self::Body(_) | Self::Transport(_) => true,
            Self::Status(code) => *code >= 500,
            Self::RedirectLimit => false,
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_redirect() {
            Self::RedirectLimit
        } else if error.is_connect() {
            Self::Connect(error.to_string())
        } else if error.is_body() || error.is_decode() {
            Self::Body(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// A fetch that ended without a usable page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// The error from the last attempt
    pub error: FetchError,

    /// Number of attempts made (first try included)
    pub attempts: u32,
}

impl FetchFailure {
    /// Number of retries after the first attempt
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// True when a transient error was retried until the limit ran out
    pub fn retries_exhausted(&self) -> bool {
        self.error.is_transient()
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.retries_exhausted() {
            write!(f, "{} (gave up after {} attempts)", self.error, self.attempts)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

/// Why a reachable page was not used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Declared Content-Type is not an HTML document
    NotHtml { content_type: String },

    /// Body too short to hold documentation
    TooSmall { bytes: usize },

    /// A redirect left the seed's host
    OffDomainRedirect { target: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotHtml { content_type } => write!(f, "not HTML ({})", content_type),
            Self::TooSmall { bytes } => write!(f, "page too small ({} bytes)", bytes),
            Self::OffDomainRedirect { target } => write!(f, "redirected off-domain to {}", target),
        }
    }
}

/// Outcome of fetching one page
#[derive(Debug, Clone)]
pub enum FetchStatus {
    /// Successfully fetched an HTML page
    Ok {
        body: String,
        content_type: String,
        http_status: u16,
    },

    /// Reachable but deliberately not used
    Skipped(SkipReason),

    /// Could not be fetched
    Failed(FetchFailure),
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL that was requested
    pub url: Url,

    /// Final URL after redirects
    pub final_url: Url,

    /// Link hops from the seed
    pub depth: u32,

    /// When the last attempt completed
    pub fetched_at: DateTime<Utc>,

    /// Attempts made (first try included)
    pub attempts: u32,

    pub status: FetchStatus,
}

impl FetchResult {
    /// Returns true if the page body is available
    pub fn is_ok(&self) -> bool {
        matches!(self.status, FetchStatus::Ok { .. })
    }

    /// The terminal page state this result maps to
    pub fn page_state(&self) -> PageState {
        match self.status {
            FetchStatus::Ok { .. } => PageState::Extracted,
            FetchStatus::Skipped(_) => PageState::Skipped,
            FetchStatus::Failed(_) => PageState::Failed,
        }
    }

    /// The HTML body, if the fetch succeeded
    pub fn body(&self) -> Option<&str> {
        match &self.status {
            FetchStatus::Ok { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Retry, timeout and filtering rules for the fetcher
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Hard timeout for each HTTP request
    pub page_timeout: Duration,

    /// Total attempts per page (first try included)
    pub retry_limit: u32,

    /// First backoff for transient errors
    pub backoff_base: Duration,

    /// First backoff after HTTP 429
    pub rate_limit_backoff: Duration,

    /// Cap for any single backoff
    pub max_backoff: Duration,

    /// Send HEAD before GET to filter non-HTML resources
    pub head_check: bool,

    /// Bodies shorter than this are skipped
    pub min_page_bytes: usize,
}

impl FetchPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            page_timeout: Duration::from_secs(config.per_page_timeout_seconds),
            retry_limit: config.retry_limit.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            head_check: config.head_check,
            min_page_bytes: config.min_page_bytes,
        }
    }

    /// Delay before retry number `retry` (1-based) after `error`
    ///
    /// Doubles from the base on each retry; 429 starts from the longer
    /// rate-limit base and honours `Retry-After`. Always capped.
    pub fn backoff(&self, retry: u32, error: &FetchError) -> Duration {
        let base = match error {
            FetchError::RateLimited { .. } => self.rate_limit_backoff,
            _ => self.backoff_base,
        };

        let factor = 1u32
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u32::MAX);
        let mut delay = base.saturating_mul(factor);

        if let FetchError::RateLimited {
            retry_after: Some(retry_after),
        } = error
        {
            delay = delay.max(*retry_after);
        }

        delay.min(self.max_backoff)
    }
}

/// Builds an HTTP client with proper configuration
///
/// Per-request timeouts come from the [`FetchPolicy`]; the client only
/// carries the connect timeout and the redirect cap.
///
/// # Example
///
/// ```no_run
/// use module_scout::config::UserAgentConfig;
/// use module_scout::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), 10).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    max_redirects: u32,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(max_redirects as usize))
        .gzip(true)
        .brotli(true)
        .build()
}

/// One step of the per-fetch state machine
#[derive(Debug, Clone, Copy)]
enum Step {
    Fetching { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
}

impl Step {
    fn page_state(&self) -> PageState {
        match self {
            Self::Fetching { .. } => PageState::Fetching,
            Self::Retrying { attempt, .. } => PageState::Retrying(*attempt),
        }
    }
}

/// What a single successful round-trip produced
enum Attempt {
    Page {
        final_url: Url,
        body: String,
        content_type: String,
        http_status: u16,
    },
    Skip {
        final_url: Url,
        reason: SkipReason,
    },
}

/// Fetches pages over HTTP according to a [`FetchPolicy`]
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: FetchPolicy,
}

impl Fetcher {
    pub fn new(client: Client, policy: FetchPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds a fetcher from configuration
    pub fn from_config(
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, crawler.max_redirects)?;
        Ok(Self::new(client, FetchPolicy::from_config(crawler)))
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Returns a copy of this fetcher using a different per-page timeout
    pub fn with_page_timeout(&self, page_timeout: Duration) -> Self {
        let mut fetcher = self.clone();
        fetcher.policy.page_timeout = page_timeout;
        fetcher
    }

    /// Fetches a URL with full error handling and retry logic
    ///
    /// # Request Flow
    ///
    /// 1. Optional HEAD request; a declared non-HTML type ends as `Skipped`
    /// 2. GET request with the per-page timeout, redirects followed
    /// 3. Transient failures move to `Retrying(n)`, sleep, and fetch again
    /// 4. Permanent failures, or transient ones on the last allowed
    ///    attempt, end as `Failed`
    pub async fn fetch(&self, url: &Url, depth: u32) -> FetchResult {
        let mut step = Step::Fetching { attempt: 1 };

        loop {
            tracing::trace!("{} [{}]", url, step.page_state());

            step = match step {
                Step::Fetching { attempt } => match self.attempt_once(url).await {
                    Ok(outcome) => return self.finish(url, depth, attempt, outcome),
                    Err(error) if error.is_transient() && attempt < self.policy.retry_limit => {
                        let delay = self.policy.backoff(attempt, &error);
                        tracing::debug!(
                            "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                            attempt,
                            self.policy.retry_limit,
                            url,
                            error,
                            delay
                        );
                        Step::Retrying { attempt, delay }
                    }
                    Err(error) => {
                        tracing::debug!("Giving up on {} after {} attempt(s): {}", url, attempt, error);
                        return FetchResult {
                            url: url.clone(),
                            final_url: url.clone(),
                            depth,
                            fetched_at: Utc::now(),
                            attempts: attempt,
                            status: FetchStatus::Failed(FetchFailure {
                                error,
                                attempts: attempt,
                            }),
                        };
                    }
                },
                Step::Retrying { attempt, delay } => {
                    tokio::time::sleep(delay).await;
                    Step::Fetching {
                        attempt: attempt + 1,
                    }
                }
            };
        }
    }

    fn finish(&self, url: &Url, depth: u32, attempts: u32, outcome: Attempt) -> FetchResult {
        let (final_url, status) = match outcome {
            Attempt::Page {
                final_url,
                body,
                content_type,
                http_status,
            } => (
                final_url,
                FetchStatus::Ok {
                    body,
                    content_type,
                    http_status,
                },
            ),
            Attempt::Skip { final_url, reason } => (final_url, FetchStatus::Skipped(reason)),
        };

        FetchResult {
            url: url.clone(),
            final_url,
            depth,
            fetched_at: Utc::now(),
            attempts,
            status,
        }
    }

    async fn attempt_once(&self, url: &Url) -> Result<Attempt, FetchError> {
        if self.policy.head_check {
            if let Some(content_type) = self.check_content_type(url).await {
                if !is_html(&content_type) {
                    return Ok(Attempt::Skip {
                        final_url: url.clone(),
                        reason: SkipReason::NotHtml { content_type },
                    });
                }
            }
        }

        let response = self
            .client
            .get(url.clone())
            .timeout(self.policy.page_timeout)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        let final_url = response.url().clone();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited {
                retry_after: retry_after(&response),
            });
        }

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let declared = header_content_type(&response);
        if let Some(content_type) = &declared {
            if !is_html(content_type) {
                return Ok(Attempt::Skip {
                    final_url,
                    reason: SkipReason::NotHtml {
                        content_type: content_type.clone(),
                    },
                });
            }
        }

        let body = response.text().await.map_err(FetchError::from_reqwest)?;

        // Undeclared type: sniff the body instead
        if declared.is_none() && !looks_like_html(&body) {
            return Ok(Attempt::Skip {
                final_url,
                reason: SkipReason::NotHtml {
                    content_type: "unknown".to_string(),
                },
            });
        }

        if body.len() < self.policy.min_page_bytes {
            return Ok(Attempt::Skip {
                final_url,
                reason: SkipReason::TooSmall { bytes: body.len() },
            });
        }

        Ok(Attempt::Page {
            final_url,
            body,
            content_type: declared.unwrap_or_else(|| "text/html".to_string()),
            http_status: status.as_u16(),
        })
    }

    /// Sends a HEAD request to read the declared Content-Type
    ///
    /// Returns None when HEAD is unsupported, fails, or declares nothing;
    /// the GET then decides.
    async fn check_content_type(&self, url: &Url) -> Option<String> {
        match self
            .client
            .head(url.clone())
            .timeout(self.policy.page_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => header_content_type(&response),
            Ok(response) => {
                tracing::trace!("HEAD {} returned {}", url, response.status());
                None
            }
            Err(e) => {
                tracing::trace!("HEAD {} failed: {}", url, e);
                None
            }
        }
    }
}

fn header_content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Returns true for HTML-like media types
pub fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

fn looks_like_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(512).collect();
    let head = head.to_lowercase();
    head.starts_with("<!doctype html") || head.contains("<html") || head.contains("<body")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FetchPolicy {
        FetchPolicy {
            page_timeout: Duration::from_secs(5),
            retry_limit: 3,
            backoff_base: Duration::from_millis(500),
            rate_limit_backoff: Duration::from_millis(2000),
            max_backoff: Duration::from_millis(30_000),
            head_check: true,
            min_page_bytes: 100,
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&UserAgentConfig::default(), 10).is_ok());
    }

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::Status(500).is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(FetchError::RateLimited { retry_after: None }.is_transient());
        assert!(FetchError::Connect("reset".into()).is_transient());

        assert!(!FetchError::Status(404).is_transient());
        assert!(!FetchError::Status(403).is_transient());
        assert!(!FetchError::RedirectLimit.is_transient());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = policy();
        let err = FetchError::Timeout;
        assert_eq!(policy.backoff(1, &err), Duration::from_millis(500));
        assert_eq!(policy.backoff(2, &err), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3, &err), Duration::from_millis(2000));
    }

    #[test]
    fn test_rate_limit_backoff_is_longer() {
        let policy = policy();
        let err = FetchError::RateLimited { retry_after: None };
        assert_eq!(policy.backoff(1, &err), Duration::from_millis(2000));
        assert!(policy.backoff(1, &err) > policy.backoff(1, &FetchError::Status(503)));
    }

    #[test]
    fn test_retry_after_raises_delay() {
        let policy = policy();
        let err = FetchError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(policy.backoff(1, &err), Duration::from_secs(7));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = policy();
        assert_eq!(
            policy.backoff(40, &FetchError::Timeout),
            Duration::from_millis(30_000)
        );
        let err = FetchError::RateLimited {
            retry_after: Some(Duration::from_secs(3600)),
        };
        assert_eq!(policy.backoff(1, &err), Duration::from_millis(30_000));
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("application/xhtml+xml"));
        assert!(!is_html("application/pdf"));
        assert!(!is_html("image/png"));
        assert!(!is_html("text/css"));
    }

    #[test]
    fn test_looks_like_html() {
        assert!(looks_like_html("  <!DOCTYPE html><html></html>"));
        assert!(looks_like_html("<html><body>x</body></html>"));
        assert!(!looks_like_html("%PDF-1.7 binary"));
    }

    #[test]
    fn test_failure_display() {
        let failure = FetchFailure {
            error: FetchError::Timeout,
            attempts: 3,
        };
        assert_eq!(failure.retries(), 2);
        assert_eq!(
            failure.to_string(),
            "request timed out (gave up after 3 attempts)"
        );

        let failure = FetchFailure {
            error: FetchError::Status(404),
            attempts: 1,
        };
        assert_eq!(failure.to_string(), "HTTP 404");
    }
}
