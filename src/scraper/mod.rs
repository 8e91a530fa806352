//! Scraper module for fetching documents from catalog sites and mirror hosts
//!
//! This module provides the transport collaborator used by every other layer:
//! a [`Fetcher`] trait that turns a URL plus extra headers into a raw document,
//! and [`Scraper`], the reqwest-backed implementation with browser-like
//! headers, user agent rotation, polite delays and retry with backoff.

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Errors that can occur during fetch operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScraperError {
    /// Network-related errors (connection refused, DNS failure, etc.)
    #[error("Failed to connect to server: {0}")]
    NetworkError(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// HTTP non-200 status code errors
    #[error("Server returned status {0}")]
    HttpError(u16),

    /// Error reading response body
    #[error("Failed to read response body: {0}")]
    ResponseError(String),

    /// Rate limited by server
    #[error("Rate limited, retry after delay")]
    RateLimited,

    /// The URL could not be parsed or built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Transport collaborator: fetches a document with optional extra headers.
///
/// Any site specific bot mitigation belongs behind this trait; callers only
/// ever see the final document body.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, ScraperError>;
}

/// Configuration for request pacing and retries
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Minimum delay between requests in milliseconds
    pub min_delay_ms: u64,
    /// Maximum delay between requests in milliseconds
    pub max_delay_ms: u64,
    /// Whether to rotate user agents
    pub rotate_user_agent: bool,
    /// Maximum attempts per request
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds
    pub backoff_base_ms: u64,
    /// Total request timeout
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 250,
            max_delay_ms: 1000,
            rotate_user_agent: true,
            max_retries: 3,
            backoff_base_ms: 1000,
            timeout: Duration::from_secs(30),
        }
    }
}

/// List of realistic user agents for rotation
/// Upper bound for a single backoff wait
pub const MAX_BACKOFF_MS: u64 = 60_000;

const USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Firefox on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// HTTP client for fetching pages with pacing and retries
pub struct Scraper {
    client: Client,
    config: ScraperConfig,
    request_count: AtomicUsize,
}

impl Scraper {
    /// Create a new Scraper with default configuration
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_config(ScraperConfig::default())
    }

    /// Create a new Scraper with custom configuration
    pub fn with_config(config: ScraperConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScraperError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            config,
            request_count: AtomicUsize::new(0),
        })
    }

    /// Get a random user agent from the list
    fn get_user_agent(&self) -> &'static str {
        if self.config.rotate_user_agent {
            let idx = rand::thread_rng().gen_range(0..USER_AGENTS.len());
            USER_AGENTS[idx]
        } else {
            USER_AGENTS[0]
        }
    }

    /// Apply random delay between requests
    async fn apply_delay(&self) {
        if self.config.max_delay_ms == 0 {
            return;
        }
        let min = self.config.min_delay_ms.min(self.config.max_delay_ms);
        let delay = rand::thread_rng().gen_range(min..=self.config.max_delay_ms);
        sleep(Duration::from_millis(delay)).await;
    }

    /// Exponential backoff for a retry attempt, capped at [`MAX_BACKOFF_MS`]
    fn backoff_ms(&self, attempt: u32) -> u64 {
        2u64.checked_pow(attempt)
            .and_then(|factor| self.config.backoff_base_ms.checked_mul(factor))
            .map_or(MAX_BACKOFF_MS, |delay| delay.min(MAX_BACKOFF_MS))
    }

    /// Apply exponential backoff delay
    async fn apply_backoff(&self, attempt: u32) {
        let jitter = rand::thread_rng().gen_range(0..500);
        sleep(Duration::from_millis(self.backoff_ms(attempt) + jitter)).await;
    }

    /// Fetch a page, retrying on rate limiting, 5xx responses and timeouts
    pub async fn fetch_page(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<String, ScraperError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        if count > 0 {
            self.apply_delay().await;
        }

        let mut last_error = None;

        for attempt in 0..self.config.max_retries.max(1) {
            if attempt > 0 {
                self.apply_backoff(attempt).await;
            }

            match self.do_fetch(url, headers).await {
                Ok(body) => return Ok(body),
                Err(err) if is_retryable(&err) => {
                    tracing::warn!(url, attempt = attempt + 1, "{}, retrying", err);
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or(ScraperError::NetworkError("Max retries exceeded".to_string())))
    }

    async fn do_fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, ScraperError> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", self.get_user_agent())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9,es;q=0.8");

        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScraperError::Timeout(url.to_string())
            } else if e.is_connect() {
                ScraperError::NetworkError("Failed to connect to server".to_string())
            } else if e.is_builder() {
                ScraperError::InvalidUrl(url.to_string())
            } else {
                ScraperError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ScraperError::RateLimited);
        }
        if !status.is_success() {
            return Err(ScraperError::HttpError(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ScraperError::ResponseError(e.to_string()))
    }

    /// Get current request count
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for Scraper {
    async fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, ScraperError> {
        self.fetch_page(url, headers).await
    }
}

fn is_retryable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited | ScraperError::Timeout(_) => true,
        ScraperError::HttpError(status) => *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher used by tests across the crate.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        pub requests: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        pub fn request_log(&self) -> Vec<String> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str, _headers: &[(&str, &str)]) -> Result<String, ScraperError> {
            if let Ok(mut log) = self.requests.lock() {
                log.push(url.to_string());
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or(ScraperError::HttpError(404))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scraper_creation() {
        let scraper = Scraper::new().unwrap();
        assert_eq!(scraper.request_count(), 0);
    }

    #[test]
    fn test_scraper_with_config() {
        let config = ScraperConfig {
            min_delay_ms: 500,
            max_delay_ms: 1500,
            rotate_user_agent: false,
            max_retries: 5,
            backoff_base_ms: 2000,
            timeout: Duration::from_secs(5),
        };
        let scraper = Scraper::with_config(config).unwrap();
        assert_eq!(scraper.config.min_delay_ms, 500);
        assert_eq!(scraper.config.max_retries, 5);
        assert_eq!(scraper.get_user_agent(), USER_AGENTS[0]);
    }

    #[test]
    fn test_backoff_is_capped() {
        let scraper = Scraper::new().unwrap();
        assert_eq!(scraper.backoff_ms(0), 1000);
        assert_eq!(scraper.backoff_ms(3), 8000);
        assert_eq!(scraper.backoff_ms(10), MAX_BACKOFF_MS);
        assert_eq!(scraper.backoff_ms(64), MAX_BACKOFF_MS);
        assert_eq!(scraper.backoff_ms(u32::MAX), MAX_BACKOFF_MS);
    }

    #[test]
    fn test_user_agent_rotation() {
        let scraper = Scraper::new().unwrap();
        let ua = scraper.get_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable(&ScraperError::RateLimited));
        assert!(is_retryable(&ScraperError::HttpError(503)));
        assert!(is_retryable(&ScraperError::Timeout("x".into())));
        assert!(!is_retryable(&ScraperError::HttpError(404)));
        assert!(!is_retryable(&ScraperError::NetworkError("refused".into())));
    }

    #[tokio::test]
    async fn test_static_fetcher_serves_known_pages() {
        let fetcher = testing::StaticFetcher::new().with_page("https://a.test/1", "one");
        assert_eq!(fetcher.fetch("https://a.test/1", &[]).await.unwrap(), "one");
        assert_eq!(
            fetcher.fetch("https://a.test/2", &[]).await,
            Err(ScraperError::HttpError(404))
        );
        assert_eq!(fetcher.request_log().len(), 2);
    }
}
