//! Configuration module for the mirror scraper service
//!
//! Handles loading environment variables and application configuration.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::constants::{HACKSTORE_BASE_URL, MARINMOE_BASE_URL};
use crate::extractors::{DEFAULT_CONCURRENCY, DEFAULT_RESOLVER_TIMEOUT};
use crate::preferences::store_from_vars;
use crate::scraper::ScraperConfig;

/// A variable was set to something that does not parse
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Root URL of the embedded-JSON anime site
    pub marinmoe_base_url: String,
    /// Root URL of the DOM movie site
    pub hackstore_base_url: String,
    /// Transport settings for page fetches
    pub fetch: FetchConfig,
    /// Time budget for one mirror resolver, in seconds
    pub resolver_timeout_secs: u64,
    /// Resolvers allowed to run at once
    pub resolver_concurrency: usize,
    /// Optional cap on episode index pages per walk
    pub episode_page_limit: Option<usize>,
    /// Preference values read from `PREF_*` variables
    pub preferences: HashMap<String, String>,
}

/// HTTP fetch pacing and retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Config {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(env::vars())
    }

    /// Build configuration from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let text = |name: &str, default: &str| {
            vars.get(name)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        let defaults = ScraperConfig::default();

        Ok(Self {
            host: text("HOST", "127.0.0.1"),
            port: parse(&vars, "PORT")?.unwrap_or(8080),
            marinmoe_base_url: text("MARINMOE_BASE_URL", MARINMOE_BASE_URL),
            hackstore_base_url: text("HACKSTORE_BASE_URL", HACKSTORE_BASE_URL),
            fetch: FetchConfig {
                timeout_secs: parse(&vars, "FETCH_TIMEOUT_SECS")?
                    .unwrap_or(defaults.timeout.as_secs()),
                max_retries: parse(&vars, "FETCH_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
                min_delay_ms: parse(&vars, "FETCH_MIN_DELAY_MS")?.unwrap_or(defaults.min_delay_ms),
                max_delay_ms: parse(&vars, "FETCH_MAX_DELAY_MS")?.unwrap_or(defaults.max_delay_ms),
            },
            resolver_timeout_secs: parse(&vars, "RESOLVER_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_RESOLVER_TIMEOUT.as_secs()),
            resolver_concurrency: parse(&vars, "RESOLVER_CONCURRENCY")?
                .unwrap_or(DEFAULT_CONCURRENCY),
            episode_page_limit: parse(&vars, "EPISODE_PAGE_LIMIT")?,
            preferences: store_from_vars(vars.clone()),
        })
    }

    /// Transport settings for [`crate::scraper::Scraper`]
    pub fn scraper_config(&self) -> ScraperConfig {
        ScraperConfig {
            min_delay_ms: self.fetch.min_delay_ms,
            max_delay_ms: self.fetch.max_delay_ms,
            max_retries: self.fetch.max_retries,
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            ..ScraperConfig::default()
        }
    }
}

/// Parse an optional variable; unset or blank is `None`, garbage is an error
fn parse<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| ConfigError {
            name,
            value: value.to_string(),
        }),
    }
}
