//! Mirror host resolvers
//!
//! Server rows on an episode page name a host and carry an embed link. Each
//! supported host has a [`LinkResolver`] that turns that link into playable
//! descriptors. [`MirrorExtractor`] dispatches rows to resolvers through a
//! fixed, ordered registry and runs them concurrently.

pub mod dood;
pub mod filemoon;
pub mod hls;
pub mod streamtape;
pub mod streamwish;
pub mod unpacker;
pub mod voe;

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{LanguageTag, MirrorCandidate, VideoDescriptor, WeightedVideo};
use crate::parser::ServerRow;
use crate::scraper::{Fetcher, ScraperError};

/// Default number of resolvers allowed to run at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default time budget for a single resolver
pub const DEFAULT_RESOLVER_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors raised inside a single resolver; never escape the extractor
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Transport(#[from] ScraperError),

    /// The host page no longer carries the marker the resolver looks for
    #[error("{0} not found in host page")]
    Missing(&'static str),

    #[error("Unusable link: {0}")]
    BadLink(String),

    #[error("Could not decode: {0}")]
    Decode(String),
}

/// Turns one host link into zero or more playable descriptors
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Display name used as the start of every label, e.g. "StreamTape"
    fn name(&self) -> &'static str;

    /// Substring of a server name that selects this resolver
    fn host_key(&self) -> &'static str;

    async fn resolve(
        &self,
        fetcher: &dyn Fetcher,
        link: &str,
        label_prefix: &str,
    ) -> Result<Vec<VideoDescriptor>, ResolveError>;
}

/// Resolvers in dispatch order; the first whose key matches wins
pub fn default_registry() -> Vec<Box<dyn LinkResolver>> {
    vec![
        Box::new(streamtape::StreamTape),
        Box::new(voe::Voe),
        Box::new(filemoon::Filemoon),
        Box::new(streamwish::StreamWish),
        Box::new(dood::Dood),
    ]
}

/// Resolves server rows into descriptors with bounded concurrency
pub struct MirrorExtractor {
    resolvers: Vec<Box<dyn LinkResolver>>,
    concurrency: usize,
    timeout: Duration,
}

impl Default for MirrorExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY, DEFAULT_RESOLVER_TIMEOUT)
    }
}

impl MirrorExtractor {
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self::with_resolvers(default_registry(), concurrency, timeout)
    }

    pub fn with_resolvers(
        resolvers: Vec<Box<dyn LinkResolver>>,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            resolvers,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Pair each row with the index of the first resolver whose key its
    /// server name contains
    ///
    /// Rows naming an unregistered host are dropped.
    fn dispatch(&self, rows: Vec<ServerRow>) -> Vec<(usize, MirrorCandidate)> {
        rows.into_iter()
            .filter_map(|row| {
                let Some(index) = self
                    .resolvers
                    .iter()
                    .position(|r| row.server.contains(r.host_key()))
                else {
                    debug!(server = %row.server, "No resolver for server, skipping");
                    return None;
                };
                let candidate = MirrorCandidate {
                    language: LanguageTag::from_server_name(&row.server),
                    source_host: row.server,
                    raw_link: row.link,
                };
                Some((index, candidate))
            })
            .collect()
    }

    /// Run one resolver under the time budget; failures yield nothing
    async fn resolve_one(
        &self,
        fetcher: &dyn Fetcher,
        index: usize,
        candidate: MirrorCandidate,
    ) -> Vec<VideoDescriptor> {
        let resolver = &self.resolvers[index];
        let prefix = format!("{} {}", resolver.name(), candidate.language);
        let outcome = tokio::time::timeout(
            self.timeout,
            resolver.resolve(fetcher, &candidate.raw_link, &prefix),
        )
        .await;

        match outcome {
            Ok(Ok(videos)) => videos,
            Ok(Err(err)) => {
                warn!(host = resolver.name(), link = %candidate.raw_link, error = %err, "Resolver failed");
                Vec::new()
            }
            Err(_) => {
                warn!(host = resolver.name(), link = %candidate.raw_link, "Resolver timed out");
                Vec::new()
            }
        }
    }

    /// Resolve every dispatchable row, keeping row order in the output
    ///
    /// A resolver that errors or exceeds its time budget contributes nothing.
    pub async fn resolve(&self, fetcher: &dyn Fetcher, rows: Vec<ServerRow>) -> Vec<WeightedVideo> {
        let jobs = self.dispatch(rows);

        let resolved: Vec<Vec<VideoDescriptor>> = stream::iter(jobs)
            .map(|(index, candidate)| self.resolve_one(fetcher, index, candidate))
            .buffered(self.concurrency)
            .collect()
            .await;

        resolved
            .into_iter()
            .flatten()
            .map(WeightedVideo::unweighted)
            .collect()
    }
}

/// Scheme plus host of a URL with a trailing slash, used as a Referer value
pub(crate) fn origin_of(link: &str) -> Result<String, ResolveError> {
    let url = url::Url::parse(link).map_err(|_| ResolveError::BadLink(link.to_string()))?;
    match url.host_str() {
        Some(host) => Ok(format!("{}://{}/", url.scheme(), host)),
        None => Err(ResolveError::BadLink(link.to_string())),
    }
}
