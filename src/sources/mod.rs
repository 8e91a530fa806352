//! Catalog sources
//!
//! A [`Source`] binds one site's URLs, parsing strategy, ranking rules and
//! preference keys behind a single interface. [`SourceRegistry`] holds the
//! configured sources and looks them up by id.

pub mod hackstore;
pub mod marinmoe;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::SourceError;
use crate::extractors::MirrorExtractor;
use crate::models::{
    CatalogEntry, CatalogPage, EntryDetail, Episode, RankingPreferences, SearchFilters,
    SourceInfo, VideoDescriptor,
};
use crate::preferences::PreferenceKeys;
use crate::scraper::Fetcher;

pub use hackstore::Hackstore;
pub use marinmoe::MarinMoe;

/// One catalog site
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable id used in API paths
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn base_url(&self) -> &str;

    fn supports_text_search(&self) -> bool;

    /// Preference keys and defaults this source ranks with
    fn preference_keys(&self) -> PreferenceKeys;

    async fn popular(&self, page: u32) -> Result<CatalogPage, SourceError>;

    async fn latest(&self, page: u32) -> Result<CatalogPage, SourceError>;

    /// Text search, or a direct lookup when the query is `id:<identifier>`
    ///
    /// Filters only narrow a text search.
    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<CatalogPage, SourceError>;

    async fn detail(&self, path: &str) -> Result<EntryDetail, SourceError>;

    /// Every episode of an entry, highest number first
    async fn episodes(&self, path: &str) -> Result<Vec<Episode>, SourceError>;

    /// Playable videos of one episode, best first
    async fn videos(
        &self,
        path: &str,
        preferences: &RankingPreferences,
    ) -> Result<Vec<VideoDescriptor>, SourceError>;

    fn info(&self) -> SourceInfo {
        SourceInfo {
            id: self.id().to_string(),
            name: self.name().to_string(),
            base_url: self.base_url().to_string(),
            supports_text_search: self.supports_text_search(),
        }
    }
}

/// One-entry page for an `id:` lookup
pub(crate) fn single_entry_page(detail: EntryDetail, relative_url: String) -> CatalogPage {
    CatalogPage {
        entries: vec![CatalogEntry {
            title: detail.title,
            cover_url: detail.cover_url,
            relative_url,
        }],
        has_next: false,
    }
}

/// The configured sources, in listing order
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<Arc<dyn Source>>) -> Self {
        Self { sources }
    }

    /// Both built-in sources sharing one fetcher
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetcher>) -> Self {
        let extractor = MirrorExtractor::new(
            config.resolver_concurrency,
            Duration::from_secs(config.resolver_timeout_secs),
        );
        Self::new(vec![
            Arc::new(
                MarinMoe::new(fetcher.clone(), &config.marinmoe_base_url)
                    .with_max_pages(config.episode_page_limit),
            ),
            Arc::new(Hackstore::new(fetcher, &config.hackstore_base_url, extractor)),
        ])
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Source>, SourceError> {
        self.sources
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or_else(|| SourceError::UnknownSource(id.to_string()))
    }

    pub fn list(&self) -> Vec<SourceInfo> {
        self.sources.iter().map(|s| s.info()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::StaticFetcher;

    fn registry() -> SourceRegistry {
        let config = Config::from_vars(Vec::new()).unwrap();
        SourceRegistry::from_config(&config, Arc::new(StaticFetcher::new()))
    }

    #[test]
    fn test_registry_lookup() {
        let registry = registry();
        assert_eq!(registry.get("marinmoe").unwrap().name(), "Marin");
        assert_eq!(registry.get("hackstore").unwrap().name(), "Hackstore");
        assert!(matches!(
            registry.get("nope").err(),
            Some(SourceError::UnknownSource(id)) if id == "nope"
        ));
    }

    #[test]
    fn test_registry_listing() {
        let infos = registry().list();
        let ids: Vec<_> = infos.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["marinmoe", "hackstore"]);
        assert!(infos[0].supports_text_search);
        assert!(!infos[1].supports_text_search);
    }
}
