//! Movie site rendered as plain HTML; mirrors are server rows per host

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{single_entry_page, Source};
use crate::constants::{absolute_url, hackstore, id_query};
use crate::error::SourceError;
use crate::extractors::MirrorExtractor;
use crate::models::{
    CatalogPage, EntryDetail, Episode, RankingPreferences, SearchFilters, VideoDescriptor,
};
use crate::parser::{movie_episode, parse_catalog_dom, parse_detail_dom, parse_server_rows};
use crate::preferences::PreferenceKeys;
use crate::ranking::{CaseRule, MirrorRanker};
use crate::scraper::Fetcher;

pub struct Hackstore {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    extractor: MirrorExtractor,
}

impl Hackstore {
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: &str, extractor: MirrorExtractor) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            extractor,
        }
    }

    /// Region token matched exactly, server token case-insensitively
    fn ranker() -> MirrorRanker {
        MirrorRanker::new(CaseRule::Sensitive, CaseRule::Insensitive)
    }

    async fn listing(&self, page: u32) -> Result<CatalogPage, SourceError> {
        let url = hackstore::listing(&self.base_url, page);
        let html = self.fetcher.fetch(&url, &[]).await?;
        let page = parse_catalog_dom(&html);
        info!(url = %url, entries = page.entries.len(), has_next = page.has_next, "Parsed catalog page");
        Ok(page)
    }
}

#[async_trait]
impl Source for Hackstore {
    fn id(&self) -> &'static str {
        "hackstore"
    }

    fn name(&self) -> &'static str {
        "Hackstore"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn supports_text_search(&self) -> bool {
        false
    }

    fn preference_keys(&self) -> PreferenceKeys {
        PreferenceKeys::REGION_SERVER
    }

    async fn popular(&self, page: u32) -> Result<CatalogPage, SourceError> {
        self.listing(page).await
    }

    async fn latest(&self, page: u32) -> Result<CatalogPage, SourceError> {
        self.listing(page).await
    }

    async fn search(
        &self,
        _page: u32,
        query: &str,
        _filters: &SearchFilters,
    ) -> Result<CatalogPage, SourceError> {
        let Some(id) = id_query(query) else {
            return Err(SourceError::Unsupported("text search"));
        };
        let path = hackstore::entry_path(id);
        let detail = self.detail(&path).await?;
        Ok(single_entry_page(detail, path))
    }

    async fn detail(&self, path: &str) -> Result<EntryDetail, SourceError> {
        let url = absolute_url(&self.base_url, path);
        let html = self.fetcher.fetch(&url, &[]).await?;
        Ok(parse_detail_dom(&html))
    }

    /// A movie has exactly one playable item: the entry page itself
    async fn episodes(&self, path: &str) -> Result<Vec<Episode>, SourceError> {
        Ok(vec![movie_episode(path)])
    }

    async fn videos(
        &self,
        path: &str,
        preferences: &RankingPreferences,
    ) -> Result<Vec<VideoDescriptor>, SourceError> {
        let url = absolute_url(&self.base_url, path);
        let html = self.fetcher.fetch(&url, &[]).await?;
        let rows = parse_server_rows(&html);
        info!(url = %url, rows = rows.len(), "Resolving server rows");

        let candidates = self.extractor.resolve(self.fetcher.as_ref(), rows).await;
        Ok(Self::ranker().rank(candidates, preferences))
    }
}
