//! Anime site that embeds its page data as JSON in `div#app[data-page]`

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{single_entry_page, Source};
use crate::constants::{absolute_url, id_query, marinmoe};
use crate::error::SourceError;
use crate::models::{
    CatalogPage, EntryDetail, Episode, RankingPreferences, SearchFilters, VideoDescriptor,
};
use crate::parser::{
    parse_catalog_json, parse_detail_json, parse_episode_page_json, parse_video_sources, recover,
};
use crate::preferences::PreferenceKeys;
use crate::ranking::{CaseRule, MirrorRanker};
use crate::scraper::Fetcher;
use crate::walker::EpisodeWalker;

pub struct MarinMoe {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    max_pages: Option<usize>,
}

impl MarinMoe {
    pub fn new(fetcher: Arc<dyn Fetcher>, base_url: &str) -> Self {
        Self {
            fetcher,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_pages: None,
        }
    }

    /// Cap on episode index pages walked per request
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Sub/dub token matched on the lowercased label, group token exact
    fn ranker() -> MirrorRanker {
        MirrorRanker::new(CaseRule::Insensitive, CaseRule::Sensitive)
    }

    async fn catalog(&self, url: &str) -> Result<CatalogPage, SourceError> {
        let html = self.fetcher.fetch(url, &[]).await?;
        let page = recover(parse_catalog_json(&html), url)?;
        info!(url = %url, entries = page.entries.len(), has_next = page.has_next, "Parsed catalog page");
        Ok(page)
    }
}

#[async_trait]
impl Source for MarinMoe {
    fn id(&self) -> &'static str {
        "marinmoe"
    }

    fn name(&self) -> &'static str {
        "Marin"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn supports_text_search(&self) -> bool {
        true
    }

    fn preference_keys(&self) -> PreferenceKeys {
        PreferenceKeys::SUB_DUB
    }

    async fn popular(&self, page: u32) -> Result<CatalogPage, SourceError> {
        self.catalog(&marinmoe::listing(&self.base_url, marinmoe::SORT_POPULAR, page))
            .await
    }

    async fn latest(&self, page: u32) -> Result<CatalogPage, SourceError> {
        self.catalog(&marinmoe::listing(&self.base_url, marinmoe::SORT_LATEST, page))
            .await
    }

    async fn search(
        &self,
        page: u32,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<CatalogPage, SourceError> {
        if let Some(id) = id_query(query) {
            let path = marinmoe::entry_path(id);
            let detail = self.detail(&path).await?;
            return Ok(single_entry_page(detail, path));
        }
        self.catalog(&marinmoe::search(&self.base_url, query.trim(), page, filters))
            .await
    }

    async fn detail(&self, path: &str) -> Result<EntryDetail, SourceError> {
        let url = absolute_url(&self.base_url, path);
        let html = self.fetcher.fetch(&url, &[]).await?;
        Ok(recover(parse_detail_json(&html), &url)?)
    }

    async fn episodes(&self, path: &str) -> Result<Vec<Episode>, SourceError> {
        let url = absolute_url(&self.base_url, path);
        let html = self.fetcher.fetch(&url, &[]).await?;
        EpisodeWalker::new(self.fetcher.as_ref())
            .with_max_pages(self.max_pages)
            .collect(&url, &html, |document| parse_episode_page_json(document, path))
            .await
    }

    async fn videos(
        &self,
        path: &str,
        preferences: &RankingPreferences,
    ) -> Result<Vec<VideoDescriptor>, SourceError> {
        let url = absolute_url(&self.base_url, path);
        let html = self.fetcher.fetch(&url, &[]).await?;
        let candidates = recover(parse_video_sources(&html), &url)?;
        info!(url = %url, candidates = candidates.len(), "Ranking video sources");
        Ok(Self::ranker().rank(candidates, preferences))
    }
}
