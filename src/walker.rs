//! Episode index walking
//!
//! The index is a chain of pages linked by "next" pointers, so it can only be
//! walked sequentially: fetch, parse, follow. The walk ends when a page has
//! no next link. A next link that points at a page already fetched aborts
//! the walk instead of looping forever.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::SourceError;
use crate::models::Episode;
use crate::parser::{recover, EpisodePage, ParseError};
use crate::scraper::Fetcher;

/// Walks a paginated episode index to completion
pub struct EpisodeWalker<'a> {
    fetcher: &'a dyn Fetcher,
    max_pages: Option<usize>,
}

impl<'a> EpisodeWalker<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            max_pages: None,
        }
    }

    /// Cap the number of pages fetched; `None` walks until the index ends
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Collect every episode reachable from the start page, highest number first
    ///
    /// `start_document` is the already-fetched body of `start_url`; `parse`
    /// turns one page body into its episodes and next link.
    pub async fn collect<F>(
        &self,
        start_url: &str,
        start_document: &str,
        parse: F,
    ) -> Result<Vec<Episode>, SourceError>
    where
        F: Fn(&str) -> Result<EpisodePage, ParseError>,
    {
        let mut visited = HashSet::new();
        visited.insert(start_url.to_string());

        let mut page = recover(parse(start_document), start_url)?;
        let mut episodes = std::mem::take(&mut page.episodes);
        let mut current_url = start_url.to_string();
        let mut pages = 1usize;

        while let Some(next) = page.next.take() {
            let next_url = resolve_link(&current_url, &next);
            if !visited.insert(next_url.clone()) {
                return Err(SourceError::PaginationCycle { url: next_url });
            }
            if let Some(limit) = self.max_pages {
                if pages >= limit {
                    return Err(SourceError::PageLimit { limit });
                }
            }

            debug!(url = %next_url, page = pages + 1, "Fetching next episode page");
            let body = self.fetcher.fetch(&next_url, &[]).await?;
            page = recover(parse(&body), &next_url)?;
            episodes.append(&mut page.episodes);
            current_url = next_url;
            pages += 1;
        }

        info!(pages, episodes = episodes.len(), "Episode index complete");
        sort_by_number_desc(&mut episodes);
        Ok(episodes)
    }
}

/// Stable sort, most recent (highest number) first
pub fn sort_by_number_desc(episodes: &mut [Episode]) {
    episodes.sort_by(|a, b| b.number.total_cmp(&a.number));
}

/// Resolves a possibly relative next link against the page it came from
fn resolve_link(current: &str, next: &str) -> String {
    url::Url::parse(current)
        .and_then(|base| base.join(next))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| next.to_string())
}
