//! Listing page parsers

use scraper::Html;

use super::payload::{decode_props, CatalogProps};
use super::{element_text, relative_path, selector, ParseError};
use crate::models::{CatalogEntry, CatalogPage};

/// Parse a listing page carrying the embedded JSON payload
///
/// Entries map to `/anime/<slug>`; more pages exist while
/// `meta.current_page < meta.last_page`.
pub fn parse_catalog_json(html: &str) -> Result<CatalogPage, ParseError> {
    let props: CatalogProps = decode_props(html)?;
    let list = props.anime_list;

    let entries = list
        .data
        .into_iter()
        .map(|item| CatalogEntry {
            title: item.title,
            cover_url: item.cover,
            relative_url: format!("/anime/{}", item.slug),
        })
        .collect();

    Ok(CatalogPage {
        entries,
        has_next: list.meta.current_page < list.meta.last_page,
    })
}

/// Parse a listing page rendered as `div.movie-thumbnail` cards
///
/// Another page exists when the `div.wp-pagenavi` pager is present.
pub fn parse_catalog_dom(html: &str) -> CatalogPage {
    let document = Html::parse_document(html);

    let card_selector = selector("div.movie-thumbnail");
    let link_selector = selector("div.movie-back > a");
    let title_selector = selector("h3 > a.movie-title");
    let cover_selector = selector("div.movie-back > a > div.poster-pad > img.imghacks");
    let pager_selector = selector("div.wp-pagenavi");

    let entries = document
        .select(&card_selector)
        .map(|card| {
            let relative_url = card
                .select(&link_selector)
                .next()
                .and_then(|el| el.value().attr("href"))
                .map(relative_path)
                .unwrap_or_default();

            let title = card
                .select(&title_selector)
                .next()
                .map(|el| {
                    el.value()
                        .attr("title")
                        .map(str::to_string)
                        .unwrap_or_else(|| element_text(el))
                })
                .unwrap_or_default();

            let cover_url = card
                .select(&cover_selector)
                .next()
                .and_then(|el| el.value().attr("data-src").or_else(|| el.value().attr("src")))
                .map(str::to_string)
                .unwrap_or_default();

            CatalogEntry {
                title,
                cover_url,
                relative_url,
            }
        })
        .collect();

    CatalogPage {
        entries,
        has_next: document.select(&pager_selector).next().is_some(),
    }
}
