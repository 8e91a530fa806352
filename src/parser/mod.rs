//! Parser module for turning fetched documents into catalog entities
//!
//! Sites use one of two fixed strategies: an embedded JSON payload stored in
//! the `data-page` attribute of `div#app`, or plain DOM selectors. Each page
//! kind has its own submodule; parsing is pure and never touches the network.

pub mod catalog;
pub mod detail;
pub mod episodes;
pub mod mirrors;
pub mod payload;

pub use catalog::{parse_catalog_dom, parse_catalog_json};
pub use detail::{parse_detail_dom, parse_detail_json};
pub use episodes::{movie_episode, parse_episode_page_json, parse_upload_date, EpisodePage};
pub use mirrors::{parse_server_rows, parse_video_sources, ServerRow};

use scraper::{ElementRef, Selector};
use thiserror::Error;

/// Errors raised while reading a document
#[derive(Debug, Error)]
pub enum ParseError {
    /// The fixed anchor (element or attribute) the payload lives under is gone
    #[error("Missing document anchor: {0}")]
    MissingAnchor(&'static str),

    /// The anchor exists but its payload does not match the expected schema
    #[error("Malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Keeps a missing anchor fatal and degrades a malformed payload to an empty value
pub fn recover<T: Default>(result: Result<T, ParseError>, context: &str) -> Result<T, ParseError> {
    match result {
        Err(ParseError::Payload(err)) => {
            tracing::warn!(context, error = %err, "Payload did not decode, returning empty result");
            Ok(T::default())
        }
        other => other,
    }
}

/// Builds a selector from a static CSS string
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|_| panic!("invalid static selector: {css}"))
}

/// Element text with whitespace collapsed, like a browser's `innerText`
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strips scheme and host from an absolute URL, leaving relative input untouched
///
/// Takes a URL like "https://hackstore.rs/peliculas/some-movie/"
/// and returns "/peliculas/some-movie/"
pub fn relative_path(href: &str) -> String {
    match url::Url::parse(href) {
        Ok(parsed) => {
            let mut path = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                path.push('?');
                path.push_str(query);
            }
            if let Some(fragment) = parsed.fragment() {
                path.push('#');
                path.push_str(fragment);
            }
            path
        }
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_strips_domain() {
        assert_eq!(
            relative_path("https://hackstore.rs/peliculas/movie-1/"),
            "/peliculas/movie-1/"
        );
        assert_eq!(relative_path("https://a.test/x?y=1#z"), "/x?y=1#z");
    }

    #[test]
    fn test_relative_path_keeps_relative_input() {
        assert_eq!(relative_path("/anime/slug"), "/anime/slug");
        assert_eq!(relative_path(""), "");
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_recover_degrades_payload_errors_only() {
        let bad = serde_json::from_str::<u32>("nope").unwrap_err();
        let degraded: Result<Vec<u32>, _> = recover(Err(ParseError::Payload(bad)), "test");
        assert!(degraded.unwrap().is_empty());

        let missing: Result<Vec<u32>, _> = recover(Err(ParseError::MissingAnchor("div#app")), "test");
        assert!(matches!(missing, Err(ParseError::MissingAnchor(_))));
    }
}
