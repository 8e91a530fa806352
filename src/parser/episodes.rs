//! Episode index parsers and upload date handling

use chrono::NaiveDate;

use super::payload::{decode_props, EpisodeListProps};
use super::ParseError;
use crate::models::Episode;

/// Ordinal day suffixes accepted in upload dates such as "2nd of Mar, 2021"
const ORDINAL_SUFFIXES: [&str; 4] = ["th", "nd", "st", "rd"];

/// One page of an episode index plus the link to the following page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodePage {
    pub episodes: Vec<Episode>,
    pub next: Option<String>,
}

/// Parse one page of the paginated episode index
///
/// `entry_url` is the URL of the entry the index belongs to; each watch URL
/// is `<entry_url>/<slug>`. A `null` or empty next link ends the index.
pub fn parse_episode_page_json(html: &str, entry_url: &str) -> Result<EpisodePage, ParseError> {
    let props: EpisodeListProps = decode_props(html)?;
    let list = props.episode_list;
    let base = entry_url.trim_end_matches('/');

    let episodes = list
        .data
        .into_iter()
        .map(|item| {
            let title = item.title.unwrap_or_default();
            Episode {
                display_name: format!("Episode {} {}", item.slug, title).trim().to_string(),
                number: item.sort,
                watch_url: format!("{}/{}", base, item.slug),
                upload_timestamp: item.release_date.as_deref().and_then(parse_upload_date),
            }
        })
        .collect();

    Ok(EpisodePage {
        episodes,
        next: list.links.next.filter(|next| !next.trim().is_empty()),
    })
}

/// The single episode a movie entry exposes
pub fn movie_episode(entry_url: &str) -> Episode {
    Episode {
        display_name: "PELÍCULA".to_string(),
        number: 1.0,
        watch_url: entry_url.to_string(),
        upload_timestamp: None,
    }
}

/// Parse an upload date like "1st of Jan, 2020" into epoch milliseconds (UTC)
///
/// Returns `None` for anything that matches none of the known patterns.
pub fn parse_upload_date(date: &str) -> Option<i64> {
    let date = date.trim();
    ORDINAL_SUFFIXES.iter().find_map(|suffix| {
        let pattern = format!("%d{} of %b, %Y", suffix);
        NaiveDate::parse_from_str(date, &pattern)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
    })
}
