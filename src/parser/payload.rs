//! Typed schemas for the JSON payload embedded in `div#app[data-page]`
//!
//! Each page kind gets its own props struct so a shape change on one page
//! surfaces as a decode failure for that page only.

use scraper::Html;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;

use super::{selector, ParseError};

pub const APP_ANCHOR: &str = "div#app";
pub const DATA_ATTRIBUTE: &str = "data-page";

/// Reads the raw payload out of the anchor attribute.
///
/// The HTML parser already decodes entities such as `&quot;`.
pub fn extract_payload(html: &str) -> Result<String, ParseError> {
    let document = Html::parse_document(html);
    document
        .select(&selector(APP_ANCHOR))
        .next()
        .ok_or(ParseError::MissingAnchor(APP_ANCHOR))?
        .value()
        .attr(DATA_ATTRIBUTE)
        .map(str::to_string)
        .ok_or(ParseError::MissingAnchor(DATA_ATTRIBUTE))
}

/// Extracts and decodes the payload's `props` object
pub fn decode_props<P: DeserializeOwned>(html: &str) -> Result<P, ParseError> {
    let raw = extract_payload(html)?;
    let envelope: Envelope<P> = serde_json::from_str(&raw)?;
    Ok(envelope.props)
}

#[derive(Debug, Deserialize)]
pub struct Envelope<P> {
    pub props: P,
}

#[derive(Debug, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: PageMeta,
    #[serde(default)]
    pub links: PageLinks,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub last_page: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

// ----- catalog pages -----

#[derive(Debug, Deserialize)]
pub struct CatalogProps {
    pub anime_list: Paginated<CatalogItem>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogItem {
    pub title: String,
    #[serde(default)]
    pub cover: String,
    #[serde(deserialize_with = "string_or_number")]
    pub slug: String,
}

// ----- detail pages -----

#[derive(Debug, Deserialize)]
pub struct DetailProps {
    pub anime: AnimePayload,
}

#[derive(Debug, Deserialize)]
pub struct AnimePayload {
    pub title: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub genre_list: Vec<Named>,
    #[serde(default)]
    pub production_list: Vec<Named>,
    #[serde(default)]
    pub source_list: Vec<Named>,
    #[serde(default)]
    pub status: Named,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content_rating: Named,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Named,
}

// ----- episode index pages -----

#[derive(Debug, Deserialize)]
pub struct EpisodeListProps {
    pub episode_list: Paginated<EpisodeItem>,
}

#[derive(Debug, Deserialize)]
pub struct EpisodeItem {
    #[serde(deserialize_with = "string_or_number")]
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    pub sort: f32,
    #[serde(default)]
    pub release_date: Option<String>,
}

// ----- episode (video) pages -----

#[derive(Debug, Deserialize)]
pub struct VideoProps {
    pub video_list: VideoList,
}

#[derive(Debug, Deserialize)]
pub struct VideoList {
    pub data: Vec<VideoSourceItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoSourceItem {
    pub title: String,
    pub sort: f32,
    pub audio: AudioItem,
    #[serde(default)]
    pub source: Named,
    #[serde(default)]
    pub mirror: Vec<MirrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct AudioItem {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct MirrorItem {
    #[serde(deserialize_with = "string_or_number")]
    pub resolution: String,
    pub code: MirrorCode,
}

#[derive(Debug, Deserialize)]
pub struct MirrorCode {
    pub file: String,
}

/// Accepts `"12"` as well as `12` for identifier-like fields
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
