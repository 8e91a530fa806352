//! Data models for the catalog and mirror pipeline
//!
//! This module contains the normalized entities produced by the parsers and
//! resolvers, the ranking preferences, and the API response wrappers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// One listed title on a browsing or search page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Display title
    pub title: String,
    /// Cover / thumbnail image URL
    pub cover_url: String,
    /// Site-relative URL of the entry (e.g. "/anime/some-slug")
    pub relative_url: String,
}

/// One page of catalog entries
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    /// Entries in source order
    pub entries: Vec<CatalogEntry>,
    /// Whether another page can be requested
    pub has_next: bool,
}

impl CatalogPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Publication status of a catalog entry
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum EntryStatus {
    Ongoing,
    Completed,
    #[default]
    Unknown,
}

impl EntryStatus {
    /// Maps the site's status name through the fixed lookup table
    pub fn from_name(name: &str) -> Self {
        match name {
            "Ongoing" => EntryStatus::Ongoing,
            "Completed" => EntryStatus::Completed,
            _ => EntryStatus::Unknown,
        }
    }
}

/// Full metadata for one catalog entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryDetail {
    pub title: String,
    pub cover_url: String,
    /// Genre names, deduplicated, in source order
    pub genres: Vec<String>,
    /// Studios, producers or directors in source order
    pub production_names: Vec<String>,
    pub status: EntryStatus,
    /// Plain-text synopsis followed by metadata lines
    pub description: String,
    pub content_rating: String,
    pub release_date: String,
    pub source_material: String,
}

impl EntryDetail {
    /// Genres rendered the way the site lists them
    pub fn genre_line(&self) -> String {
        self.genres.join(", ")
    }

    /// Production names rendered as a single author line
    pub fn production_line(&self) -> String {
        self.production_names.join(", ")
    }
}

/// An episode discovered while walking the episode index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub display_name: String,
    /// Episode number; fractional values are specials
    pub number: f32,
    pub watch_url: String,
    /// Upload time in milliseconds since the Unix epoch, if known
    pub upload_timestamp: Option<i64>,
}

/// Audio / subtitle marker of a mirror
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
pub enum LanguageTag {
    Latino,
    Castellano,
    Subtitulado,
    Sub,
    Dub,
}

impl LanguageTag {
    /// Derives the region tag from a server-row name
    pub fn from_server_name(server: &str) -> Self {
        if server.contains("latino") {
            LanguageTag::Latino
        } else if server.contains("subtitulado") {
            LanguageTag::Subtitulado
        } else {
            LanguageTag::Castellano
        }
    }

    /// Derives sub/dub from an audio language code ("jp" is the original track)
    pub fn from_audio_code(code: &str) -> Self {
        if code == "jp" {
            LanguageTag::Sub
        } else {
            LanguageTag::Dub
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageTag::Latino => "Latino",
            LanguageTag::Castellano => "Castellano",
            LanguageTag::Subtitulado => "Subtitulado",
            LanguageTag::Sub => "Sub",
            LanguageTag::Dub => "Dub",
        }
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mirror before host resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorCandidate {
    /// Server name as shown on the page
    pub source_host: String,
    pub language: LanguageTag,
    pub raw_link: String,
}

/// A request header the player has to send along with the stream URL
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct VideoHeader {
    pub name: String,
    pub value: String,
}

/// A resolved, playable video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoDescriptor {
    pub playback_url: String,
    /// Human readable label (host, language, resolution, group)
    pub label: String,
    /// Resolution label such as "1080p", empty if unknown
    pub quality_tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<VideoHeader>,
}

impl VideoDescriptor {
    pub fn new(
        playback_url: impl Into<String>,
        label: impl Into<String>,
        quality_tag: impl Into<String>,
    ) -> Self {
        Self {
            playback_url: playback_url.into(),
            label: label.into(),
            quality_tag: quality_tag.into(),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(VideoHeader {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// A descriptor paired with the source priority weight it was listed with
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedVideo {
    pub video: VideoDescriptor,
    pub weight: Option<f32>,
}

impl WeightedVideo {
    pub fn weighted(video: VideoDescriptor, weight: f32) -> Self {
        Self {
            video,
            weight: Some(weight),
        }
    }

    pub fn unweighted(video: VideoDescriptor) -> Self {
        Self {
            video,
            weight: None,
        }
    }
}

/// Group preference meaning "use the site's own source ordering"
pub const SITE_DEFAULT_GROUP: &str = "site_default";

/// Catalog search filters, each holding site-defined ids
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Sort key; the site's search default when unset
    pub sort: Option<String>,
    pub types: Vec<String>,
    pub statuses: Vec<String>,
    pub content_ratings: Vec<String>,
    pub genres: Vec<String>,
    pub sources: Vec<String>,
    /// Release group id
    pub group: Option<String>,
    /// Studio or producer id
    pub production: Option<String>,
}

/// Caller preferences used to rank mirrors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankingPreferences {
    pub preferred_quality: String,
    pub preferred_language: String,
    pub preferred_group: String,
}

impl RankingPreferences {
    /// True when the caller picked a concrete group or server
    pub fn has_group_override(&self) -> bool {
        !self.preferred_group.is_empty() && self.preferred_group != SITE_DEFAULT_GROUP
    }
}

/// A registered catalog source as listed by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
    pub base_url: String,
    /// Whether free text search is available (`id:` lookups always are)
    pub supports_text_search: bool,
}

/// Generic API response wrapper for successful responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the operation was successful (always true for this type)
    pub success: bool,
    /// The response payload
    pub data: T,
    /// ISO timestamp of when data was fetched
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// Create a new successful API response with the current timestamp
    pub fn new(data: T) -> Self {
        Self::with_timestamp(data, Utc::now())
    }

    /// Create a new successful API response with a custom timestamp
    pub fn with_timestamp(data: T, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            data,
            timestamp: timestamp.to_rfc3339(),
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Whether the operation was successful (always false for errors)
    pub success: bool,
    /// Error message describing what went wrong
    pub error: String,
    /// Machine readable error kind
    pub kind: String,
    /// ISO timestamp of when the error occurred
    pub timestamp: String,
}

impl ApiError {
    /// Create a new API error response with the current timestamp
    pub fn new(kind: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            kind: kind.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
