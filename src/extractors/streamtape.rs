//! StreamTape embed pages

use async_trait::async_trait;
use scraper::Html;

use super::{LinkResolver, ResolveError};
use crate::models::VideoDescriptor;
use crate::parser::selector;
use crate::scraper::Fetcher;

const EMBED_BASE: &str = "https://streamtape.com/e/";
const ROBOT_MARKER: &str = "document.getElementById('robotlink')";
const HEAD_START: &str = "innerHTML = '";
const TAIL_START: &str = "+ ('xcd";

pub struct StreamTape;

/// Canonical embed URL for any `/e/<id>` or `/v/<id>` link
pub fn embed_url(link: &str) -> Option<String> {
    let (_, rest) = link.split_once("/e/").or_else(|| link.split_once("/v/"))?;
    let id = rest.split(['/', '?', '#']).next().filter(|id| !id.is_empty())?;
    Some(format!("{EMBED_BASE}{id}"))
}

/// Rebuild the direct video URL from the robotlink script
pub fn video_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let scripts = selector("script");
    let script = document
        .select(&scripts)
        .map(|s| s.text().collect::<String>())
        .find(|text| text.contains(ROBOT_MARKER))?;

    let after_marker = &script[script.find(ROBOT_MARKER)?..];
    let head_start = after_marker.find(HEAD_START)? + HEAD_START.len();
    let head_rest = &after_marker[head_start..];
    let head = &head_rest[..head_rest.find('\'')?];

    let tail_start = head_rest.find(TAIL_START)? + TAIL_START.len();
    let tail_rest = &head_rest[tail_start..];
    let tail = &tail_rest[..tail_rest.find('\'')?];

    Some(format!("https:{head}{tail}"))
}

#[async_trait]
impl LinkResolver for StreamTape {
    fn name(&self) -> &'static str {
        "StreamTape"
    }

    fn host_key(&self) -> &'static str {
        "streamtape"
    }

    async fn resolve(
        &self,
        fetcher: &dyn Fetcher,
        link: &str,
        label_prefix: &str,
    ) -> Result<Vec<VideoDescriptor>, ResolveError> {
        let embed = embed_url(link).ok_or_else(|| ResolveError::BadLink(link.to_string()))?;
        let html = fetcher.fetch(&embed, &[]).await?;
        let url = video_url(&html).ok_or(ResolveError::Missing("robotlink script"))?;
        Ok(vec![VideoDescriptor::new(url, label_prefix, "")])
    }
}
