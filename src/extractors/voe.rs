//! VOE embed pages

use std::sync::OnceLock;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;

use super::{hls, LinkResolver, ResolveError};
use crate::models::VideoDescriptor;
use crate::scraper::Fetcher;

pub struct Voe;

fn hls_source() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'hls':\s*'([^']+)'").expect("valid voe regex"))
}

/// Master playlist URL from the page source, decoding it if it is base64
pub fn master_url(html: &str) -> Result<String, ResolveError> {
    let raw = hls_source()
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(ResolveError::Missing("hls source"))?;

    if raw.starts_with("http") {
        return Ok(raw.to_string());
    }

    let bytes = STANDARD
        .decode(raw)
        .map_err(|e| ResolveError::Decode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ResolveError::Decode(e.to_string()))
}

#[async_trait]
impl LinkResolver for Voe {
    fn name(&self) -> &'static str {
        "VOE"
    }

    fn host_key(&self) -> &'static str {
        "voe"
    }

    async fn resolve(
        &self,
        fetcher: &dyn Fetcher,
        link: &str,
        label_prefix: &str,
    ) -> Result<Vec<VideoDescriptor>, ResolveError> {
        let html = fetcher.fetch(link, &[]).await?;
        let master = master_url(&html)?;
        hls::expand(fetcher, &master, label_prefix, &[]).await
    }
}
