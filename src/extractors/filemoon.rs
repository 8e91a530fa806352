//! Filemoon embed pages
//!
//! The player setup is hidden in a packed script; once unpacked it carries
//! the master playlist as `file:"..."`.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use super::{hls, origin_of, unpacker, LinkResolver, ResolveError};
use crate::models::VideoDescriptor;
use crate::scraper::Fetcher;

pub struct Filemoon;

fn file_source() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"file:\s*"([^"]+\.m3u8[^"]*)""#).expect("valid file regex"))
}

/// Playlist URL declared as `file:"...m3u8"` in a script
pub fn playlist_in(script: &str) -> Option<String> {
    file_source()
        .captures(script)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Playlist URL from a page whose player setup is packed
///
/// Pages often carry several packed scripts; the first one declaring a
/// playlist wins.
pub fn packed_playlist(html: &str) -> Result<String, ResolveError> {
    let scripts = unpacker::unpack_all(html);
    if scripts.is_empty() {
        return Err(ResolveError::Missing("packed player script"));
    }
    scripts
        .iter()
        .find_map(|script| playlist_in(script))
        .ok_or(ResolveError::Missing("playlist file"))
}

#[async_trait]
impl LinkResolver for Filemoon {
    fn name(&self) -> &'static str {
        "Filemoon"
    }

    fn host_key(&self) -> &'static str {
        "filemoon"
    }

    async fn resolve(
        &self,
        fetcher: &dyn Fetcher,
        link: &str,
        label_prefix: &str,
    ) -> Result<Vec<VideoDescriptor>, ResolveError> {
        let referer = origin_of(link)?;
        let html = fetcher.fetch(link, &[]).await?;
        let master = packed_playlist(&html)?;
        hls::expand(fetcher, &master, label_prefix, &[("Referer", referer.as_str())]).await
    }
}
