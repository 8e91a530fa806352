//! StreamWish embed pages

use async_trait::async_trait;

use super::filemoon::{packed_playlist, playlist_in};
use super::{hls, origin_of, LinkResolver, ResolveError};
use crate::models::VideoDescriptor;
use crate::scraper::Fetcher;

pub struct StreamWish;

/// Download links (`/f/`) and embeds (`/e/`) share an id; only embeds carry the player
pub fn embed_url(link: &str) -> String {
    link.replacen("/f/", "/e/", 1)
}

#[async_trait]
impl LinkResolver for StreamWish {
    fn name(&self) -> &'static str {
        "StreamWish"
    }

    fn host_key(&self) -> &'static str {
        "streamwish"
    }

    async fn resolve(
        &self,
        fetcher: &dyn Fetcher,
        link: &str,
        label_prefix: &str,
    ) -> Result<Vec<VideoDescriptor>, ResolveError> {
        let embed = embed_url(link);
        let referer = origin_of(&embed)?;
        let html = fetcher.fetch(&embed, &[]).await?;

        // some mirrors serve the player setup unpacked
        let master = match packed_playlist(&html) {
            Ok(url) => url,
            Err(err) => playlist_in(&html).ok_or(err)?,
        };
        hls::expand(fetcher, &master, label_prefix, &[("Referer", referer.as_str())]).await
    }
}
