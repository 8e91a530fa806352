//! HLS master playlist expansion

use std::sync::OnceLock;

use regex::Regex;

use super::ResolveError;
use crate::models::VideoDescriptor;
use crate::scraper::Fetcher;

const STREAM_INF: &str = "#EXT-X-STREAM-INF";

fn resolution_height() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"RESOLUTION=\d+x(\d+)").expect("valid resolution regex"))
}

/// One descriptor per variant stream, labelled `<prefix> - <height>p`
///
/// Variant URIs are made absolute against `master_url`. A playlist with no
/// sized variants yields a single descriptor for the master itself.
pub fn parse_master_playlist(playlist: &str, master_url: &str, prefix: &str) -> Vec<VideoDescriptor> {
    let base = url::Url::parse(master_url).ok();
    let mut variants = Vec::new();
    let mut lines = playlist.lines().map(str::trim);

    while let Some(line) = lines.next() {
        if !line.starts_with(STREAM_INF) {
            continue;
        }
        let Some(height) = resolution_height()
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };
        let Some(uri) = lines.by_ref().find(|l| !l.is_empty() && !l.starts_with('#')) else {
            break;
        };
        let absolute = base
            .as_ref()
            .and_then(|b| b.join(uri).ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| uri.to_string());
        let quality = format!("{height}p");
        variants.push(VideoDescriptor::new(
            absolute,
            format!("{prefix} - {quality}"),
            quality,
        ));
    }

    if variants.is_empty() {
        variants.push(VideoDescriptor::new(master_url, prefix, ""));
    }
    variants
}

/// Fetch a master playlist and expand it, attaching `headers` to every result
pub async fn expand(
    fetcher: &dyn Fetcher,
    master_url: &str,
    prefix: &str,
    headers: &[(&str, &str)],
) -> Result<Vec<VideoDescriptor>, ResolveError> {
    let playlist = fetcher.fetch(master_url, headers).await?;
    Ok(parse_master_playlist(&playlist, master_url, prefix)
        .into_iter()
        .map(|video| {
            headers
                .iter()
                .fold(video, |video, (name, value)| video.with_header(*name, *value))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::StaticFetcher;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1920x1080,CODECS=\"avc1.640028\"
index-1080.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=1280x720

https://cdn2.test/hls/720/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=100000
audio-only.m3u8
";

    #[test]
    fn test_variants_become_descriptors() {
        let videos = parse_master_playlist(MASTER, "https://cdn.test/hls/master.m3u8", "VOE Latino");
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].label, "VOE Latino - 1080p");
        assert_eq!(videos[0].quality_tag, "1080p");
        assert_eq!(videos[0].playback_url, "https://cdn.test/hls/index-1080.m3u8");
        assert_eq!(videos[1].label, "VOE Latino - 720p");
        assert_eq!(videos[1].playback_url, "https://cdn2.test/hls/720/index.m3u8");
    }

    #[test]
    fn test_media_playlist_falls_back_to_master() {
        let media = "#EXTM3U\n#EXTINF:10,\nseg0.ts\n#EXT-X-ENDLIST\n";
        let videos = parse_master_playlist(media, "https://cdn.test/a.m3u8", "Filemoon Castellano");
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].playback_url, "https://cdn.test/a.m3u8");
        assert_eq!(videos[0].label, "Filemoon Castellano");
    }

    #[tokio::test]
    async fn test_expand_attaches_headers() {
        let fetcher = StaticFetcher::new().with_page("https://cdn.test/hls/master.m3u8", MASTER);
        let videos = expand(
            &fetcher,
            "https://cdn.test/hls/master.m3u8",
            "StreamWish Latino",
            &[("Referer", "https://wish.test/")],
        )
        .await
        .unwrap();
        assert_eq!(videos.len(), 2);
        assert!(videos
            .iter()
            .all(|v| v.headers.len() == 1 && v.headers[0].value == "https://wish.test/"));
    }
}
