//! Episode page parsers for mirror enumeration
//!
//! Structured pages list video sources with their mirrors directly; tabular
//! pages list server rows whose links still need a host resolver.

use scraper::Html;

use super::payload::{decode_props, VideoProps};
use super::{element_text, selector, ParseError};
use crate::models::{LanguageTag, VideoDescriptor, WeightedVideo};

/// One row of the server table before host dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRow {
    pub server: String,
    pub link: String,
}

/// Expand every mirror of every video source into a weighted descriptor
///
/// Labels read `<title> <resolution> (<Sub|Dub> - <source>)`; the weight is
/// the source's own sort value.
pub fn parse_video_sources(html: &str) -> Result<Vec<WeightedVideo>, ParseError> {
    let props: VideoProps = decode_props(html)?;

    let mut videos = Vec::new();
    for source in props.video_list.data {
        let audio = LanguageTag::from_audio_code(&source.audio.code);
        for mirror in source.mirror {
            let label = format!(
                "{} {} ({} - {})",
                source.title, mirror.resolution, audio, source.source.name
            );
            let video = VideoDescriptor::new(mirror.code.file, label, mirror.resolution);
            videos.push(WeightedVideo::weighted(video, source.sort));
        }
    }

    Ok(videos)
}

/// Collect `(server, link)` pairs from `table.episodes` rows
///
/// Rows missing either cell are skipped.
pub fn parse_server_rows(html: &str) -> Vec<ServerRow> {
    let document = Html::parse_document(html);
    let row_selector = selector("table.episodes tbody tr.tabletr");
    let cell_selector = selector("td");
    let link_selector = selector("a");

    document
        .select(&row_selector)
        .filter_map(|row| {
            let mut cells = row.select(&cell_selector);
            let server = element_text(cells.next()?);
            let link = cells
                .next()?
                .select(&link_selector)
                .next()?
                .value()
                .attr("href")?
                .trim()
                .to_string();
            if link.is_empty() {
                return None;
            }
            Some(ServerRow { server, link })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_page(sources: serde_json::Value) -> String {
        let payload = serde_json::json!({ "props": { "video_list": { "data": sources } } });
        format!(
            r#"<html><body><div id="app" data-page="{}"></div></body></html>"#,
            payload.to_string().replace('&', "&amp;").replace('"', "&quot;")
        )
    }

    #[test]
    fn test_parse_video_sources_expands_mirrors() {
        let html = video_page(serde_json::json!([
            {
                "title": "Episode 1",
                "sort": 2,
                "audio": {"code": "jp"},
                "source": {"name": "GroupA"},
                "mirror": [
                    {"resolution": "1080p", "code": {"file": "https://cdn.test/a1080.mp4"}},
                    {"resolution": "720p", "code": {"file": "https://cdn.test/a720.mp4"}}
                ]
            },
            {
                "title": "Episode 1",
                "sort": 5,
                "audio": {"code": "en"},
                "source": {"name": "GroupB"},
                "mirror": [
                    {"resolution": 480, "code": {"file": "https://cdn.test/b480.mp4"}}
                ]
            }
        ]));

        let videos = parse_video_sources(&html).unwrap();
        assert_eq!(videos.len(), 3);
        assert_eq!(videos[0].video.label, "Episode 1 1080p (Sub - GroupA)");
        assert_eq!(videos[0].video.playback_url, "https://cdn.test/a1080.mp4");
        assert_eq!(videos[0].video.quality_tag, "1080p");
        assert_eq!(videos[0].weight, Some(2.0));
        assert_eq!(videos[2].video.label, "Episode 1 480 (Dub - GroupB)");
        assert_eq!(videos[2].weight, Some(5.0));
    }

    #[test]
    fn test_parse_video_sources_missing_anchor() {
        assert!(matches!(
            parse_video_sources("<html></html>"),
            Err(ParseError::MissingAnchor(_))
        ));
    }

    const SERVER_TABLE: &str = r#"
        <html><body>
        <table class="episodes"><tbody>
            <tr class="tabletr"><td>streamtape latino</td><td class="link-td"><a href="https://streamtape.com/v/abc/">Ver</a></td></tr>
            <tr class="tabletr"><td>voe subtitulado</td><td class="link-td"><a href="https://voe.sx/e/xyz">Ver</a></td></tr>
            <tr class="tabletr"><td>mega</td><td class="link-td"><a href="https://mega.nz/file/1">Ver</a></td></tr>
            <tr class="tabletr"><td>broken</td></tr>
            <tr class="tabletr"><td>empty</td><td><a href="">Ver</a></td></tr>
        </tbody></table>
        </body></html>
    "#;

    #[test]
    fn test_parse_server_rows() {
        let rows = parse_server_rows(SERVER_TABLE);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            ServerRow {
                server: "streamtape latino".into(),
                link: "https://streamtape.com/v/abc/".into()
            }
        );
        assert_eq!(rows[1].server, "voe subtitulado");
        assert_eq!(rows[2].link, "https://mega.nz/file/1");
    }

    #[test]
    fn test_parse_server_rows_without_table() {
        assert!(parse_server_rows("<html><body><p>nada</p></body></html>").is_empty());
    }
}
