//! Detail page parsers

use scraper::Html;

use super::payload::{decode_props, DetailProps, Named};
use super::{element_text, normalize_whitespace, selector, ParseError};
use crate::models::{EntryDetail, EntryStatus};

/// Stand-in for line breaks while the synopsis is flattened to text
const LINE_BREAK_MARKER: &str = "br2n";

const CONTENT_PARAGRAPHS: &str = "#main-content > div > div.content-area.twelve.columns > div.watch-content > center > div > p";

/// Parse a detail page carrying the embedded JSON payload
pub fn parse_detail_json(html: &str) -> Result<EntryDetail, ParseError> {
    let props: DetailProps = decode_props(html)?;
    let anime = props.anime;

    let sources = join_names(&anime.source_list);
    let release_date = anime.release_date.unwrap_or_default();

    let mut description = flatten_synopsis(anime.description.as_deref().unwrap_or_default());
    description.push_str("\n\n");
    description.push_str(&format!("Content Rating: {}\n", anime.content_rating.name));
    description.push_str(&format!("Release Date: {}\n", release_date));
    description.push_str(&format!("Type: {}\n", anime.kind.name));
    description.push_str(&format!("Source: {}", sources));

    Ok(EntryDetail {
        title: anime.title,
        cover_url: anime.cover,
        genres: dedup(anime.genre_list.into_iter().map(|g| g.name)),
        production_names: anime.production_list.into_iter().map(|p| p.name).collect(),
        status: EntryStatus::from_name(&anime.status.name),
        description,
        content_rating: anime.content_rating.name,
        release_date,
        source_material: sources,
    })
}

/// Drop one pair of surrounding double quotes, only when both ends carry one
fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// Parse a detail page laid out as labelled paragraphs
///
/// The first paragraph is the synopsis; the rest are classified by the
/// label they carry.
pub fn parse_detail_dom(html: &str) -> EntryDetail {
    let document = Html::parse_document(html);
    let paragraphs: Vec<String> = document
        .select(&selector(CONTENT_PARAGRAPHS))
        .map(element_text)
        .collect();

    let mut detail = EntryDetail {
        description: paragraphs
            .first()
            .map(|p| strip_quotes(p).to_string())
            .unwrap_or_default(),
        ..Default::default()
    };

    for text in &paragraphs {
        let lower = text.to_lowercase();
        if lower.contains("titulo latino") {
            detail.title = strip_label(text, "Titulo Latino:");
        }
        if lower.contains("genero") {
            detail.genres = dedup(
                strip_label(text, "Genero:")
                    .split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty()),
            );
        }
        if text.contains("Director") {
            detail.production_names = strip_label(text, "Director:")
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
        }
    }

    detail
}

/// Flattens synopsis markup to text while keeping `<br />` line breaks
fn flatten_synopsis(markup: &str) -> String {
    let marked = markup
        .replace("<br />", LINE_BREAK_MARKER)
        .replace("<br/>", LINE_BREAK_MARKER)
        .replace("<br>", LINE_BREAK_MARKER);
    let fragment = Html::parse_fragment(&marked);
    let text = normalize_whitespace(&fragment.root_element().text().collect::<String>());
    text.replace(LINE_BREAK_MARKER, "\n")
}

fn strip_label(text: &str, label: &str) -> String {
    text.replace(label, "").trim().to_string()
}

fn join_names(names: &[Named]) -> String {
    names
        .iter()
        .map(|n| n.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn dedup(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail_html(anime: serde_json::Value) -> String {
        let payload = serde_json::json!({ "props": { "anime": anime } });
        format!(
            r#"<html><body><div id="app" data-page="{}"></div></body></html>"#,
            payload.to_string().replace('&', "&amp;").replace('"', "&quot;")
        )
    }

    #[test]
    fn test_parse_detail_json_full() {
        let html = detail_html(serde_json::json!({
            "title": "Show A",
            "cover": "https://cdn.test/a.jpg",
            "genre_list": [{"name": "Action"}, {"name": "Drama"}, {"name": "Action"}],
            "production_list": [{"name": "Studio One"}, {"name": "Studio Two"}],
            "source_list": [{"name": "Manga"}, {"name": "Web Novel"}],
            "status": {"name": "Ongoing"},
            "description": "<p>First line<br />Second   line</p>",
            "content_rating": {"name": "PG-13"},
            "release_date": "2021-04-02",
            "type": {"name": "TV"}
        }));

        let detail = parse_detail_json(&html).unwrap();
        assert_eq!(detail.title, "Show A");
        assert_eq!(detail.cover_url, "https://cdn.test/a.jpg");
        assert_eq!(detail.genres, vec!["Action", "Drama"]);
        assert_eq!(detail.production_line(), "Studio One, Studio Two");
        assert_eq!(detail.status, EntryStatus::Ongoing);
        assert_eq!(detail.source_material, "Manga, Web Novel");
        assert_eq!(detail.content_rating, "PG-13");
        assert_eq!(
            detail.description,
            "First line\nSecond line\n\nContent Rating: PG-13\nRelease Date: 2021-04-02\nType: TV\nSource: Manga, Web Novel"
        );
    }

    #[test]
    fn test_parse_detail_json_unknown_status_and_defaults() {
        let html = detail_html(serde_json::json!({
            "title": "Show B",
            "status": {"name": "Hiatus"}
        }));
        let detail = parse_detail_json(&html).unwrap();
        assert_eq!(detail.status, EntryStatus::Unknown);
        assert!(detail.genres.is_empty());
        assert!(detail.description.starts_with("\n\nContent Rating: "));
    }

    #[test]
    fn test_parse_detail_json_missing_anchor() {
        let err = parse_detail_json("<html></html>").unwrap_err();
        assert!(matches!(err, ParseError::MissingAnchor(_)));
    }

    #[test]
    fn test_flatten_synopsis_variants() {
        assert_eq!(flatten_synopsis("a<br>b<br/>c"), "a\nb\nc");
        assert_eq!(flatten_synopsis("<i>plain</i> text"), "plain text");
    }

    const DOM_DETAIL: &str = r#"
        <html><body>
        <div id="main-content"><div><div class="content-area twelve columns"><div class="watch-content">
            <center><div>
                <p>"Un grupo de amigos descubre un secreto."</p>
                <p>Titulo Latino: La Pelicula</p>
                <p>Genero: Accion, Drama, Accion</p>
                <p>Director: Jane Doe</p>
                <p>Descargar en 1 Link</p>
            </div></center>
        </div></div></div></div>
        </body></html>
    "#;

    #[test]
    fn test_parse_detail_dom() {
        let detail = parse_detail_dom(DOM_DETAIL);
        assert_eq!(detail.description, "Un grupo de amigos descubre un secreto.");
        assert_eq!(detail.title, "La Pelicula");
        assert_eq!(detail.genres, vec!["Accion", "Drama"]);
        assert_eq!(detail.production_names, vec!["Jane Doe"]);
        assert_eq!(detail.status, EntryStatus::Unknown);
    }

    #[test]
    fn test_parse_detail_dom_label_case() {
        let html = DOM_DETAIL
            .replace("Titulo Latino:", "TITULO LATINO -")
            .replace("Director:", "director:");
        let detail = parse_detail_dom(&html);
        // title label matches case-insensitively, director only with its capital D
        assert_eq!(detail.title, "TITULO LATINO - La Pelicula");
        assert!(detail.production_names.is_empty());
    }

    #[test]
    fn test_strip_quotes_removes_one_pair() {
        assert_eq!(strip_quotes(r#""Hola""#), "Hola");
        assert_eq!(strip_quotes(r#"""Hola"""#), r#""Hola""#);
        assert_eq!(strip_quotes(r#""Hola"#), r#""Hola"#);
        assert_eq!(strip_quotes(r#"Hola""#), r#"Hola""#);
        assert_eq!(strip_quotes("\""), "\"");
    }

    #[test]
    fn test_parse_detail_dom_unbalanced_quote_kept() {
        let html = DOM_DETAIL.replace(
            "Un grupo de amigos descubre un secreto.\"",
            "Un grupo de amigos descubre un secreto.",
        );
        let detail = parse_detail_dom(&html);
        assert_eq!(detail.description, "\"Un grupo de amigos descubre un secreto.");
    }

    #[test]
    fn test_parse_detail_dom_empty() {
        let detail = parse_detail_dom("<html><body></body></html>");
        assert_eq!(detail, EntryDetail::default());
    }

    #[test]
    fn test_parse_detail_dom_is_idempotent() {
        assert_eq!(parse_detail_dom(DOM_DETAIL), parse_detail_dom(DOM_DETAIL));
    }
}
