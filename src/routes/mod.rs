//! API Routes module for the mirror scraper service
//!
//! This module contains the HTTP handlers that expose every source operation
//! as a JSON endpoint under `/api/{source}/...`.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{debug, info};
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    ApiError, ApiResponse, CatalogEntry, CatalogPage, EntryDetail, EntryStatus, Episode,
    RankingPreferences, SearchFilters, SourceInfo, VideoDescriptor, VideoHeader,
};
use crate::preferences::{Overlay, PreferenceStore};
use crate::sources::{Source, SourceRegistry};

/// Application state shared across handlers
pub struct AppState {
    /// Also carries the base preference values that requests override
    pub config: Config,
    pub sources: SourceRegistry,
}

impl AppState {
    fn source(&self, id: &str) -> AppResult<std::sync::Arc<dyn Source>> {
        Ok(self.sources.get(id)?)
    }
}

/// Query parameters for listing endpoints
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Page number (default: 1)
    pub page: Option<u32>,
}

/// Query parameters for the search endpoint
///
/// List filters take comma-separated ids.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct SearchQuery {
    /// Search keyword, or `id:<identifier>` for a direct lookup
    pub q: Option<String>,
    /// Page number (default: 1)
    pub page: Option<u32>,
    /// Sort key, e.g. "vwk-d"
    pub sort: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub content_rating: Option<String>,
    pub genre: Option<String>,
    pub source: Option<String>,
    /// Release group id
    pub group: Option<String>,
    /// Studio or producer id
    pub production: Option<String>,
}

impl SearchQuery {
    fn filters(&self) -> SearchFilters {
        let ids = |value: &Option<String>| -> Vec<String> {
            value
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect()
        };
        let single = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        SearchFilters {
            sort: single(&self.sort),
            types: ids(&self.kind),
            statuses: ids(&self.status),
            content_ratings: ids(&self.content_rating),
            genres: ids(&self.genre),
            sources: ids(&self.source),
            group: single(&self.group),
            production: single(&self.production),
        }
    }
}

/// Query parameters for entry and episode endpoints
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PathQuery {
    /// Site-relative URL, e.g. "/anime/some-slug"
    pub path: Option<String>,
}

/// Query parameters for the videos endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct VideoQuery {
    /// Site-relative URL of the episode
    pub path: Option<String>,
    /// Preferred quality token, e.g. "1080"
    pub quality: Option<String>,
    /// Preferred language or sub/dub token
    pub language: Option<String>,
    /// Preferred release group or server
    pub group: Option<String>,
}

fn validate_page(page: Option<u32>) -> AppResult<u32> {
    match page.unwrap_or(1) {
        0 => Err(AppError::validation("Page numbers start at 1")),
        page => Ok(page),
    }
}

/// Only site-relative paths are accepted so requests stay on the source's host
fn validate_path(path: Option<&str>) -> AppResult<&str> {
    match path.map(str::trim) {
        Some(p) if p.starts_with('/') && !p.starts_with("//") => Ok(p),
        Some(p) if !p.is_empty() => Err(AppError::validation(
            "Path must be site-relative and start with '/'",
        )),
        _ => Err(AppError::validation("Query parameter 'path' is required")),
    }
}

/// GET /api/sources - List the configured sources
#[utoipa::path(
    get,
    path = "/api/sources",
    tag = "sources",
    responses(
        (status = 200, description = "Configured sources", body = Vec<SourceInfo>)
    )
)]
pub async fn list_sources(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::new(data.sources.list())))
}

/// GET /api/{source}/popular - Popular catalog entries
#[utoipa::path(
    get,
    path = "/api/{source}/popular",
    tag = "catalog",
    params(("source" = String, Path, description = "Source id"), PageQuery),
    responses(
        (status = 200, description = "One page of entries", body = CatalogPage),
        (status = 404, description = "Unknown source", body = ApiError),
        (status = 502, description = "Source unreachable or changed", body = ApiError)
    )
)]
pub async fn get_popular(
    data: web::Data<AppState>,
    source: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = validate_page(query.page)?;
    let source = data.source(&source)?;
    info!(source = source.id(), page, "Fetching popular entries");
    let result = source.popular(page).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(result)))
}

/// GET /api/{source}/latest - Latest catalog entries
#[utoipa::path(
    get,
    path = "/api/{source}/latest",
    tag = "catalog",
    params(("source" = String, Path, description = "Source id"), PageQuery),
    responses(
        (status = 200, description = "One page of entries", body = CatalogPage),
        (status = 404, description = "Unknown source", body = ApiError),
        (status = 502, description = "Source unreachable or changed", body = ApiError)
    )
)]
pub async fn get_latest(
    data: web::Data<AppState>,
    source: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = validate_page(query.page)?;
    let source = data.source(&source)?;
    info!(source = source.id(), page, "Fetching latest entries");
    let result = source.latest(page).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(result)))
}

/// GET /api/{source}/search - Search the catalog
///
/// A query of the form `id:<identifier>` resolves that entry directly.
#[utoipa::path(
    get,
    path = "/api/{source}/search",
    tag = "catalog",
    params(("source" = String, Path, description = "Source id"), SearchQuery),
    responses(
        (status = 200, description = "Matching entries", body = CatalogPage),
        (status = 400, description = "Search query is required", body = ApiError),
        (status = 501, description = "Source has no text search", body = ApiError)
    )
)]
pub async fn search_catalog(
    data: web::Data<AppState>,
    source: web::Path<String>,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let keyword = match &query.q {
        Some(q) if !q.trim().is_empty() => q.trim(),
        _ => return Err(AppError::validation("Search query is required")),
    };
    let page = validate_page(query.page)?;
    let source = data.source(&source)?;

    info!(source = source.id(), keyword, page, "Searching catalog");
    let result = source.search(page, keyword, &query.filters()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(result)))
}

/// GET /api/{source}/detail - Entry metadata
#[utoipa::path(
    get,
    path = "/api/{source}/detail",
    tag = "entries",
    params(("source" = String, Path, description = "Source id"), PathQuery),
    responses(
        (status = 200, description = "Entry metadata", body = EntryDetail),
        (status = 400, description = "Missing or invalid path", body = ApiError),
        (status = 502, description = "Source unreachable or changed", body = ApiError)
    )
)]
pub async fn get_detail(
    data: web::Data<AppState>,
    source: web::Path<String>,
    query: web::Query<PathQuery>,
) -> AppResult<HttpResponse> {
    let path = validate_path(query.path.as_deref())?;
    let source = data.source(&source)?;
    info!(source = source.id(), path, "Fetching entry detail");
    let detail = source.detail(path).await?;
    debug!(
        title = %detail.title,
        genres = %detail.genre_line(),
        author = %detail.production_line(),
        "Parsed entry detail"
    );
    Ok(HttpResponse::Ok().json(ApiResponse::new(detail)))
}

/// GET /api/{source}/episodes - Full episode list, highest number first
#[utoipa::path(
    get,
    path = "/api/{source}/episodes",
    tag = "entries",
    params(("source" = String, Path, description = "Source id"), PathQuery),
    responses(
        (status = 200, description = "All episodes of the entry", body = Vec<Episode>),
        (status = 400, description = "Missing or invalid path", body = ApiError),
        (status = 502, description = "Source changed or pagination loops", body = ApiError)
    )
)]
pub async fn get_episodes(
    data: web::Data<AppState>,
    source: web::Path<String>,
    query: web::Query<PathQuery>,
) -> AppResult<HttpResponse> {
    let path = validate_path(query.path.as_deref())?;
    let source = data.source(&source)?;
    info!(source = source.id(), path, "Walking episode index");
    let episodes = source.episodes(path).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(episodes)))
}

/// GET /api/{source}/videos - Ranked playable videos for one episode
///
/// `quality`, `language` and `group` override the configured preferences.
#[utoipa::path(
    get,
    path = "/api/{source}/videos",
    tag = "entries",
    params(("source" = String, Path, description = "Source id"), VideoQuery),
    responses(
        (status = 200, description = "Videos, best first", body = Vec<VideoDescriptor>),
        (status = 400, description = "Missing or invalid path", body = ApiError),
        (status = 502, description = "Source unreachable or changed", body = ApiError)
    )
)]
pub async fn get_videos(
    data: web::Data<AppState>,
    source: web::Path<String>,
    query: web::Query<VideoQuery>,
) -> AppResult<HttpResponse> {
    let path = validate_path(query.path.as_deref())?;
    let source = data.source(&source)?;
    let preferences = request_preferences(&data.config.preferences, source.as_ref(), &query);

    info!(source = source.id(), path, ?preferences, "Resolving videos");
    let videos = source.videos(path, &preferences).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(videos)))
}

/// Configured preferences with the request's overrides applied
fn request_preferences(
    base: &dyn PreferenceStore,
    source: &dyn Source,
    query: &VideoQuery,
) -> RankingPreferences {
    let keys = source.preference_keys();
    let store = Overlay::new(base)
        .set(keys.quality.0, query.quality.as_deref())
        .set(keys.language.0, query.language.as_deref())
        .set(keys.group.0, query.group.as_deref());
    RankingPreferences::load(&store, &keys)
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mirror Scraper API",
        version = "0.1.0",
        description = "Catalog browsing, episode indexing and ranked video mirrors for supported sites",
        license(
            name = "MIT"
        )
    ),
    paths(
        list_sources,
        get_popular,
        get_latest,
        search_catalog,
        get_detail,
        get_episodes,
        get_videos
    ),
    components(
        schemas(
            SourceInfo,
            CatalogEntry,
            CatalogPage,
            EntryDetail,
            EntryStatus,
            Episode,
            VideoDescriptor,
            VideoHeader,
            RankingPreferences,
            SearchFilters,
            ApiError,
            PageQuery,
            SearchQuery,
            PathQuery,
            VideoQuery
        )
    ),
    tags(
        (name = "sources", description = "Configured catalog sources"),
        (name = "catalog", description = "Listing and search endpoints"),
        (name = "entries", description = "Entry detail, episodes and videos")
    )
)]
pub struct ApiDoc;

/// Configure API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/sources", web::get().to(list_sources))
            .route("/{source}/popular", web::get().to(get_popular))
            .route("/{source}/latest", web::get().to(get_latest))
            .route("/{source}/search", web::get().to(search_catalog))
            .route("/{source}/detail", web::get().to(get_detail))
            .route("/{source}/episodes", web::get().to(get_episodes))
            .route("/{source}/videos", web::get().to(get_videos)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::StaticFetcher;
    use crate::sources::{Hackstore, MarinMoe};
    use crate::extractors::MirrorExtractor;
    use actix_web::test as actix_test;
    use actix_web::{http::StatusCode, App};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn state(fetcher: StaticFetcher, preferences: &[(&str, &str)]) -> web::Data<AppState> {
        let fetcher: Arc<StaticFetcher> = Arc::new(fetcher);
        let sources = SourceRegistry::new(vec![
            Arc::new(MarinMoe::new(fetcher.clone(), "https://marin.test")),
            Arc::new(Hackstore::new(fetcher, "https://hack.test", MirrorExtractor::default())),
        ]);
        let mut config = Config::from_vars(Vec::new()).unwrap();
        config.preferences = preferences
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        web::Data::new(AppState { config, sources })
    }

    #[test]
    fn test_validate_page() {
        assert_eq!(validate_page(None).unwrap(), 1);
        assert_eq!(validate_page(Some(3)).unwrap(), 3);
        assert!(validate_page(Some(0)).is_err());
    }

    #[test]
    fn test_validate_path() {
        assert_eq!(validate_path(Some(" /anime/x ")).unwrap(), "/anime/x");
        assert!(validate_path(None).is_err());
        assert!(validate_path(Some("")).is_err());
        assert!(validate_path(Some("https://evil.test/x")).is_err());
        assert!(validate_path(Some("//evil.test/x")).is_err());
    }

    #[test]
    fn test_search_query_filters() {
        let query = SearchQuery {
            q: Some("show".into()),
            kind: Some("1".into()),
            genre: Some(" 4, 9,,".into()),
            group: Some("  ".into()),
            production: Some("12".into()),
            ..Default::default()
        };
        let filters = query.filters();
        assert_eq!(filters.types, vec!["1"]);
        assert_eq!(filters.genres, vec!["4", "9"]);
        assert!(filters.statuses.is_empty());
        assert_eq!(filters.sort, None);
        assert_eq!(filters.group, None);
        assert_eq!(filters.production.as_deref(), Some("12"));
    }

    #[test]
    fn test_request_preferences_override_configured_values() {
        let base: HashMap<String, String> =
            [("preferred_language".to_string(), "Castellano".to_string())].into();
        let source = Hackstore::new(
            Arc::new(StaticFetcher::new()),
            "https://hack.test",
            MirrorExtractor::default(),
        );
        let query = VideoQuery {
            path: Some("/peliculas/x".into()),
            quality: Some("720".into()),
            language: None,
            group: Some("voe".into()),
        };

        let prefs = request_preferences(&base, &source, &query);
        assert_eq!(prefs.preferred_quality, "720");
        assert_eq!(prefs.preferred_language, "Castellano");
        assert_eq!(prefs.preferred_group, "voe");
    }

    #[actix_rt::test]
    async fn test_list_sources_endpoint() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(StaticFetcher::new(), &[]))
                .configure(configure_routes),
        )
        .await;
        let req = actix_test::TestRequest::get().uri("/api/sources").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"][0]["id"], "marinmoe");
        assert_eq!(body["data"][1]["supportsTextSearch"], false);
    }

    #[actix_rt::test]
    async fn test_error_statuses() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(
                    StaticFetcher::new().with_page(
                        "https://marin.test/anime?sort=vwk-d&page=1",
                        "<html><body>maintenance</body></html>",
                    ),
                    &[],
                ))
                .configure(configure_routes),
        )
        .await;

        let cases = [
            ("/api/nope/popular", StatusCode::NOT_FOUND),
            ("/api/marinmoe/popular?page=0", StatusCode::BAD_REQUEST),
            ("/api/marinmoe/popular", StatusCode::BAD_GATEWAY),
            ("/api/hackstore/search?q=matrix", StatusCode::NOT_IMPLEMENTED),
            ("/api/hackstore/search", StatusCode::BAD_REQUEST),
            ("/api/marinmoe/detail", StatusCode::BAD_REQUEST),
        ];
        for (uri, status) in cases {
            let req = actix_test::TestRequest::get().uri(uri).to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), status, "{uri}");
        }
    }

    #[actix_rt::test]
    async fn test_videos_endpoint_uses_configured_preferences() {
        let payload = serde_json::json!({"props": {"video_list": {"data": [
            {"title": "EN", "sort": 1, "audio": {"code": "jp"}, "source": {"name": "G"},
             "mirror": [{"resolution": "1080p", "code": {"file": "https://cdn.test/sub"}}]},
            {"title": "EN", "sort": 1, "audio": {"code": "en"}, "source": {"name": "G"},
             "mirror": [{"resolution": "1080p", "code": {"file": "https://cdn.test/dub"}}]}
        ]}}});
        let page = format!(
            r#"<div id="app" data-page="{}"></div>"#,
            payload.to_string().replace('"', "&quot;")
        );
        let fetcher = StaticFetcher::new().with_page("https://marin.test/anime/a/1", &page);
        let app = actix_test::init_service(
            App::new()
                .app_data(state(fetcher, &[("preferred_sub", "dub")]))
                .configure(configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/api/marinmoe/videos?path=/anime/a/1")
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["playbackUrl"], "https://cdn.test/dub");

        let req = actix_test::TestRequest::get()
            .uri("/api/marinmoe/videos?path=/anime/a/1&language=sub")
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["playbackUrl"], "https://cdn.test/sub");
    }

    #[actix_rt::test]
    async fn test_episodes_endpoint() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(StaticFetcher::new(), &[]))
                .configure(configure_routes),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/api/hackstore/episodes?path=/peliculas/uno/")
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["displayName"], "PELÍCULA");
        assert_eq!(body["data"][0]["number"], 1.0);
    }
}
