//! Mirror Scraper API Server
//!
//! Main entry point for the catalog and mirror REST API service.

use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use mirror_scraper::config::Config;
use mirror_scraper::routes::{configure_routes, ApiDoc, AppState};
use mirror_scraper::scraper::Scraper;
use mirror_scraper::sources::SourceRegistry;

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    let bind_address = format!("{}:{}", config.host, config.port);

    let scraper = Scraper::with_config(config.scraper_config()).map_err(|e| {
        error!("Failed to build HTTP client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;
    let sources = SourceRegistry::from_config(&config, Arc::new(scraper));
    for source in sources.list() {
        info!(id = %source.id, base_url = %source.base_url, "Registered source");
    }

    let app_state = web::Data::new(AppState { config, sources });

    info!("Starting Mirror Scraper API server on {}", bind_address);

    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .route("/health", web::get().to(health_check))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
