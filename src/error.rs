//! Error handling for the catalog pipeline and the HTTP API
//!
//! [`SourceError`] is what pipeline operations return; it keeps "the site
//! changed or broke" distinct from "nothing was found". [`AppError`] wraps it
//! for actix handlers and maps every kind onto an HTTP status and JSON body.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ApiError;
use crate::parser::ParseError;
use crate::scraper::ScraperError;

/// Errors surfaced by catalog, detail, episode and video operations
#[derive(Debug, Error)]
pub enum SourceError {
    /// Fetching a top-level page failed
    #[error("Transport error: {0}")]
    Transport(#[from] ScraperError),

    /// A required top-level structure is absent from the document
    #[error("Source format changed: {0}")]
    FormatChanged(String),

    /// A next-page link pointed back to a page that was already fetched
    #[error("Pagination cycle detected at {url}")]
    PaginationCycle { url: String },

    /// The configured page cap was reached before the index ended
    #[error("Pagination exceeded {limit} pages")]
    PageLimit { limit: usize },

    /// The source does not offer this operation
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// No source is registered under the requested id
    #[error("Unknown source: {0}")]
    UnknownSource(String),
}

impl From<ParseError> for SourceError {
    fn from(err: ParseError) -> Self {
        SourceError::FormatChanged(err.to_string())
    }
}

impl SourceError {
    /// Stable machine readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Transport(ScraperError::Timeout(_)) => "timeout",
            SourceError::Transport(_) => "transport",
            SourceError::FormatChanged(_) => "format_changed",
            SourceError::PaginationCycle { .. } => "pagination_cycle",
            SourceError::PageLimit { .. } => "page_limit",
            SourceError::Unsupported(_) => "unsupported",
            SourceError::UnknownSource(_) => "unknown_source",
        }
    }

    /// True for errors that mean the upstream site no longer matches expectations
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            SourceError::FormatChanged(_) | SourceError::PaginationCycle { .. }
        )
    }
}

/// Application-wide error type for HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    /// Pipeline errors
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Validation errors (bad request)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Source(err) => match err {
                SourceError::Transport(ScraperError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
                SourceError::Transport(ScraperError::HttpError(404)) => StatusCode::NOT_FOUND,
                SourceError::Transport(ScraperError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
                SourceError::Transport(_) => StatusCode::BAD_GATEWAY,
                SourceError::FormatChanged(_)
                | SourceError::PaginationCycle { .. }
                | SourceError::PageLimit { .. } => StatusCode::BAD_GATEWAY,
                SourceError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
                SourceError::UnknownSource(_) => StatusCode::NOT_FOUND,
            },
        }
    }

    /// Machine readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Source(err) => err.kind(),
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Source(err) => match err {
                SourceError::Transport(ScraperError::RateLimited) => {
                    "Source is rate limiting requests, please try again later".to_string()
                }
                SourceError::Transport(ScraperError::HttpError(status)) => {
                    format!("Source returned error status: {}", status)
                }
                SourceError::Transport(e) => format!("Failed to reach source: {}", e),
                SourceError::FormatChanged(_) => {
                    "Source changed: the page no longer has the expected structure".to_string()
                }
                SourceError::PaginationCycle { url } => {
                    format!("Source changed: episode pagination loops back to {}", url)
                }
                SourceError::PageLimit { limit } => {
                    format!("Episode index longer than {} pages", limit)
                }
                SourceError::Unsupported(what) => format!("Not supported by this source: {}", what),
                SourceError::UnknownSource(id) => format!("Unknown source: {}", id),
            },
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        }
        HttpResponse::build(status).json(ApiError::new(self.kind(), self.user_message()))
    }
}

/// Result type alias for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::validation("Invalid input");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_error_status_code() {
        let error = AppError::not_found("Resource not found");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_format_changed_is_bad_gateway() {
        let error = AppError::from(SourceError::FormatChanged("div#app".into()));
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
        assert!(error.user_message().contains("Source changed"));
        assert_eq!(error.kind(), "format_changed");
    }

    #[test]
    fn test_pagination_cycle_is_protocol_violation() {
        let err = SourceError::PaginationCycle {
            url: "https://a.test/p1".into(),
        };
        assert!(err.is_protocol_violation());
        assert!(!SourceError::Unsupported("search").is_protocol_violation());
        let app = AppError::from(err);
        assert_eq!(app.status_code(), StatusCode::BAD_GATEWAY);
        assert!(app.user_message().contains("https://a.test/p1"));
    }

    #[test]
    fn test_transport_status_mapping() {
        let timeout = AppError::from(SourceError::Transport(ScraperError::Timeout("u".into())));
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(timeout.kind(), "timeout");

        let missing = AppError::from(SourceError::Transport(ScraperError::HttpError(404)));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let limited = AppError::from(SourceError::Transport(ScraperError::RateLimited));
        assert_eq!(limited.status_code(), StatusCode::BAD_GATEWAY);
        assert!(limited.user_message().contains("rate limiting"));
    }

    #[test]
    fn test_unsupported_and_unknown_source() {
        let unsupported = AppError::from(SourceError::Unsupported("text search"));
        assert_eq!(unsupported.status_code(), StatusCode::NOT_IMPLEMENTED);
        let unknown = AppError::from(SourceError::UnknownSource("nope".into()));
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parse_error_becomes_format_changed() {
        let err: SourceError = ParseError::MissingAnchor("div#app").into();
        assert!(matches!(err, SourceError::FormatChanged(_)));
    }

    #[test]
    fn test_error_display() {
        let error = AppError::validation("test error");
        assert_eq!(format!("{}", error), "Validation error: test error");

        let error = AppError::not_found("anime");
        assert_eq!(format!("{}", error), "Not found: anime");
    }
}
