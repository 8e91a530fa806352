//! Mirror Scraper Library
//!
//! This library ingests catalog sites (listings, entry details, paginated
//! episode indexes), resolves episode pages into playable mirrors through
//! per-host resolvers, ranks them by caller preference, and exposes all of it
//! through REST API endpoints.

pub mod config;
pub mod constants;
pub mod error;
pub mod extractors;
pub mod models;
pub mod parser;
pub mod preferences;
pub mod ranking;
pub mod routes;
pub mod scraper;
pub mod sources;
pub mod walker;
