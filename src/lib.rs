//! # Trendwatch
//!
//! Scrapes a social platform's "Trending now" panel through an automated
//! browser session, optionally routed through an authenticated proxy,
//! persists each capture, and exposes the result over a small HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! HTTP trigger → SessionDriver → TrendExtractor → Store → HTTP read
//! ```
//!
//! - [`scraper`]: one-browser-per-scrape session lifecycle, proxy credential
//!   injection and DOM extraction
//! - [`store`]: SQLite persistence of scrape captures
//! - [`server`]: axum handlers for `POST /scrape` and `GET /trends`

/// Error types shared across the crate.
///
/// [`TrendwatchError`](app::TrendwatchError) splits fatal configuration
/// problems, degraded-mode proxy failures, phase-tagged session failures
/// and storage failures.
pub mod app;

/// Environment-derived configuration, built once at startup.
pub mod config;

/// Core domain models: [`TrendRecord`](domain::TrendRecord) and
/// [`ScrapeResult`](domain::ScrapeResult).
pub mod domain;

/// Browser session driving, proxy auth injection and trend extraction.
///
/// - [`SessionDriver`](scraper::SessionDriver): one exclusively-owned
///   Chrome process, teardown guaranteed on every exit path
/// - [`ProxyConfig`](scraper::ProxyConfig) /
///   [`ProxyAuthExtension`](scraper::ProxyAuthExtension): authenticated
///   proxying without credentials in process arguments
/// - [`TrendExtractor`](scraper::TrendExtractor): panel DOM → records
pub mod scraper;

/// HTTP surface: scrape trigger and trend read endpoints.
pub mod server;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): per-operation-connection impl
pub mod store;
