use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::app::TrendwatchError;
use crate::config::AppConfig;
use crate::domain::ScrapeResult;
use crate::scraper::{ProxyConfig, SessionConfig, SessionDriver};
use crate::store::Store;

/// How many captures `GET /trends` returns.
const RECENT_LIMIT: usize = 10;

pub struct AppState {
    pub config: AppConfig,
    pub session: SessionConfig,
    pub store: Box<dyn Store>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/scrape", post(trigger_scrape))
        .route("/trends", get(recent_trends))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// `POST /scrape`: run one full session lifecycle synchronously and persist
/// the capture. Concurrent triggers each get their own browser process;
/// bounding that is the caller's job.
async fn trigger_scrape(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match run_scrape(&state).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": "Data scraped and stored successfully",
                "data": result,
            })),
        ),
        Err((message, err)) => {
            error!(error = %err, stage = message, "scrape request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": message,
                    "error": err.to_string(),
                    "traceback": error_chain(&err),
                })),
            )
        }
    }
}

async fn run_scrape(
    state: &AppState,
) -> std::result::Result<ScrapeResult, (&'static str, TrendwatchError)> {
    let proxy = state
        .config
        .proxy_url
        .as_deref()
        .map(ProxyConfig::parse)
        .transpose()
        .map_err(|e| ("Failed to initialize scraper", e))?;

    let session = SessionDriver::launch(state.session.clone(), proxy.as_ref())
        .await
        .map_err(|e| ("Failed to initialize scraper", e))?;

    let (trends, source) = session
        .scrape(&state.config.account_username, &state.config.account_password)
        .await
        .map_err(|e| ("Scraping failed", e))?;
    info!(count = trends.len(), %source, "scrape completed");

    state
        .store
        .insert_scrape(&trends, &source)
        .map_err(|e| ("Failed to store scrape result", e))
}

/// `GET /trends`: the most recent captures, newest first.
async fn recent_trends(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.recent_scrapes(RECENT_LIMIT) {
        Ok(results) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "data": results,
            })),
        ),
        Err(e) => {
            warn!(error = %e, "failed to fetch recent trends");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Failed to fetch trends",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

/// Render the full source chain of an error, outermost first.
fn error_chain(err: &TrendwatchError) -> String {
    let mut rendered = err.to_string();
    let mut current = std::error::Error::source(err);
    while let Some(cause) = current {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}
