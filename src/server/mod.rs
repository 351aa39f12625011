//! HTTP surface
//!
//! Thin axum wiring around [`ScrapeService`]: one scrape route, one
//! liveness probe, and the mapping from [`ScrapeError`] to status codes.
//! Requests are independent; the state is just a shared service handle.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::scrape::ScrapeService;
use crate::ScrapeError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScrapeService>,
}

/// Creates the router with all routes
pub fn router(service: Arc<ScrapeService>) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/channel/:username", get(channel))
        .with_state(AppState { service })
}

async fn health() -> Response {
    Json(json!({ "status": "ok", "service": "telechan" })).into_response()
}

#[derive(Debug, Deserialize)]
struct ChannelParams {
    /// Maximum posts to return; clamped server-side to [1, 100]
    limit: Option<usize>,
}

async fn channel(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(params): Query<ChannelParams>,
) -> Response {
    match state.service.scrape(&username, params.limit).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let status = match &self {
            ScrapeError::InvalidIdentifier { .. } => StatusCode::BAD_REQUEST,
            ScrapeError::ChannelNotFound { .. } => StatusCode::NOT_FOUND,
            ScrapeError::FetchFailed { .. } | ScrapeError::Extraction { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ScrapeError::UrlParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Scrape request failed");
        } else {
            tracing::debug!(error = %self, "Scrape request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
