// Copyright 2026 Pagelite Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface.
//!
//! Two endpoints: `GET /health` and `GET /process?url=`. URL validation
//! happens before the stream starts and is the only failure reported with an
//! HTTP status — once the chunked body is underway, headers are committed
//! and any later failure is embedded in the body text instead.

use crate::config::AiConfig;
use crate::fetch::Fetcher;
use crate::stream;
use crate::summarize::Summarizer;
use crate::validate;
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared per-process state. Everything in here is immutable and
/// request-scoped work never writes back — statelessness across requests is
/// the whole concurrency story.
pub struct AppState {
    pub fetcher: Fetcher,
    pub summarizer: Summarizer,
}

impl AppState {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            fetcher: Fetcher::new(),
            summarizer: Summarizer::new(config),
        }
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/process", get(process))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("pagelite listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Deserialize, Default)]
struct ProcessParams {
    url: Option<String>,
}

/// `GET /process?url=` — validate, then hand the connection to the stream
/// orchestrator as a chunked `text/plain` body.
async fn process(
    Query(params): Query<ProcessParams>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let url = validate::normalize_url(params.url.as_deref().unwrap_or_default());
    if !validate::is_valid_url(&url) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Invalid URL provided" })),
        )
            .into_response();
    }

    let body = stream::respond(state, url)
        .map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk)));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from_stream(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
