//! Serves the published snapshot documents to the dashboard.
//!
//! Files are read from disk on every request, so a response always reflects
//! whatever snapshot was last renamed into place.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::error::AppError;
use crate::scheduler::shutdown_requested;
use crate::snapshot::SnapshotPaths;

const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const DOCUMENT_METHODS: &str = "GET, POST, OPTIONS";
const ERROR_METHODS: &str = "GET, OPTIONS";

#[derive(Clone)]
struct ServerState {
    paths: Arc<SnapshotPaths>,
}

fn with_cors(mut response: Response, methods: &'static str) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(methods),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    response
}

fn json_error(status: StatusCode, message: &str) -> Response {
    with_cors(
        (status, Json(serde_json::json!({ "error": message }))).into_response(),
        ERROR_METHODS,
    )
}

async fn preflight() -> Response {
    let mut response = with_cors(StatusCode::OK.into_response(), DOCUMENT_METHODS);
    response.headers_mut().insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    response
}

async fn serve_document(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(body) => with_cors(
            ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
            DOCUMENT_METHODS,
        ),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Snapshot document unreadable");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not read file")
        }
    }
}

async fn stocks(State(state): State<ServerState>) -> Response {
    serve_document(&state.paths.stocks).await
}

async fn best(State(state): State<ServerState>) -> Response {
    serve_document(&state.paths.best).await
}

async fn trending(State(state): State<ServerState>) -> Response {
    serve_document(&state.paths.trending).await
}

async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        return preflight().await;
    }
    json_error(StatusCode::NOT_FOUND, "Invalid endpoint")
}

pub fn router(paths: SnapshotPaths) -> Router {
    let state = ServerState {
        paths: Arc::new(paths),
    };
    Router::new()
        .route("/stocks", get(stocks).post(stocks).options(preflight))
        .route("/best", get(best).post(best).options(preflight))
        .route("/trending", get(trending).post(trending).options(preflight))
        .fallback(fallback)
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    paths: SnapshotPaths,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(AppError::Io)
        .with_context(|| format!("failed to bind snapshot server on {}", addr))?;
    serve_listener(listener, paths, shutdown).await
}

/// Runs until `shutdown` flips to `true` (or its sender is dropped).
pub async fn serve_listener(
    listener: TcpListener,
    paths: SnapshotPaths,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let local = listener.local_addr().map_err(AppError::Io)?;
    tracing::info!(
        addr = %local,
        endpoints = "/stocks, /best, /trending",
        "Snapshot server listening"
    );
    axum::serve(listener, router(paths))
        .with_graceful_shutdown(async move { shutdown_requested(&mut shutdown).await })
        .await
        .context("snapshot server failed")?;
    tracing::info!("Snapshot server stopped");
    Ok(())
}
