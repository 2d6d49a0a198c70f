//! HTTP surface: the public RSS endpoint plus a manual refresh action

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::error::ServerError;
use crate::service::FeedService;
use crate::store::FeedRepository;

const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";
const FALLBACK_HOST: &str = "localhost";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<FeedService>,
    pub repository: Arc<dyn FeedRepository>,
    /// Canonical base URL; when absent it is derived from request headers
    pub public_url: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        service: Arc<FeedService>,
        repository: Arc<dyn FeedRepository>,
        public_url: Option<String>,
    ) -> Self {
        Self {
            service,
            repository,
            public_url: public_url.map(Arc::from),
        }
    }

    /// Base URL the current request reached us under
    fn base_url(&self, headers: &HeaderMap) -> String {
        if let Some(ref public_url) = self.public_url {
            return public_url.trim_end_matches('/').to_string();
        }

        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let scheme = match header_value("x-forwarded-proto") {
            Some("https") => "https",
            _ => "http",
        };
        let host = header_value(header::HOST.as_str()).unwrap_or(FALLBACK_HOST);

        // Only a well-formed origin ends up in the document.
        match Url::parse(&format!("{scheme}://{host}")) {
            Ok(url) if url.host().is_some() => url.origin().ascii_serialization(),
            _ => {
                tracing::debug!(host, "Ignoring malformed Host header");
                format!("{scheme}://{FALLBACK_HOST}")
            }
        }
    }
}

/// Flash-style outcome of a dashboard action
#[derive(Debug, Serialize)]
pub struct FlashMessage {
    pub status: &'static str,
    pub message: String,
}

impl FlashMessage {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::FeedNotFound(slug) => {
                tracing::debug!(%slug, "Unknown feed requested");
                (StatusCode::NOT_FOUND, "Feed not found").into_response()
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// Create the router
///
/// # Routes
/// - `GET /feed/:slug/rss` - Public RSS document (cached)
/// - `POST /feed/:slug/refresh` - Rebuild now, bypassing the cache
/// - `GET /health` - Liveness check
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/feed/:slug/rss", get(rss_feed))
        .route("/feed/:slug/refresh", post(refresh_feed))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr).await.map_err(|e| ServerError::Bind {
        addr: addr.to_string(),
        source: e,
    })?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn rss_feed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let feed = state
        .repository
        .get_by_slug(&slug)
        .await?
        .ok_or(ServerError::FeedNotFound(slug))?;

    let xml = state
        .service
        .generate_feed(&feed, &state.base_url(&headers))
        .await?;

    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], xml).into_response())
}

async fn refresh_feed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> (StatusCode, Json<FlashMessage>) {
    let feed = match state.repository.get_by_slug(&slug).await {
        Ok(Some(feed)) => feed,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(FlashMessage::error("Feed not found")),
            );
        }
        Err(e) => {
            tracing::error!(%slug, error = %e, "Failed to load feed for refresh");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FlashMessage::error(
                    "Could not load the feed. Please try again.",
                )),
            );
        }
    };

    match state
        .service
        .force_regenerate(&feed, &state.base_url(&headers))
        .await
    {
        Ok(_) => (
            StatusCode::OK,
            Json(FlashMessage::success(format!("Feed '{}' refreshed", feed.name))),
        ),
        Err(e) => {
            tracing::error!(%slug, error = %e, "Manual feed refresh failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FlashMessage::error(
                    "Could not refresh the feed. Please try again.",
                )),
            )
        }
    }
}

async fn health() -> &'static str {
    "ok"
}
