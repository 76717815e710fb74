//! # Preview Server
//!
//! Serves sandbox documents over HTTP so a browser can open any chapter.
//!
//! | Route | Answer |
//! |-------|--------|
//! | `GET /health` | status and version |
//! | `GET /tree` | resolved chapter tree as JSON |
//! | `GET /preview/{*full_entry}` | sandbox document of one instance |
//! | `POST /reload` | reload the prelude |

use crate::client::ContentError;
use crate::live::LiveReload;
use crate::store::ChapterStore;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use canvasbox_core::{NodeKind, Theme, create_iframe_doc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// =============================================================================
// STATE
// =============================================================================

/// Shared state of the preview server.
#[derive(Debug, Clone)]
pub struct ApiState {
    pub store: Arc<ChapterStore>,
    pub template: Arc<str>,
}

impl ApiState {
    #[must_use]
    pub fn new(store: Arc<ChapterStore>, template: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            template: template.into(),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    /// No node at this full entry.
    NotFound(String),
    /// The node is a directory and has nothing to preview.
    NotInstance(String),
    /// The content server failed.
    Upstream(ContentError),
    /// The document could not be assembled.
    Render(serde_json::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(entry) => (StatusCode::NOT_FOUND, format!("no chapter at {}", entry)),
            Self::NotInstance(entry) => (
                StatusCode::NOT_FOUND,
                format!("{} is a directory, not a chapter instance", entry),
            ),
            Self::Upstream(err) => (StatusCode::BAD_GATEWAY, err.to_string()),
            Self::Render(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        Self::Upstream(err)
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct ReloadResponse {
    pub nodes: usize,
}

/// Theme query of the preview route.
#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub dark: bool,
    pub surface: Option<String>,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn tree_handler(State(state): State<ApiState>) -> Response {
    let app = state.store.state().await;
    Json(app.tree()).into_response()
}

async fn reload_handler(State(state): State<ApiState>) -> Result<Json<ReloadResponse>, ApiError> {
    let nodes = state.store.load().await?;
    Ok(Json(ReloadResponse { nodes }))
}

async fn preview_handler(
    State(state): State<ApiState>,
    Path(path): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Html<String>, ApiError> {
    let full_entry = format!("/{}", path.trim_matches('/'));

    let instance = {
        let app = state.store.state().await;
        let node = app
            .tree()
            .find(&full_entry)
            .ok_or_else(|| ApiError::NotFound(full_entry.clone()))?;
        match &node.kind {
            NodeKind::Instance(instance) => instance.clone(),
            NodeKind::Directory { .. } => return Err(ApiError::NotInstance(full_entry)),
        }
    };

    let client = state.store.client();
    let sources = client.instance_sources(&full_entry, &instance).await?;
    let theme = Theme {
        dark: query.dark,
        surface: query.surface,
    };
    let document = create_iframe_doc(
        &state.template,
        client.locator().base_url(),
        &sources.content(theme, &instance.import_maps),
    )
    .map_err(ApiError::Render)?;
    Ok(Html(document))
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the preview router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/tree", get(tree_handler))
        .route("/reload", post(reload_handler))
        .route("/preview/{*full_entry}", get(preview_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Forward live-reload rebuilds into store reloads.
pub fn spawn_reload_on_rebuild(live: &LiveReload, store: Arc<ChapterStore>) {
    let (_id, mut rebuilds) = live.subscribe();
    tokio::spawn(async move {
        while rebuilds.recv().await.is_some() {
            if let Err(err) = store.load().await {
                tracing::warn!(%err, "reload after rebuild failed");
            }
        }
    });
}

/// Run the preview server until Ctrl+C.
pub async fn serve(
    state: ApiState,
    addr: SocketAddr,
    live: Option<LiveReload>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(live) = &live {
        spawn_reload_on_rebuild(live, Arc::clone(&state.store));
        if let Err(err) = live.init().await {
            tracing::warn!(%err, "live reload unavailable");
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "preview server listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
