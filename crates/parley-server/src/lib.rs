//! Parley server library logic.
//!
//! Exposes the voice pipeline over HTTP: submit an utterance, poll the
//! latest exchange, and start a new conversation.

pub mod api;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use parley_voice::PipelineCoordinator;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Extra room on top of the audio limit for multipart boundaries and headers.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pipeline coordinator; owns the shared conversation transcript.
    pub pipeline: Arc<PipelineCoordinator>,
    /// Directory holding `index.html` and other front-end assets.
    pub static_dir: Option<PathBuf>,
    /// Largest accepted audio upload, in bytes.
    pub max_audio_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Arc<PipelineCoordinator>, max_audio_bytes: usize) -> Self {
        Self {
            pipeline,
            static_dir: None,
            max_audio_bytes,
        }
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let voice_routes = Router::new()
        .route("/process_voice", post(api::process_voice_handler))
        .layer(DefaultBodyLimit::max(
            state.max_audio_bytes + MULTIPART_OVERHEAD_BYTES,
        ));

    let router = Router::new()
        .route("/health", get(health))
        .route("/", get(api::index_handler))
        .route("/get_latest_text", get(api::latest_text_handler))
        .route(
            "/api/conversation/reset",
            post(api::reset_conversation_handler),
        )
        .merge(voice_routes);

    let router = match &state.static_dir {
        Some(dir) if dir.exists() => {
            tracing::info!(path = %dir.display(), "serving static files at /static");
            router.nest_service("/static", ServeDir::new(dir))
        }
        Some(dir) => {
            tracing::warn!(path = %dir.display(), "static directory not found, skipping static file serving");
            router
        }
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([
                    api::LATENCY_STT_HEADER,
                    api::LATENCY_LLM_HEADER,
                    api::LATENCY_TTS_HEADER,
                    api::LATENCY_TOTAL_HEADER,
                ]),
        )
        .layer(Extension(Arc::new(state)))
}
