//! API handlers for the Parley server.

use crate::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Extension, Multipart,
    },
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderName, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    Json,
};
use parley_types::LatestExchange;
use parley_voice::{AudioUpload, PipelineError, PipelineResult};
use std::sync::Arc;
use thiserror::Error;

/// Multipart field that carries the recorded utterance.
const AUDIO_FIELD: &str = "audio";

pub const LATENCY_STT_HEADER: HeaderName = HeaderName::from_static("x-latency-stt");
pub const LATENCY_LLM_HEADER: HeaderName = HeaderName::from_static("x-latency-llm");
pub const LATENCY_TTS_HEADER: HeaderName = HeaderName::from_static("x-latency-tts");
pub const LATENCY_TOTAL_HEADER: HeaderName = HeaderName::from_static("x-latency-total");

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::InternalServerError(err.to_string())
        }
    }
}

/// Builds the audio response with its latency headers.
fn audio_response(result: PipelineResult) -> Response {
    let latency = result.latency;
    let headers = [
        (CONTENT_TYPE, result.format.mime_type().to_string()),
        (
            CONTENT_DISPOSITION,
            format!("inline; filename=\"response.{}\"", result.format.extension()),
        ),
        (LATENCY_STT_HEADER, latency.stt_ms.to_string()),
        (LATENCY_LLM_HEADER, latency.llm_ms.to_string()),
        (LATENCY_TTS_HEADER, latency.tts_ms.to_string()),
        (LATENCY_TOTAL_HEADER, latency.total_ms.to_string()),
    ];
    (StatusCode::OK, headers, result.audio).into_response()
}

fn multipart_error(context: &str, err: MultipartError) -> ApiError {
    let msg = format!("{}: {}", context, err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(msg)
    } else {
        ApiError::BadRequest(msg)
    }
}

/// Pulls the `audio` field out of the form, skipping any other fields.
async fn read_audio_field(mut multipart: Multipart) -> Result<Option<AudioUpload>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("malformed multipart body", e))?
    {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }
        let mime_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("failed to read audio field", e))?;

        let mut upload = AudioUpload::new(data.to_vec());
        if let Some(mime) = mime_type.filter(|m| m.starts_with("audio/")) {
            upload = upload.with_mime_type(mime);
        }
        return Ok(Some(upload));
    }
    Ok(None)
}

/// Handler for `POST /process_voice`.
///
/// Accepts a multipart form with an `audio` file and responds with the
/// synthesized reply. Stage timings are returned in `X-Latency-*` headers.
pub async fn process_voice_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let no_audio = || ApiError::BadRequest("No audio file provided".to_string());

    let multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "rejected non-multipart voice submission");
        no_audio()
    })?;
    let upload = read_audio_field(multipart).await?.ok_or_else(no_audio)?;

    tracing::info!(
        audio_bytes = upload.len(),
        mime_type = upload.mime_type.as_deref().unwrap_or("<unspecified>"),
        "received voice submission"
    );

    let result = state.pipeline.run_pipeline(upload).await?;
    Ok(audio_response(result))
}

/// Handler for `GET /get_latest_text`.
pub async fn latest_text_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<LatestExchange> {
    Json(state.pipeline.latest_exchange())
}

/// Handler for `POST /api/conversation/reset`.
pub async fn reset_conversation_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> StatusCode {
    state.pipeline.reset_conversation().await;
    StatusCode::NO_CONTENT
}

/// Handler for `GET /`.
///
/// Loading the page starts a new conversation, then serves `index.html`
/// from the static directory.
pub async fn index_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Html<String>, ApiError> {
    state.pipeline.reset_conversation().await;

    let dir = state
        .static_dir
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("no static directory configured".to_string()))?;
    let index = dir.join("index.html");

    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Ok(Html(html)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ApiError::NotFound(format!(
            "{} does not exist",
            index.display()
        ))),
        Err(e) => Err(ApiError::InternalServerError(format!(
            "failed to read {}: {}",
            index.display(),
            e
        ))),
    }
}
