#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
mod provider;
mod request;
mod server;
mod store;
mod sweeper;
mod voices;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use callgate_core::Envelope;
use serde::Deserialize;
use serde_json::json;

pub use error::{Operation, Result, TtsError};
pub use provider::{OutboundCall, SpeechProvider, SpeechRequest, elevenlabs::ElevenLabsProvider};
pub use server::{CallStarted, Generated, Server, TtsServerBuilder};
pub use store::{AssetRecord, AssetStore, AudioFormat, asset_key};
pub use sweeper::spawn_sweeper;
use request::ExtractPayload;

/// Build the TTS server from configuration
pub fn build_server(config: &callgate_config::Config) -> Arc<Server> {
    Arc::new(TtsServerBuilder::new(config).build())
}

/// Create the endpoint router for TTS
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new()
        .route("/api/elevenlabs/generate", post(generate))
        .route("/api/elevenlabs/tts", post(synthesize))
        .route("/api/elevenlabs/voices", get(voices))
        .route("/api/elevenlabs/outbound-call", post(outbound_call))
        .route("/api/tts/{audio_id}", get(retrieve))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    text: Option<String>,
    voice_id: Option<String>,
    format: Option<String>,
    meta: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct InlineRequest {
    text: Option<String>,
    voice_id: Option<String>,
    output_format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutboundCallRequest {
    agent_id: Option<String>,
    agent_phone_number_id: Option<String>,
    to_number: Option<String>,
}

/// Generate speech through the asset cache
async fn generate(
    State(server): State<Arc<Server>>,
    ExtractPayload(request): ExtractPayload<GenerateRequest>,
) -> Result<Json<Envelope>> {
    let generated = server.generate(request.text, request.voice_id, request.format).await?;

    let mut envelope = Envelope::success();

    if let serde_json::Value::Object(fields) = serde_json::to_value(&generated).unwrap_or_default() {
        envelope.extra.extend(fields);
    }

    let meta = request.meta.filter(|meta| !meta.is_null()).unwrap_or_else(|| json!({}));

    Ok(Json(envelope.field("meta", meta)))
}

/// Synthesize speech and return it inline as base64
async fn synthesize(
    State(server): State<Arc<Server>>,
    ExtractPayload(request): ExtractPayload<InlineRequest>,
) -> Result<Json<Envelope>> {
    let (speech, audio) = server
        .synthesize(request.text, request.voice_id, request.output_format)
        .await?;

    Ok(Json(Envelope::success().data(json!({
        "audio": base64::engine::general_purpose::STANDARD.encode(&audio),
        "format": speech.output_format,
        "voice_id": speech.voice_id,
        "text_length": speech.text.chars().count(),
    }))))
}

/// List voices, served from cache when fresh
async fn voices(State(server): State<Arc<Server>>) -> Result<Json<Envelope>> {
    let voices = server.voices().await?;

    Ok(Json(Envelope::success().data(voices.as_ref().clone())))
}

/// Start an outbound call through a conversational agent
async fn outbound_call(
    State(server): State<Arc<Server>>,
    ExtractPayload(request): ExtractPayload<OutboundCallRequest>,
) -> Result<Json<Envelope>> {
    let started = server
        .outbound_call(request.agent_id, request.agent_phone_number_id, request.to_number)
        .await?;

    Ok(Json(
        Envelope::success()
            .message("Outbound call initiated successfully")
            .data(serde_json::to_value(&started).unwrap_or_default()),
    ))
}

/// Serve a stored asset
async fn retrieve(State(server): State<Arc<Server>>, Path(audio_id): Path<String>) -> Result<Response> {
    let (audio, format) = server.store().read(&audio_id).await?;

    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{audio_id}\""))
        .map_err(|_| TtsError::AssetNotFound(audio_id.clone()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400")),
        ],
        audio,
    )
        .into_response())
}
