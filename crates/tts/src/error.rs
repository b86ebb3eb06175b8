use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use callgate_core::{Code, HttpError, error_envelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TtsError>;

/// Upstream call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Synthesize,
    Voices,
    OutboundCall,
}

/// Text-to-speech errors with their HTTP mapping
#[derive(Debug, Error)]
pub enum TtsError {
    /// ElevenLabs is not configured
    #[error("{0}")]
    Misconfig(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Missing required parameters")]
    MissingParameters { required: &'static [&'static str] },

    /// Text longer than the configured maximum
    #[error("Text exceeds maximum length of {max} characters")]
    TextTooLong { max: usize },

    /// Request body over the extractor limit
    #[error("Request body is too large, limit is {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Unsupported Content-Type, expected: 'Content-Type: application/json'")]
    UnsupportedMediaType,

    /// ElevenLabs answered with a non-success status
    #[error("ElevenLabs API error ({status})")]
    Upstream {
        operation: Operation,
        status: u16,
        detail: Option<serde_json::Value>,
    },

    /// ElevenLabs could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Audio ID '{0}' does not exist or has been cleaned up")]
    AssetNotFound(String),

    /// Reading or writing an asset file failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl HttpError for TtsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Misconfig(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequest(_) | Self::MissingParameters { .. } | Self::TextTooLong { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Upstream { status, .. } => StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Connection(_) => StatusCode::BAD_GATEWAY,
            Self::AssetNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn code(&self) -> Code {
        match self {
            Self::Misconfig(_) => Code::Misconfig,
            Self::InvalidRequest(_) | Self::MissingParameters { .. } | Self::UnsupportedMediaType => Code::BadRequest,
            Self::TextTooLong { .. } | Self::BodyTooLarge { .. } => Code::PayloadTooLarge,
            Self::Upstream { operation, status, .. } => match status {
                400 => Code::BadRequest,
                401 => Code::Unauthorized,
                403 => Code::Forbidden,
                404 => Code::NotFound,
                429 => Code::RateLimit,
                _ if *operation == Operation::Synthesize => Code::TtsError,
                _ => Code::ApiError,
            },
            Self::Connection(_) => Code::Timeout,
            Self::AssetNotFound(_) => Code::NotFound,
            Self::Storage(_) => Code::ServerError,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Upstream { operation, status, .. } => match (status, operation) {
                (400, _) => "Invalid request parameters",
                (401, _) => "Invalid ElevenLabs API key",
                (403, _) => "Access forbidden - check API key permissions",
                (404, Operation::Synthesize) => "Voice ID not found",
                (429, _) => "ElevenLabs API rate limit exceeded",
                (_, Operation::Synthesize) => "Failed to generate speech",
                (_, Operation::Voices) => "Failed to fetch ElevenLabs voices",
                (_, Operation::OutboundCall) => "Failed to initiate outbound call",
            }
            .to_owned(),
            Self::Connection(_) => "Cannot connect to ElevenLabs API".to_owned(),
            Self::AssetNotFound(_) => "Audio file not found".to_owned(),
            Self::Storage(_) => "Failed to access audio storage".to_owned(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Upstream { detail, .. } => Some(detail.clone().unwrap_or_else(|| self.to_string().into())),
            Self::MissingParameters { required } => Some(serde_json::json!({ "required": required })),
            Self::Connection(_) | Self::AssetNotFound(_) | Self::Storage(_) => Some(self.to_string().into()),
            _ => None,
        }
    }
}

impl IntoResponse for TtsError {
    fn into_response(self) -> Response {
        match &self {
            Self::Misconfig(_) | Self::Storage(_) => tracing::error!(error = %self, "tts request failed"),
            Self::Upstream { .. } | Self::Connection(_) => tracing::warn!(error = %self, "elevenlabs call failed"),
            _ => tracing::debug!(error = %self, "rejected tts request"),
        }

        let (status, envelope) = error_envelope(&self);
        (status, Json(envelope)).into_response()
    }
}
