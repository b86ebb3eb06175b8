use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use callgate_core::{Code, HttpError, error_envelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PbxError>;

/// Issabel PBX API errors
#[derive(Debug, Error)]
pub enum PbxError {
    #[error("{0}")]
    Misconfig(String),

    /// Connection refused, DNS failure, or timeout
    #[error("Cannot connect to Issabel: {0}")]
    Timeout(String),

    /// Credentials or token rejected
    #[error("Issabel returned 401 Unauthorized")]
    Unauthorized,

    #[error("Issabel returned 404 Not Found for {0}")]
    NotFound(String),

    /// Authentication succeeded without an `access_token`
    #[error("No access_token received from Issabel")]
    NoToken,

    /// Any other non-success status
    #[error("Issabel returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request to Issabel failed: {0}")]
    Connection(String),
}

impl PbxError {
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::Timeout(error.to_string())
        } else {
            Self::Connection(error.to_string())
        }
    }
}

impl HttpError for PbxError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Misconfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> Code {
        match self {
            Self::Misconfig(_) => Code::Misconfig,
            Self::Timeout(_) => Code::Timeout,
            Self::Unauthorized => Code::Unauthorized,
            Self::NotFound(_) => Code::NotFound,
            Self::NoToken => Code::AuthError,
            Self::Http { .. } | Self::Connection(_) => Code::ConnectionError,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Misconfig(message) => message.clone(),
            Self::Timeout(_) => "Cannot connect to Issabel server".to_owned(),
            Self::Unauthorized => "Issabel authentication failed".to_owned(),
            Self::NotFound(_) => "Issabel API endpoint not found".to_owned(),
            Self::NoToken => "Failed to get authentication token".to_owned(),
            Self::Http { .. } | Self::Connection(_) => "Issabel health check failed".to_owned(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        let details = match self {
            Self::Misconfig(_) => "Set issabel.base_url, issabel.username and issabel.password".to_owned(),
            Self::Unauthorized => "Check the Issabel username and password".to_owned(),
            Self::NoToken => "Issabel did not return a valid JWT token".to_owned(),
            other => other.to_string(),
        };

        Some(details.into())
    }
}

impl IntoResponse for PbxError {
    fn into_response(self) -> Response {
        match &self {
            Self::Misconfig(_) => tracing::error!(error = %self, "issabel is not configured"),
            _ => tracing::warn!(error = %self, "issabel call failed"),
        }

        let (status, envelope) = error_envelope(&self);
        (status, Json(envelope)).into_response()
    }
}
