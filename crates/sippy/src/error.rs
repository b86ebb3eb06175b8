use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use callgate_core::{Code, HttpError, error_envelope};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RpcError>;

/// Longest upstream body echoed back in error details
const MAX_ERROR_BODY: usize = 500;

/// Failures of a Sippy XML-RPC call
#[derive(Debug, Error)]
pub enum RpcError {
    /// Sippy is not fully configured
    #[error("{0}")]
    Misconfig(String),

    /// Caller sent an invalid request
    #[error("{0}")]
    BadRequest(String),

    /// Connection refused, DNS failure, or the request timed out
    #[error("Cannot connect to Sippy: {0}")]
    Timeout(String),

    /// Certificate validation failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// Credentials rejected after the retry
    #[error("Unauthorized (HTTP 401) for user {username}")]
    Unauthorized { username: String },

    /// Authenticated but not permitted
    #[error("Forbidden (HTTP 403) for user {username}")]
    Forbidden { username: String },

    #[error("HTTP 404: Not Found")]
    NotFound,

    /// Any other non-success status
    #[error("HTTP {status}: {status_text} - {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    /// Server answered with an XML-RPC fault
    #[error("{message}")]
    Fault { code: i64, message: String },

    /// Well-formed response with an undecodable value
    #[error("Invalid XML-RPC response: {0}")]
    Xml(String),

    /// Other transport failure
    #[error("Request failed: {0}")]
    Transport(String),
}

impl RpcError {
    /// Classify a transport error from reqwest
    pub(crate) fn from_transport(error: &reqwest::Error) -> Self {
        Self::classify(error, error.is_timeout() || error.is_connect())
    }

    /// Certificate failures anywhere in the source chain win over the
    /// connect/timeout flag, since rustls reports them as connect errors.
    fn classify(error: &dyn std::error::Error, unreachable: bool) -> Self {
        let chain = error_chain(error);

        if chain.to_lowercase().contains("certificate") {
            return Self::Tls(chain);
        }

        if unreachable {
            return Self::Timeout(chain);
        }

        Self::Transport(chain)
    }

    /// Hint for operators shown by the health check
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Misconfig(_) => Some("Set sippy.url, sippy.username and sippy.password"),
            Self::Tls(_) => Some("Set sippy.tls_skip_verify = true for self-signed certificates"),
            Self::Unauthorized { .. } => Some("Check the Sippy API username and password"),
            Self::Forbidden { .. } => Some("Grant the API user access to XML-RPC methods"),
            Self::Timeout(_) => Some("Check that the Sippy host is reachable from the gateway"),
            _ => None,
        }
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    message
}

impl HttpError for RpcError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Misconfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> Code {
        match self {
            Self::Misconfig(_) => Code::Misconfig,
            Self::BadRequest(_) => Code::BadRequest,
            Self::Timeout(_) => Code::Timeout,
            Self::Tls(_) => Code::TlsError,
            Self::Unauthorized { .. } => Code::Unauthorized,
            Self::Forbidden { .. } => Code::Forbidden,
            Self::NotFound => Code::NotFound,
            Self::Xml(_) => Code::XmlError,
            Self::Http { .. } | Self::Fault { .. } | Self::Transport(_) => Code::RpcError,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Misconfig(message) | Self::BadRequest(message) => message.clone(),
            Self::Fault { message, .. } => message.clone(),
            Self::Timeout(_) => "Cannot connect to Sippy server".to_owned(),
            Self::Tls(_) => "TLS/SSL certificate error".to_owned(),
            Self::Unauthorized { .. } => "Sippy authentication failed after retry".to_owned(),
            Self::Forbidden { .. } => "Access denied - insufficient permissions".to_owned(),
            Self::NotFound => "Sippy endpoint not found".to_owned(),
            Self::Xml(_) => "Invalid XML-RPC response".to_owned(),
            Self::Http { .. } | Self::Transport(_) => "Sippy RPC call failed".to_owned(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Misconfig(_) | Self::BadRequest(_) => None,
            Self::Fault { code, message } => Some(serde_json::json!({ "faultCode": code, "faultString": message })),
            Self::Http { status, status_text, body } => {
                let body: String = body.chars().take(MAX_ERROR_BODY).collect();
                Some(format!("HTTP {status}: {status_text} - {body}").into())
            }
            other => Some(serde_json::Value::String(other.to_string())),
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        match &self {
            Self::Misconfig(_) => tracing::error!(error = %self, "sippy is not configured"),
            Self::BadRequest(_) => tracing::debug!(error = %self, "rejected sippy request"),
            _ => tracing::warn!(error = %self, "sippy call failed"),
        }

        let (status, envelope) = error_envelope(&self);
        (status, Json(envelope)).into_response()
    }
}
