use serde::Serialize;
use serde_json::{Map, Value};

/// Machine-readable outcome code carried by every response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Code {
    Ok,
    BadRequest,
    PayloadTooLarge,
    MethodNotAllowed,
    Misconfig,
    Unauthorized,
    Forbidden,
    Timeout,
    RateLimit,
    RateLimitExceeded,
    NotFound,
    TlsError,
    XmlError,
    RpcError,
    TtsError,
    ApiError,
    AuthError,
    ConnectionError,
    ServerError,
}

impl Code {
    /// Wire representation of the code
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "BAD_REQUEST",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::Misconfig => "MISCONFIG",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Timeout => "TIMEOUT",
            Self::RateLimit => "RATE_LIMIT",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::TlsError => "TLS_ERROR",
            Self::XmlError => "XML_ERROR",
            Self::RpcError => "RPC_ERROR",
            Self::TtsError => "TTS_ERROR",
            Self::ApiError => "API_ERROR",
            Self::AuthError => "AUTH_ERROR",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::ServerError => "SERVER_ERROR",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform JSON body returned by every handler
///
/// Serializes as `{ok, code, message?, data?, details?, ...extra}`. Route
/// specific top-level fields (e.g. `audioId`, `total`) go into `extra`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub ok: bool,
    pub code: Code,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Successful envelope with code `OK`
    pub fn success() -> Self {
        Self::new(true, Code::Ok)
    }

    /// Failed envelope with the given code
    pub fn failure(code: Code) -> Self {
        Self::new(false, code)
    }

    fn new(ok: bool, code: Code) -> Self {
        Self {
            ok,
            code,
            message: None,
            data: None,
            details: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Add a route-specific top-level field
    #[must_use]
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_owned(), value);
        self
    }
}
