use http::StatusCode;
use serde_json::Value;

use crate::{Code, Envelope};

/// Trait for domain errors that can be rendered as an envelope response
///
/// Implemented by each feature crate's error type. Feature crates turn
/// the pair returned by [`error_envelope`] into an axum response, keeping
/// this crate free of any web framework.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Envelope code (e.g. `UNAUTHORIZED`)
    fn code(&self) -> Code;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Optional diagnostic payload placed in `details`
    fn details(&self) -> Option<Value> {
        None
    }
}

/// Build the status and envelope for a failed request
pub fn error_envelope<E: HttpError + ?Sized>(error: &E) -> (StatusCode, Envelope) {
    let mut envelope = Envelope::failure(error.code()).message(error.client_message());

    if let Some(details) = error.details() {
        envelope = envelope.details(details);
    }

    (error.status_code(), envelope)
}
