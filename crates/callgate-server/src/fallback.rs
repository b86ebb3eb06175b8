use axum::{Json, extract::Request, response::IntoResponse};
use callgate_core::{Code, Envelope};
use http::StatusCode;

/// Envelope for unknown routes
pub async fn not_found(request: Request) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::failure(Code::NotFound).message(format!("No route for {}", request.uri().path()))),
    )
}

/// Envelope for known routes called with an unsupported method
pub async fn method_not_allowed(request: Request) -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(Envelope::failure(Code::MethodNotAllowed).message(format!("Method {} is not allowed", request.method()))),
    )
}
