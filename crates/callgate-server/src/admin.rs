use std::sync::Arc;

use axum::{
    Json,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use callgate_core::{Code, Envelope};
use http::{StatusCode, header};
use secrecy::{ExposeSecret, SecretString};

/// Header accepted as an alternative to `Authorization: Bearer`
const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

fn presented_token(request: &Request) -> Option<&str> {
    let headers = request.headers();

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .or_else(|| headers.get(ADMIN_TOKEN_HEADER).and_then(|value| value.to_str().ok()))
        .map(str::trim)
}

/// Compare without short-circuiting on the first differing byte
fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Require the admin token on the wrapped routes
pub async fn admin_token_middleware(token: Arc<SecretString>, request: Request, next: Next) -> Response {
    let authorized = presented_token(&request).is_some_and(|presented| tokens_match(presented, token.expose_secret()));

    if !authorized {
        tracing::debug!(path = %request.uri().path(), "rejected request without a valid admin token");

        return (
            StatusCode::UNAUTHORIZED,
            Json(Envelope::failure(Code::Unauthorized).message("Missing or invalid admin token")),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_comparison() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3cret", "s3cre"));
        assert!(!tokens_match("s3creT", "s3cret"));
    }
}
