use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    extract::{ConnectInfo, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use callgate_core::{Code, Envelope};
use callgate_ratelimit::{RateLimitError, RequestLimiter};
use http::StatusCode;

/// Rate limiting middleware using an Arc-wrapped limiter
pub async fn rate_limit_middleware_arc(limiter: Arc<RequestLimiter>, request: Request, next: Next) -> Response {
    // Check global rate limit
    if let Err(e) = limiter.check_global() {
        return rate_limit_response(&e);
    }

    // Check per-client rate limit
    if let Some(ip) = extract_client_ip(&request)
        && let Err(e) = limiter.check_ip(&ip)
    {
        tracing::debug!(client = %ip, "client rate limit exceeded");
        return rate_limit_response(&e);
    }

    next.run(request).await
}

/// Client address from proxy headers, falling back to the peer address
fn extract_client_ip(request: &Request) -> Option<String> {
    // Try X-Forwarded-For first
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
        && !first.trim().is_empty()
    {
        return Some(first.trim().to_string());
    }

    // Try X-Real-IP
    if let Some(real_ip) = request.headers().get("x-real-ip")
        && let Ok(val) = real_ip.to_str()
    {
        return Some(val.trim().to_string());
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

fn rate_limit_response(error: &RateLimitError) -> Response {
    match error {
        RateLimitError::Exceeded {
            limit,
            window_secs,
            retry_after,
        } => {
            let envelope = Envelope::failure(Code::RateLimitExceeded)
                .message(format!("Rate limit exceeded. Max {limit} requests per {window_secs}s."))
                .field("retryAfter", (*retry_after).into());

            let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(envelope)).into_response();
            let headers = response.headers_mut();

            headers.insert("retry-after", (*retry_after).into());
            headers.insert("x-ratelimit-limit", (*limit).into());
            headers.insert("x-ratelimit-remaining", 0u32.into());

            response
        }
        RateLimitError::Config(message) => {
            tracing::error!(%message, "rate limiter misconfigured");

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::failure(Code::ServerError).message("rate limiter error")),
            )
                .into_response()
        }
    }
}
