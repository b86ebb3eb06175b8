#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod cdr;
mod client;
mod codec;
mod digest;
mod error;
mod server;
mod value;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::get,
};
use callgate_core::{Envelope, error_envelope, mask_secret, mask_url};
use serde::Deserialize;
use serde_json::json;

pub use cdr::{CallRecord, CallStatus, CdrPage, CdrQuery};
pub use client::SippyClient;
pub use codec::{encode_method_call, parse_method_response};
pub use digest::{DigestChallenge, basic_authorization};
pub use error::{Result, RpcError};
pub use server::{Server, SippyServerBuilder};
pub use value::Value;

const TEST_PREVIEW: usize = 10;
const HEALTH_PREVIEW: usize = 5;

/// Build the Sippy server from configuration
pub fn build_server(config: &callgate_config::Config) -> Arc<Server> {
    Arc::new(SippyServerBuilder::new(config).build())
}

/// Create the endpoint router for Sippy
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new()
        .route("/api/sippy", get(test_connection).post(call_method))
        .route("/api/sippy/health", get(health))
        .route("/api/sippy/cdrs", get(list_cdrs))
}

#[derive(Debug, Deserialize)]
struct CallRequest {
    method: Option<String>,
    #[serde(default)]
    params: serde_json::Value,
}

/// First `n` items of an array result, or the whole value otherwise
fn preview(value: &Value, n: usize) -> serde_json::Value {
    match value.as_array() {
        Some(items) => items.iter().take(n).map(Value::to_json).collect(),
        None => value.to_json(),
    }
}

fn connection_details(server: &Server) -> serde_json::Value {
    match server.client() {
        Ok(client) => json!({
            "rpcUrl": mask_url(client.url().as_str()),
            "user": mask_secret(client.username()),
            "authMode": "digest/basic",
            "testMethod": server.test_method(),
        }),
        Err(_) => json!({ "testMethod": server.test_method() }),
    }
}

/// Invoke the configured test method
async fn test_connection(State(server): State<Arc<Server>>) -> Result<Json<Envelope>> {
    let result = server.call(server.test_method(), &[]).await?;

    let mut details = connection_details(&server);
    details["resultPreview"] = preview(&result, TEST_PREVIEW);

    Ok(Json(
        Envelope::success()
            .message("Sippy RPC connection successful")
            .details(details),
    ))
}

/// Invoke an arbitrary method
async fn call_method(
    State(server): State<Arc<Server>>,
    payload: std::result::Result<Json<CallRequest>, JsonRejection>,
) -> Result<Json<Envelope>> {
    server.client()?;

    let Json(request) = payload.map_err(|rejection| RpcError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text())))?;

    let method = request
        .method
        .filter(|method| !method.trim().is_empty())
        .ok_or_else(|| RpcError::BadRequest("Missing body.method parameter".to_owned()))?;

    let params = request.params.as_array().map(Vec::as_slice).unwrap_or_default();

    let result = server.call(&method, params).await?;

    Ok(Json(
        Envelope::success()
            .field("method", json!(method))
            .field("result", result.to_json()),
    ))
}

/// Connectivity check with operator hints on failure
async fn health(State(server): State<Arc<Server>>) -> Response {
    match server.call(server.test_method(), &[]).await {
        Ok(result) => Json(
            Envelope::success()
                .message("Sippy connection healthy")
                .data(json!({
                    "method": server.test_method(),
                    "preview": preview(&result, HEALTH_PREVIEW),
                }))
                .details(connection_details(&server)),
        )
        .into_response(),
        Err(error) => {
            tracing::warn!(%error, "sippy health check failed");

            let (status, mut envelope) = error_envelope(&error);

            if let Some(hint) = error.hint() {
                envelope = envelope.field("hint", json!(hint));
            }

            (status, Json(envelope)).into_response()
        }
    }
}

/// Fetch normalized call records
async fn list_cdrs(State(server): State<Arc<Server>>, Query(query): Query<CdrQuery>) -> Result<Json<Envelope>> {
    let page = server.fetch_cdrs(&query).await?;

    Ok(Json(
        Envelope::success()
            .message(format!("Successfully fetched {} call records", page.records.len()))
            .data(serde_json::to_value(&page.records).unwrap_or_default())
            .field("total", json!(page.total)),
    ))
}
