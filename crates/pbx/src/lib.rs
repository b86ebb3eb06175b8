#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod client;
mod error;
mod token;

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use callgate_config::Config;
use callgate_core::{Envelope, mask_secret};
use serde_json::json;

pub use client::PbxClient;
pub use error::{PbxError, Result};
pub use token::TokenProvider;

/// Issabel state shared by the route handlers
pub struct Server {
    client: std::result::Result<PbxClient, String>,
}

impl Server {
    pub fn client(&self) -> Result<&PbxClient> {
        self.client
            .as_ref()
            .map_err(|message| PbxError::Misconfig(message.clone()))
    }
}

/// Build the Issabel server from configuration
pub fn build_server(config: &Config) -> Arc<Server> {
    let client = PbxClient::from_config(&config.issabel).map_err(|error| {
        tracing::warn!(%error, "issabel routes disabled until configured");
        error.to_string()
    });

    Arc::new(Server { client })
}

/// Create the endpoint router for Issabel
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new().route("/api/issabel/health", get(health))
}

/// Authenticate and run a lightweight extensions query
async fn health(State(server): State<Arc<Server>>) -> Result<Json<Envelope>> {
    let client = server.client()?;
    let data = client.get("/pbxapi/extensions", &[("limit", "1")]).await?;

    Ok(Json(
        Envelope::success()
            .message("Issabel connection successful")
            .details(json!({
                "baseUrl": client.base_url(),
                "username": mask_secret(client.username()),
                "authenticated": true,
                "dataReceived": !data.is_null(),
            })),
    ))
}
