#![allow(clippy::must_use_candidate)]

pub mod cors;
mod duration;
pub mod elevenlabs;
mod env;
pub mod health;
pub mod issabel;
mod loader;
pub mod rate_limit;
pub mod server;
pub mod sippy;
pub mod telemetry;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

pub use cors::*;
pub use elevenlabs::*;
pub use health::*;
pub use issabel::*;
pub use rate_limit::*;
pub use server::*;
pub use sippy::*;
pub use telemetry::*;

/// Top-level callgate configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// ElevenLabs text-to-speech upstream
    #[serde(default)]
    pub elevenlabs: ElevenLabsConfig,
    /// Sippy billing XML-RPC upstream
    #[serde(default)]
    pub sippy: SippyConfig,
    /// Issabel PBX admin API upstream
    #[serde(default)]
    pub issabel: IssabelConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Treat an empty secret the same as a missing one
///
/// Config values expanded from unset variables with `default("")` end up
/// as empty strings rather than absent keys.
pub(crate) fn non_empty_secret(secret: Option<&SecretString>) -> Option<&SecretString> {
    secret.filter(|value| !value.expose_secret().is_empty())
}

pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|value| !value.is_empty())
}
