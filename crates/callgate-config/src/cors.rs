use std::time::Duration;

use serde::Deserialize;

/// CORS configuration for browser clients of the API
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; empty or containing `"*"` allows any origin
    #[serde(default)]
    pub allow_origins: Vec<String>,
    /// Extra request headers allowed on top of `content-type` and `authorization`
    #[serde(default)]
    pub allow_headers: Vec<String>,
    /// Allow credentials (requires explicit origins)
    #[serde(default)]
    pub allow_credentials: bool,
    /// How long browsers may cache the preflight response
    #[serde(default, deserialize_with = "crate::duration::deserialize_option")]
    pub max_age: Option<Duration>,
}

impl CorsConfig {
    /// Whether every origin is allowed
    pub fn any_origin(&self) -> bool {
        self.allow_origins.is_empty() || self.allow_origins.iter().any(|origin| origin == "*")
    }
}
