use std::net::SocketAddr;

use secrecy::SecretString;
use serde::Deserialize;

use crate::{cors::CorsConfig, health::HealthConfig, rate_limit::RateLimitConfig};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_address: Option<SocketAddr>,
    /// Bearer token required on the Sippy routes when set
    #[serde(default)]
    pub admin_token: Option<SecretString>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl ServerConfig {
    /// Admin token, ignoring an empty value
    pub fn admin_token(&self) -> Option<&SecretString> {
        crate::non_empty_secret(self.admin_token.as_ref())
    }
}
