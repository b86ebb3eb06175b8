//! Programmatic configuration builder for integration tests

use std::{net::SocketAddr, path::Path, time::Duration};

use callgate_config::{Config, CorsConfig, RateLimitConfig, RequestRateLimit};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    ///
    /// Assets are written below `storage_dir`.
    pub fn new(storage_dir: &Path) -> Self {
        let mut config = Config::default();
        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.elevenlabs.storage_dir = storage_dir.to_path_buf();

        Self { config }
    }

    /// Point ElevenLabs at a mock backend
    pub fn with_elevenlabs(mut self, base_url: &str) -> Self {
        self.config.elevenlabs.base_url = base_url.to_owned();
        self.config.elevenlabs.api_key = Some(SecretString::from("xi-test"));
        self
    }

    /// Point Sippy at a mock backend
    pub fn with_sippy(mut self, url: &str) -> Self {
        self.config.sippy.url = Some(url.to_owned());
        self.config.sippy.username = Some("api".to_owned());
        self.config.sippy.password = Some(SecretString::from("secret"));
        self.config.sippy.retry_backoff = Duration::from_millis(10);
        self
    }

    /// Point Issabel at a mock backend
    pub fn with_issabel(mut self, base_url: &str) -> Self {
        self.config.issabel.base_url = Some(base_url.to_owned());
        self.config.issabel.username = Some("admin".to_owned());
        self.config.issabel.password = Some(SecretString::from("secret"));
        self
    }

    /// Require a bearer token on the Sippy routes
    pub fn with_admin_token(mut self, token: &str) -> Self {
        self.config.server.admin_token = Some(SecretString::from(token));
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Limit each client to `requests` per minute
    pub fn with_per_ip_limit(mut self, requests: u32) -> Self {
        self.config.server.rate_limit = Some(RateLimitConfig {
            global: None,
            per_ip: Some(RequestRateLimit {
                requests,
                window: Duration::from_secs(60),
            }),
        });
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
