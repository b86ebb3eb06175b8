use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Sippy billing XML-RPC upstream
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SippyConfig {
    /// XML-RPC endpoint, e.g. `https://sippy.example.com/xmlapi/xmlapi`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Method invoked by the connection test and health check
    #[serde(default = "default_test_method")]
    pub test_method: String,
    /// Accept self-signed certificates
    #[serde(default)]
    pub tls_skip_verify: bool,
    /// Per-request timeout
    #[serde(default = "default_timeout", deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
    /// Pause before repeating a rejected authentication handshake
    #[serde(default = "default_retry_backoff", deserialize_with = "crate::duration::deserialize")]
    pub retry_backoff: Duration,
}

impl SippyConfig {
    pub fn url(&self) -> Option<&str> {
        crate::non_empty(self.url.as_ref())
    }

    pub fn username(&self) -> Option<&str> {
        crate::non_empty(self.username.as_ref())
    }

    pub fn password(&self) -> Option<&SecretString> {
        crate::non_empty_secret(self.password.as_ref())
    }
}

impl Default for SippyConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            test_method: default_test_method(),
            tls_skip_verify: false,
            timeout: default_timeout(),
            retry_backoff: default_retry_backoff(),
        }
    }
}

fn default_test_method() -> String {
    "system.listMethods".to_owned()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

const fn default_retry_backoff() -> Duration {
    Duration::from_secs(1)
}
