use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Issabel PBX admin API upstream
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssabelConfig {
    /// PBX origin, e.g. `https://pbx.example.com`
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    /// Accept self-signed certificates
    #[serde(default)]
    pub tls_skip_verify: bool,
    /// Per-request timeout
    #[serde(default = "default_timeout", deserialize_with = "crate::duration::deserialize")]
    pub timeout: Duration,
}

impl IssabelConfig {
    pub fn base_url(&self) -> Option<&str> {
        crate::non_empty(self.base_url.as_ref())
    }

    pub fn username(&self) -> Option<&str> {
        crate::non_empty(self.username.as_ref())
    }

    pub fn password(&self) -> Option<&SecretString> {
        crate::non_empty_secret(self.password.as_ref())
    }
}

impl Default for IssabelConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            tls_skip_verify: false,
            timeout: default_timeout(),
        }
    }
}

const fn default_timeout() -> Duration {
    Duration::from_secs(15)
}
