use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or [`Config::from_toml`] fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// Expands `{{ env.VAR }}` placeholders, then deserializes and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if variable expansion, TOML parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// Missing upstream credentials are not an error here: the affected
    /// routes answer `MISCONFIG` at request time instead.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed URLs, zero limits, or an invalid
    /// health path
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server()?;
        self.validate_elevenlabs()?;
        self.validate_upstream_urls()?;
        self.warn_partial_credentials();
        Ok(())
    }

    fn validate_server(&self) -> anyhow::Result<()> {
        if !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        if let Some(ref rate_limit) = self.server.rate_limit {
            for (name, limit) in [("global", &rate_limit.global), ("per_ip", &rate_limit.per_ip)] {
                let Some(limit) = limit else { continue };

                if limit.requests == 0 {
                    anyhow::bail!("server.rate_limit.{name}.requests must be greater than 0");
                }
                if limit.window.is_zero() {
                    anyhow::bail!("server.rate_limit.{name}.window must be greater than 0");
                }
            }
        }

        if let Some(ref cors) = self.server.cors
            && cors.allow_credentials
            && cors.any_origin()
        {
            anyhow::bail!("server.cors.allow_credentials requires explicit allow_origins");
        }

        Ok(())
    }

    fn validate_elevenlabs(&self) -> anyhow::Result<()> {
        let elevenlabs = &self.elevenlabs;

        if elevenlabs.max_text_length == 0 {
            anyhow::bail!("elevenlabs.max_text_length must be greater than 0");
        }

        if elevenlabs.sweep_interval.is_zero() {
            anyhow::bail!("elevenlabs.sweep_interval must be greater than 0");
        }

        if elevenlabs.default_voice_id.is_empty() {
            anyhow::bail!("elevenlabs.default_voice_id must not be empty");
        }

        Ok(())
    }

    fn validate_upstream_urls(&self) -> anyhow::Result<()> {
        let urls = [
            ("elevenlabs.base_url", Some(self.elevenlabs.base_url.as_str())),
            ("sippy.url", self.sippy.url()),
            ("issabel.base_url", self.issabel.base_url()),
        ];

        for (field, value) in urls {
            let Some(value) = value else { continue };

            let url = url::Url::parse(value).map_err(|e| anyhow::anyhow!("invalid {field} '{value}': {e}"))?;

            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("{field} must use http or https, got '{}'", url.scheme());
            }
        }

        Ok(())
    }

    fn warn_partial_credentials(&self) {
        if self.sippy.url().is_some() && (self.sippy.username().is_none() || self.sippy.password().is_none()) {
            tracing::warn!("sippy.url is set but credentials are missing, sippy routes will answer MISCONFIG");
        }

        if self.issabel.base_url().is_some()
            && (self.issabel.username().is_none() || self.issabel.password().is_none())
        {
            tracing::warn!("issabel.base_url is set but credentials are missing");
        }
    }
}
