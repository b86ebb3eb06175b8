use std::time::Duration;

use serde::Deserialize;

/// Request rate limiting, held in process memory
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Limit shared by all clients
    #[serde(default)]
    pub global: Option<RequestRateLimit>,
    /// Limit per client IP (`X-Forwarded-For`, then `X-Real-IP`)
    #[serde(default)]
    pub per_ip: Option<RequestRateLimit>,
}

/// Request-based rate limit
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestRateLimit {
    /// Maximum requests per window
    pub requests: u32,
    /// Window duration (e.g. "1m", "1h")
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub window: Duration,
}
