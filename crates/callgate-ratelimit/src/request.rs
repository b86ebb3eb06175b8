use callgate_config::{RateLimitConfig, RequestRateLimit};

use crate::{error::RateLimitError, memory::MemoryLimiter};

/// HTTP request-level rate limiter (global and per client IP)
pub struct RequestLimiter {
    global: Option<MemoryLimiter>,
    per_ip: Option<MemoryLimiter>,
}

impl RequestLimiter {
    /// Create from configuration
    pub fn new(config: &RateLimitConfig) -> Result<Self, RateLimitError> {
        let global = config.global.as_ref().map(build_limiter).transpose()?;
        let per_ip = config.per_ip.as_ref().map(build_limiter).transpose()?;

        Ok(Self { global, per_ip })
    }

    /// Check the limit shared by all clients
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        match self.global {
            Some(ref limiter) => limiter.check("global"),
            None => Ok(()),
        }
    }

    /// Check the per-client limit
    pub fn check_ip(&self, ip: &str) -> Result<(), RateLimitError> {
        match self.per_ip {
            Some(ref limiter) => limiter.check(ip),
            None => Ok(()),
        }
    }

    /// Forget idle clients so the key map does not grow unbounded
    pub fn prune(&self) {
        if let Some(ref limiter) = self.per_ip {
            limiter.retain_recent();
            tracing::trace!("pruned idle rate limit keys");
        }
    }
}

fn build_limiter(rate_limit: &RequestRateLimit) -> Result<MemoryLimiter, RateLimitError> {
    MemoryLimiter::new(rate_limit.requests, rate_limit.window)
}
