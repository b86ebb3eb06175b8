use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::keyed::DashMapStateStore,
};

use crate::error::RateLimitError;

type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Keyed in-memory rate limiter backed by governor
///
/// A full window's worth of requests may arrive as a burst; capacity then
/// replenishes evenly across the window.
#[derive(Clone)]
pub struct MemoryLimiter {
    limiter: Arc<KeyedLimiter>,
    clock: DefaultClock,
    max_requests: u32,
    window: Duration,
}

impl MemoryLimiter {
    /// Allow `max_requests` per `window` for each key
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(max_requests)
            .ok_or_else(|| RateLimitError::Config("max_requests must be > 0".to_owned()))?;

        if window.is_zero() {
            return Err(RateLimitError::Config("rate limit window must be > 0".to_owned()));
        }

        let quota = Quota::with_period(window / max_requests)
            .ok_or_else(|| RateLimitError::Config("invalid rate limit period".to_owned()))?
            .allow_burst(burst);

        Ok(Self {
            limiter: Arc::new(RateLimiter::dashmap(quota)),
            clock: DefaultClock::default(),
            max_requests,
            window,
        })
    }

    /// Record a request for `key`, failing once the key is over its quota
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        self.limiter.check_key(&key.to_owned()).map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());

            RateLimitError::Exceeded {
                limit: self.max_requests,
                window_secs: self.window.as_secs(),
                // Round up so clients never retry a moment too early
                retry_after: wait.as_secs() + u64::from(wait.subsec_nanos() > 0),
            }
        })
    }

    /// Drop state for keys that have fully replenished
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}
