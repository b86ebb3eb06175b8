use thiserror::Error;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Configuration error
    #[error("rate limit configuration error: {0}")]
    Config(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    Exceeded {
        /// Configured requests per window
        limit: u32,
        /// Configured window in seconds
        window_secs: u64,
        /// Seconds until another request is allowed
        retry_after: u64,
    },
}
