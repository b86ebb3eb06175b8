use std::{sync::Arc, time::Duration};

use mini_moka::sync::Cache;

use crate::{error::Result, provider::SpeechProvider};

/// Voice list served from memory for a fixed TTL
pub struct VoicesCache {
    cache: Cache<(), Arc<serde_json::Value>>,
}

impl VoicesCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();

        Self { cache }
    }

    /// Cached voice list, fetched from the provider when stale
    pub async fn get(&self, provider: &dyn SpeechProvider) -> Result<Arc<serde_json::Value>> {
        if let Some(voices) = self.cache.get(&()) {
            tracing::debug!("serving cached voice list");
            return Ok(voices);
        }

        let voices = Arc::new(provider.voices().await?);
        self.cache.insert((), voices.clone());

        tracing::debug!(provider = provider.name(), "refreshed voice list");

        Ok(voices)
    }
}
