use std::{path::PathBuf, time::Duration};

use secrecy::SecretString;
use serde::Deserialize;

/// ElevenLabs text-to-speech upstream and the local asset cache
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElevenLabsConfig {
    /// API key sent as `xi-api-key`
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// API origin, without the `/v1` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Voice used when a request does not name one
    #[serde(default = "default_voice_id")]
    pub default_voice_id: String,
    /// Model passed as `model_id`
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Output format used when a request does not name one
    #[serde(default = "default_format")]
    pub default_format: String,
    /// Maximum accepted text length in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Directory holding generated audio files
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Age after which generated assets are removed
    #[serde(default = "default_asset_ttl", deserialize_with = "crate::duration::deserialize")]
    pub asset_ttl: Duration,
    /// Interval between asset sweeps
    #[serde(default = "default_sweep_interval", deserialize_with = "crate::duration::deserialize")]
    pub sweep_interval: Duration,
    /// How long the voice list is served from memory
    #[serde(default = "default_voices_ttl", deserialize_with = "crate::duration::deserialize")]
    pub voices_ttl: Duration,
    /// Timeout for speech generation calls
    #[serde(default = "default_generate_timeout", deserialize_with = "crate::duration::deserialize")]
    pub generate_timeout: Duration,
    /// Timeout for every other call
    #[serde(default = "default_request_timeout", deserialize_with = "crate::duration::deserialize")]
    pub request_timeout: Duration,
}

impl ElevenLabsConfig {
    /// API key, ignoring an empty value
    pub fn api_key(&self) -> Option<&SecretString> {
        crate::non_empty_secret(self.api_key.as_ref())
    }
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_voice_id: default_voice_id(),
            model_id: default_model_id(),
            default_format: default_format(),
            max_text_length: default_max_text_length(),
            storage_dir: default_storage_dir(),
            asset_ttl: default_asset_ttl(),
            sweep_interval: default_sweep_interval(),
            voices_ttl: default_voices_ttl(),
            generate_timeout: default_generate_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.elevenlabs.io".to_owned()
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_owned()
}

fn default_model_id() -> String {
    "eleven_monolingual_v1".to_owned()
}

fn default_format() -> String {
    "mp3_44100_128".to_owned()
}

const fn default_max_text_length() -> usize {
    5000
}

fn default_storage_dir() -> PathBuf {
    std::env::temp_dir().join("tts-assets")
}

const fn default_asset_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

const fn default_sweep_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

const fn default_voices_ttl() -> Duration {
    Duration::from_secs(10 * 60)
}

const fn default_generate_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(15)
}
