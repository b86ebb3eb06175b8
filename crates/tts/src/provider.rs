pub mod elevenlabs;

use async_trait::async_trait;
use serde::Serialize;

/// One speech synthesis call
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
    /// ElevenLabs output format, e.g. `mp3_44100_128` or `pcm_16000`
    pub output_format: String,
}

/// Outbound call placed by a conversational agent
#[derive(Debug, Clone, Serialize)]
pub struct OutboundCall {
    pub agent_id: String,
    pub agent_phone_number_id: String,
    pub to_number: String,
}

/// Trait for text-to-speech upstreams
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize text, returning the encoded audio bytes
    async fn synthesize(&self, request: &SpeechRequest) -> crate::error::Result<Vec<u8>>;

    /// List the voices available to the account
    async fn voices(&self) -> crate::error::Result<serde_json::Value>;

    /// Ask the upstream agent to dial `to_number`, returning its raw answer
    async fn outbound_call(&self, call: &OutboundCall) -> crate::error::Result<serde_json::Value>;

    /// Get the provider name
    fn name(&self) -> &str;
}
