use std::sync::Arc;

use callgate_config::{Config, ElevenLabsConfig};
use serde::Serialize;

use crate::{
    error::{Result, TtsError},
    provider::{OutboundCall, SpeechProvider, SpeechRequest, elevenlabs::ElevenLabsProvider},
    store::{AssetRecord, AssetStore, AudioFormat},
    voices::VoicesCache,
};

/// Outcome of a cached generation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Generated {
    pub audio_id: String,
    pub audio_url: String,
    pub format: AudioFormat,
    pub voice_id: String,
    pub cached: bool,
}

impl Generated {
    fn new(record: AssetRecord, cached: bool) -> Self {
        Self {
            audio_url: format!("/api/tts/{}", record.audio_id),
            audio_id: record.audio_id,
            format: record.format,
            voice_id: record.voice_id,
            cached,
        }
    }
}

/// Outbound call accepted by the conversational agent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStarted {
    pub conversation_id: Option<String>,
    pub call_sid: Option<String>,
    /// `initiated` when the upstream reported success, else `failed`
    pub status: &'static str,
}

const OUTBOUND_CALL_FIELDS: &[&str] = &["agentId", "agentPhoneNumberId", "toNumber"];

/// TTS server holding the provider and the asset and voice caches
pub struct Server {
    provider: Option<Arc<dyn SpeechProvider>>,
    store: AssetStore,
    voices: VoicesCache,
    default_voice_id: String,
    default_format: String,
    max_text_length: usize,
}

impl Server {
    fn provider(&self) -> Result<&dyn SpeechProvider> {
        self.provider
            .as_deref()
            .ok_or_else(|| TtsError::Misconfig("ElevenLabs API key not configured".to_owned()))
    }

    pub fn store(&self) -> &AssetStore {
        &self.store
    }

    /// Validate text and fill in request defaults
    fn speech_request(&self, text: Option<String>, voice_id: Option<String>, format: Option<String>) -> Result<SpeechRequest> {
        let text = text
            .filter(|text| !text.is_empty())
            .ok_or_else(|| TtsError::InvalidRequest("Missing or invalid 'text' parameter".to_owned()))?;

        if text.chars().count() > self.max_text_length {
            return Err(TtsError::TextTooLong {
                max: self.max_text_length,
            });
        }

        Ok(SpeechRequest {
            text,
            voice_id: voice_id
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| self.default_voice_id.clone()),
            output_format: format
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| self.default_format.clone()),
        })
    }

    /// Generate speech once per (text, voice) and serve it from storage
    pub async fn generate(&self, text: Option<String>, voice_id: Option<String>, format: Option<String>) -> Result<Generated> {
        let provider = self.provider()?;
        let request = self.speech_request(text, voice_id, format)?;

        let (record, cached) = self
            .store
            .get_or_generate(&request.text, &request.voice_id, &request.output_format, || {
                provider.synthesize(&request)
            })
            .await?;

        Ok(Generated::new(record, cached))
    }

    /// Synthesize without caching
    pub async fn synthesize(
        &self,
        text: Option<String>,
        voice_id: Option<String>,
        format: Option<String>,
    ) -> Result<(SpeechRequest, Vec<u8>)> {
        let provider = self.provider()?;
        let request = self.speech_request(text, voice_id, format)?;
        let audio = provider.synthesize(&request).await?;

        Ok((request, audio))
    }

    pub async fn voices(&self) -> Result<Arc<serde_json::Value>> {
        let provider = self.provider()?;
        self.voices.get(provider).await
    }

    /// Have a conversational agent dial a number
    pub async fn outbound_call(
        &self,
        agent_id: Option<String>,
        agent_phone_number_id: Option<String>,
        to_number: Option<String>,
    ) -> Result<CallStarted> {
        let provider = self.provider()?;

        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let (Some(agent_id), Some(agent_phone_number_id), Some(to_number)) =
            (present(agent_id), present(agent_phone_number_id), present(to_number))
        else {
            return Err(TtsError::MissingParameters {
                required: OUTBOUND_CALL_FIELDS,
            });
        };

        let answer = provider
            .outbound_call(&OutboundCall {
                agent_id,
                agent_phone_number_id,
                to_number,
            })
            .await?;

        let text = |name: &str| answer.get(name).and_then(serde_json::Value::as_str).map(str::to_owned);

        let started = CallStarted {
            conversation_id: text("conversation_id"),
            call_sid: text("callSid"),
            status: if answer.get("success").and_then(serde_json::Value::as_bool) == Some(true) {
                "initiated"
            } else {
                "failed"
            },
        };

        tracing::info!(conversation = ?started.conversation_id, status = started.status, "outbound call requested");

        Ok(started)
    }
}

/// Builder for constructing the TTS server from configuration
pub struct TtsServerBuilder<'a> {
    config: &'a Config,
    provider: Option<Arc<dyn SpeechProvider>>,
}

impl<'a> TtsServerBuilder<'a> {
    pub const fn new(config: &'a Config) -> Self {
        Self { config, provider: None }
    }

    /// Use a custom provider instead of ElevenLabs
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn SpeechProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> Server {
        let config: &ElevenLabsConfig = &self.config.elevenlabs;

        let provider = self.provider.or_else(|| {
            let Some(api_key) = config.api_key() else {
                tracing::warn!("ElevenLabs API key not configured, TTS routes disabled");
                return None;
            };

            match ElevenLabsProvider::new(config, api_key.clone()) {
                Ok(provider) => Some(Arc::new(provider) as Arc<dyn SpeechProvider>),
                Err(error) => {
                    tracing::error!(%error, "ElevenLabs provider unavailable, TTS routes disabled");
                    None
                }
            }
        });

        if let Some(provider) = &provider {
            tracing::debug!(provider = provider.name(), storage = %config.storage_dir.display(), "TTS server initialized");
        }

        Server {
            provider,
            store: AssetStore::new(config.storage_dir.clone(), config.asset_ttl),
            voices: VoicesCache::new(config.voices_ttl),
            default_voice_id: config.default_voice_id.clone(),
            default_format: config.default_format.clone(),
            max_text_length: config.max_text_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct FakeProvider {
        calls: AtomicUsize,
        dialed: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechProvider for FakeProvider {
        async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}|{}", request.voice_id, request.output_format).into_bytes())
        }

        async fn voices(&self) -> Result<serde_json::Value> {
            Ok(serde_json::json!({"voices": []}))
        }

        async fn outbound_call(&self, call: &OutboundCall) -> Result<serde_json::Value> {
            self.dialed.lock().unwrap().push(call.to_number.clone());
            Ok(serde_json::json!({"success": true, "conversation_id": "conv-1", "callSid": "CA1"}))
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn server(dir: &std::path::Path, provider: Arc<FakeProvider>) -> Server {
        let mut config = Config::default();
        config.elevenlabs.storage_dir = dir.to_path_buf();
        config.elevenlabs.max_text_length = 10;

        TtsServerBuilder::new(&config).provider(provider).build()
    }

    #[tokio::test]
    async fn generate_applies_defaults_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::default());
        let server = server(dir.path(), provider.clone());

        let first = server.generate(Some("hello".into()), None, None).await.unwrap();
        let second = server.generate(Some("hello".into()), None, None).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.audio_id, second.audio_id);
        assert_eq!(first.voice_id, "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(first.format, AudioFormat::Mp3);
        assert_eq!(first.audio_url, format!("/api/tts/{}", first.audio_id));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn validation_never_reaches_provider() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::default());
        let server = server(dir.path(), provider.clone());

        let missing = server.generate(None, None, None).await.unwrap_err();
        let empty = server.generate(Some(String::new()), None, None).await.unwrap_err();
        let long = server.generate(Some("x".repeat(11)), None, None).await.unwrap_err();

        assert!(matches!(missing, TtsError::InvalidRequest(_)));
        assert!(matches!(empty, TtsError::InvalidRequest(_)));
        assert!(matches!(long, TtsError::TextTooLong { max: 10 }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn outbound_call_requires_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider::default());
        let server = server(dir.path(), provider.clone());

        let error = server
            .outbound_call(Some("agent".into()), Some(" ".into()), Some("+1555".into()))
            .await
            .unwrap_err();

        assert!(matches!(error, TtsError::MissingParameters { .. }));
        assert!(provider.dialed.lock().unwrap().is_empty());

        let started = server
            .outbound_call(Some("agent".into()), Some("phone".into()), Some("+1555".into()))
            .await
            .unwrap();

        assert_eq!(started.status, "initiated");
        assert_eq!(started.conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(started.call_sid.as_deref(), Some("CA1"));
        assert_eq!(*provider.dialed.lock().unwrap(), ["+1555"]);
    }

    #[tokio::test]
    async fn missing_api_key_is_misconfig() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.elevenlabs.storage_dir = dir.path().to_path_buf();

        let server = TtsServerBuilder::new(&config).build();

        assert!(matches!(server.voices().await, Err(TtsError::Misconfig(_))));
        assert!(matches!(
            server.generate(Some("hi".into()), None, None).await,
            Err(TtsError::Misconfig(_))
        ));
    }
}
