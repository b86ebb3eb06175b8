use std::time::Duration;

use async_trait::async_trait;
use callgate_config::ElevenLabsConfig;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::{OutboundCall, SpeechProvider, SpeechRequest};
use crate::error::{Operation, TtsError};

/// How long an idle pooled connection to ElevenLabs is kept
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// `ElevenLabs` text-to-speech provider
pub struct ElevenLabsProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model_id: String,
    generate_timeout: Duration,
    request_timeout: Duration,
}

impl ElevenLabsProvider {
    /// Generation and listing each carry their own per-request timeout.
    pub fn new(config: &ElevenLabsConfig, api_key: SecretString) -> crate::error::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| TtsError::Misconfig(format!("Failed to build ElevenLabs HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
            model_id: config.model_id.clone(),
            generate_timeout: config.generate_timeout,
            request_timeout: config.request_timeout,
        })
    }
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

fn connection_error(error: &reqwest::Error) -> TtsError {
    tracing::error!("ElevenLabs request failed: {error}");
    TtsError::Connection(error.to_string())
}

/// Turn a non-success response into an upstream error, keeping `detail`
async fn upstream_error(operation: Operation, response: Response) -> TtsError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    tracing::error!("ElevenLabs API error ({status}): {body}");

    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|mut json| json.get_mut("detail").map(serde_json::Value::take))
        .or_else(|| (!body.is_empty()).then(|| serde_json::Value::String(body)));

    TtsError::Upstream {
        operation,
        status,
        detail,
    }
}

#[async_trait]
impl SpeechProvider for ElevenLabsProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> crate::error::Result<Vec<u8>> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, request.voice_id);

        tracing::debug!(
            voice = %request.voice_id,
            format = %request.output_format,
            text_len = request.text.chars().count(),
            "ElevenLabs TTS request"
        );

        let body = ElevenLabsRequest {
            text: &request.text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", request.output_format.as_str())])
            .header("xi-api-key", self.api_key.expose_secret())
            .header(http::header::ACCEPT, "audio/mpeg")
            .timeout(self.generate_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| connection_error(&e))?;

        if !response.status().is_success() {
            return Err(upstream_error(Operation::Synthesize, response).await);
        }

        let audio = response.bytes().await.map_err(|e| connection_error(&e))?;

        tracing::debug!("ElevenLabs TTS synthesis complete, {} bytes", audio.len());

        Ok(audio.to_vec())
    }

    async fn voices(&self) -> crate::error::Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/v1/voices", self.base_url))
            .header("xi-api-key", self.api_key.expose_secret())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| connection_error(&e))?;

        if !response.status().is_success() {
            return Err(upstream_error(Operation::Voices, response).await);
        }

        response.json().await.map_err(|e| connection_error(&e))
    }

    async fn outbound_call(&self, call: &OutboundCall) -> crate::error::Result<serde_json::Value> {
        tracing::debug!(agent = %call.agent_id, "ElevenLabs outbound call request");

        let response = self
            .client
            .post(format!("{}/v1/convai/twilio/outbound-call", self.base_url))
            .header("xi-api-key", self.api_key.expose_secret())
            .timeout(self.request_timeout)
            .json(call)
            .send()
            .await
            .map_err(|e| connection_error(&e))?;

        if !response.status().is_success() {
            return Err(upstream_error(Operation::OutboundCall, response).await);
        }

        response.json().await.map_err(|e| connection_error(&e))
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path, query_param},
    };

    use super::*;

    fn provider(server: &MockServer) -> ElevenLabsProvider {
        let config = ElevenLabsConfig {
            base_url: server.uri(),
            ..ElevenLabsConfig::default()
        };

        ElevenLabsProvider::new(&config, SecretString::from("xi-test")).unwrap()
    }

    fn request() -> SpeechRequest {
        SpeechRequest {
            text: "Hello caller".to_owned(),
            voice_id: "voice-1".to_owned(),
            output_format: "mp3_44100_128".to_owned(),
        }
    }

    #[tokio::test]
    async fn synthesize_sends_expected_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-1"))
            .and(query_param("output_format", "mp3_44100_128"))
            .and(header("xi-api-key", "xi-test"))
            .and(header("accept", "audio/mpeg"))
            .and(body_partial_json(serde_json::json!({
                "text": "Hello caller",
                "model_id": "eleven_monolingual_v1",
                "voice_settings": {"stability": 0.5, "similarity_boost": 0.75}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let audio = provider(&server).synthesize(&request()).await.unwrap();

        assert_eq!(audio, b"ID3audio");
    }

    #[tokio::test]
    async fn upstream_detail_is_kept() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "detail": {"status": "invalid_api_key", "message": "Invalid API key"}
            })))
            .mount(&server)
            .await;

        let error = provider(&server).synthesize(&request()).await.unwrap_err();

        let TtsError::Upstream { status, detail, .. } = error else {
            unreachable!("expected upstream error, got {error:?}");
        };

        assert_eq!(status, 401);
        assert_eq!(detail.unwrap()["status"], "invalid_api_key");
    }

    #[tokio::test]
    async fn voices_returns_upstream_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/voices"))
            .and(header("xi-api-key", "xi-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "voices": [{"voice_id": "voice-1", "name": "Rachel"}]
            })))
            .mount(&server)
            .await;

        let voices = provider(&server).voices().await.unwrap();

        assert_eq!(voices["voices"][0]["name"], "Rachel");
    }

    #[tokio::test]
    async fn outbound_call_posts_snake_case_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/convai/twilio/outbound-call"))
            .and(header("xi-api-key", "xi-test"))
            .and(body_partial_json(serde_json::json!({
                "agent_id": "agent-1",
                "agent_phone_number_id": "phone-1",
                "to_number": "+15551230000"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "conversation_id": "conv-1",
                "callSid": "CA123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let call = OutboundCall {
            agent_id: "agent-1".to_owned(),
            agent_phone_number_id: "phone-1".to_owned(),
            to_number: "+15551230000".to_owned(),
        };

        let answer = provider(&server).outbound_call(&call).await.unwrap();

        assert_eq!(answer["conversation_id"], "conv-1");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_connection_error() {
        let config = ElevenLabsConfig {
            base_url: "http://127.0.0.1:1".to_owned(),
            ..ElevenLabsConfig::default()
        };

        let error = ElevenLabsProvider::new(&config, SecretString::from("k"))
            .unwrap()
            .voices()
            .await
            .unwrap_err();

        assert!(matches!(error, TtsError::Connection(_)));
    }
}
