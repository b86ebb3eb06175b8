mod harness;

use harness::{config::ConfigBuilder, server::TestServer};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path},
};

async fn elevenlabs() -> MockServer {
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3-fake-mp3".to_vec()))
        .mount(&mock)
        .await;

    mock
}

#[tokio::test]
async fn generate_caches_and_serves_audio() {
    let dir = tempfile::tempdir().unwrap();
    let mock = elevenlabs().await;
    let config = ConfigBuilder::new(dir.path()).with_elevenlabs(&mock.uri()).build();

    let server = TestServer::start(config).await.unwrap();

    let request = json!({"text": "Your call is important", "voiceId": "voice-1", "meta": {"campaign": 7}});

    let first: serde_json::Value = server
        .client()
        .post(server.url("/api/elevenlabs/generate"))
        .json(&request)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(first["ok"], true);
    assert_eq!(first["code"], "OK");
    assert_eq!(first["cached"], false);
    assert_eq!(first["format"], "mp3");
    assert_eq!(first["voiceId"], "voice-1");
    assert_eq!(first["meta"], json!({"campaign": 7}));

    let audio_id = first["audioId"].as_str().unwrap().to_owned();
    assert_eq!(first["audioUrl"], format!("/api/tts/{audio_id}"));

    let second: serde_json::Value = server
        .client()
        .post(server.url("/api/elevenlabs/generate"))
        .json(&request)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(second["cached"], true);
    assert_eq!(second["audioId"], audio_id.as_str());

    let received = mock.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);

    let resp = server
        .client()
        .get(server.url(&format!("/api/tts/{audio_id}")))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "audio/mpeg");
    assert_eq!(resp.headers()["cache-control"], "public, max-age=86400");
    assert_eq!(
        resp.headers()["content-disposition"],
        format!("inline; filename=\"{audio_id}\"").as_str()
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"ID3-fake-mp3");
}

#[tokio::test]
async fn generate_without_meta_echoes_empty_object() {
    let dir = tempfile::tempdir().unwrap();
    let mock = elevenlabs().await;
    let config = ConfigBuilder::new(dir.path()).with_elevenlabs(&mock.uri()).build();

    let server = TestServer::start(config).await.unwrap();

    let body: serde_json::Value = server
        .client()
        .post(server.url("/api/elevenlabs/generate"))
        .json(&json!({"text": "hi", "voiceId": "voice-1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["meta"], json!({}));
}

#[tokio::test]
async fn generate_rejects_long_text_locally() {
    let dir = tempfile::tempdir().unwrap();
    let mock = elevenlabs().await;
    let config = ConfigBuilder::new(dir.path()).with_elevenlabs(&mock.uri()).build();

    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/api/elevenlabs/generate"))
        .json(&json!({"text": "a".repeat(5001), "voiceId": "voice-1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
    assert!(mock.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn generate_without_api_key_is_misconfig() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(ConfigBuilder::new(dir.path()).build()).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/api/elevenlabs/generate"))
        .json(&json!({"text": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "MISCONFIG");
}

#[tokio::test]
async fn upstream_rejection_is_mirrored() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "bad key"})))
        .mount(&mock)
        .await;

    let config = ConfigBuilder::new(dir.path()).with_elevenlabs(&mock.uri()).build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/api/elevenlabs/tts"))
        .json(&json!({"text": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["message"], "Invalid ElevenLabs API key");
    assert_eq!(body["details"], "bad key");
}

#[tokio::test]
async fn inline_tts_returns_base64() {
    let dir = tempfile::tempdir().unwrap();
    let mock = elevenlabs().await;
    let config = ConfigBuilder::new(dir.path()).with_elevenlabs(&mock.uri()).build();

    let server = TestServer::start(config).await.unwrap();

    let body: serde_json::Value = server
        .client()
        .post(server.url("/api/elevenlabs/tts"))
        .json(&json!({"text": "hello", "voice_id": "voice-1", "output_format": "mp3_22050_32"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["ok"], true);
    // base64("ID3-fake-mp3")
    assert_eq!(body["data"]["audio"], "SUQzLWZha2UtbXAz");
    assert_eq!(body["data"]["format"], "mp3_22050_32");
    assert_eq!(body["data"]["voice_id"], "voice-1");
    assert_eq!(body["data"]["text_length"], 5);
}

#[tokio::test]
async fn voices_are_cached() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"voices": [{"voice_id": "voice-1"}]})))
        .expect(1)
        .mount(&mock)
        .await;

    let config = ConfigBuilder::new(dir.path()).with_elevenlabs(&mock.uri()).build();
    let server = TestServer::start(config).await.unwrap();

    for _ in 0..2 {
        let body: serde_json::Value = server
            .client()
            .get(server.url("/api/elevenlabs/voices"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["data"]["voices"][0]["voice_id"], "voice-1");
    }
}

#[tokio::test]
async fn unknown_audio_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(ConfigBuilder::new(dir.path()).build()).await.unwrap();

    let resp = server
        .client()
        .get(server.url("/api/tts/does-not-exist"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], "Audio file not found");
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mock = elevenlabs().await;
    let config = ConfigBuilder::new(dir.path()).with_elevenlabs(&mock.uri()).build();

    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .client()
        .post(server.url("/api/elevenlabs/generate"))
        .header("content-type", "text/plain")
        .body("text=hi")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 415);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn outbound_call_validates_then_dials() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/convai/twilio/outbound-call"))
        .and(body_partial_json(json!({"agent_id": "agent-1", "to_number": "+15551230000"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "conversation_id": "conv-9",
            "callSid": "CA9"
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let config = ConfigBuilder::new(dir.path()).with_elevenlabs(&mock.uri()).build();
    let server = TestServer::start(config).await.unwrap();

    let missing = server
        .client()
        .post(server.url("/api/elevenlabs/outbound-call"))
        .json(&json!({"agentId": "agent-1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(missing.status(), 400);
    let body: serde_json::Value = missing.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["details"]["required"], json!(["agentId", "agentPhoneNumberId", "toNumber"]));

    let started: serde_json::Value = server
        .client()
        .post(server.url("/api/elevenlabs/outbound-call"))
        .json(&json!({"agentId": "agent-1", "agentPhoneNumberId": "phone-1", "toNumber": "+15551230000"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(started["ok"], true);
    assert_eq!(started["message"], "Outbound call initiated successfully");
    assert_eq!(started["data"], json!({"conversationId": "conv-9", "callSid": "CA9", "status": "initiated"}));
}
