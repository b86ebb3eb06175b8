mod harness;

use harness::{config::ConfigBuilder, server::TestServer};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

#[tokio::test]
async fn health_authenticates_and_queries_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pbxapi/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "opaque-token"})))
        .expect(1)
        .mount(&mock)
        .await;

    Mock::given(method("GET"))
        .and(path("/pbxapi/extensions"))
        .and(query_param("limit", "1"))
        .and(header("authorization", "Bearer opaque-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"extension": "100"}]})))
        .expect(2)
        .mount(&mock)
        .await;

    let config = ConfigBuilder::new(dir.path()).with_issabel(&mock.uri()).build();
    let server = TestServer::start(config).await.unwrap();

    for _ in 0..2 {
        let resp = server
            .client()
            .get(server.url("/api/issabel/health"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(body["details"]["authenticated"], true);
        assert_eq!(body["details"]["dataReceived"], true);
        assert_eq!(body["details"]["baseUrl"], mock.uri());
    }
}

#[tokio::test]
async fn rejected_credentials_are_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pbxapi/authenticate"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock)
        .await;

    let config = ConfigBuilder::new(dir.path()).with_issabel(&mock.uri()).build();
    let server = TestServer::start(config).await.unwrap();

    let resp = server
        .client()
        .get(server.url("/api/issabel/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 502);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unconfigured_issabel_is_misconfig() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(ConfigBuilder::new(dir.path()).build()).await.unwrap();

    let resp = server
        .client()
        .get(server.url("/api/issabel/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "MISCONFIG");
}
