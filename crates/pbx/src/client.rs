use callgate_config::IssabelConfig;
use callgate_core::mask_url;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;

use crate::{
    error::{PbxError, Result},
    token::TokenProvider,
};

/// Bearer-authenticated client for the Issabel `pbxapi`
pub struct PbxClient {
    http: Client,
    base_url: String,
    username: String,
    tokens: TokenProvider,
}

impl PbxClient {
    pub fn from_config(config: &IssabelConfig) -> Result<Self> {
        let (Some(base_url), Some(username), Some(password)) = (config.base_url(), config.username(), config.password())
        else {
            return Err(PbxError::Misconfig("Issabel configuration missing".to_owned()));
        };

        if config.tls_skip_verify {
            tracing::warn!(url = %mask_url(base_url), "TLS certificate verification disabled for Issabel");
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.tls_skip_verify)
            .build()
            .map_err(|e| PbxError::Misconfig(format!("Failed to build Issabel HTTP client: {e}")))?;

        let base_url = base_url.trim_end_matches('/').to_owned();

        let tokens = TokenProvider::new(
            http.clone(),
            base_url.clone(),
            username.to_owned(),
            password.clone(),
            config.timeout,
        );

        Ok(Self {
            http,
            base_url,
            username: username.to_owned(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub const fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// `GET {base}{path}` with the bearer token
    ///
    /// A 401 drops the cached token and retries once with a fresh one.
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value> {
        let response = self.send(path, query).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(path, "issabel rejected token, re-authenticating");

            self.tokens.invalidate().await;
            self.send(path, query).await?
        } else {
            response
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| PbxError::from_transport(&e))?;

        match status {
            status if status.is_success() => {
                Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
            }
            StatusCode::UNAUTHORIZED => Err(PbxError::Unauthorized),
            StatusCode::NOT_FOUND => Err(PbxError::NotFound(path.to_owned())),
            status => Err(PbxError::Http {
                status: status.as_u16(),
                body,
            }),
        }
    }

    async fn send(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let token = self.tokens.token().await?;

        self.http
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| PbxError::from_transport(&e))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use secrecy::SecretString;
    use wiremock::{
        Mock, MockServer, Request, Respond, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    use super::*;

    fn config(server: &MockServer) -> IssabelConfig {
        IssabelConfig {
            base_url: Some(format!("{}/", server.uri())),
            username: Some("admin".to_owned()),
            password: Some(SecretString::from("secret")),
            ..IssabelConfig::default()
        }
    }

    /// Rejects the first request, accepts the rest
    struct RejectOnce {
        calls: AtomicUsize,
    }

    impl Respond for RejectOnce {
        fn respond(&self, _request: &Request) -> ResponseTemplate {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(401)
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": [{"extension": "100"}]}))
            }
        }
    }

    #[tokio::test]
    async fn unauthorized_is_retried_with_fresh_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pbxapi/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "opaque"})))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/pbxapi/extensions"))
            .and(query_param("limit", "1"))
            .and(header("authorization", "Bearer opaque"))
            .respond_with(RejectOnce {
                calls: AtomicUsize::new(0),
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = PbxClient::from_config(&config(&server)).unwrap();
        let data = client.get("/pbxapi/extensions", &[("limit", "1")]).await.unwrap();

        assert_eq!(data["results"][0]["extension"], "100");
    }

    #[tokio::test]
    async fn persistent_unauthorized_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pbxapi/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "opaque"})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let client = PbxClient::from_config(&config(&server)).unwrap();

        assert!(matches!(
            client.get("/pbxapi/extensions", &[]).await,
            Err(PbxError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn stalled_upstream_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pbxapi/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "opaque"})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/pbxapi/extensions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"results": []}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = IssabelConfig {
            timeout: Duration::from_millis(200),
            ..config(&server)
        };

        let client = PbxClient::from_config(&config).unwrap();
        let started = std::time::Instant::now();

        let result = client.get("/pbxapi/extensions", &[("limit", "1")]).await;

        assert!(matches!(result, Err(PbxError::Timeout(_))), "{result:?}");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn missing_settings_are_misconfig() {
        let config = IssabelConfig {
            base_url: Some("https://pbx.example.com".to_owned()),
            ..IssabelConfig::default()
        };

        assert!(matches!(PbxClient::from_config(&config), Err(PbxError::Misconfig(_))));
    }
}
