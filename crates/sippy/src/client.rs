use std::time::Duration;

use callgate_config::SippyConfig;
use callgate_core::mask_url;
use reqwest::{
    StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{
    codec::{encode_method_call, parse_method_response},
    digest::{DigestChallenge, basic_authorization, generate_cnonce},
    error::{Result, RpcError},
    value::Value,
};

/// XML-RPC client for the Sippy billing API
///
/// Every call starts unauthenticated and answers the server's challenge,
/// either Digest or Basic. A rejected handshake is repeated once after
/// the configured backoff.
#[derive(Debug, Clone)]
pub struct SippyClient {
    http: reqwest::Client,
    url: Url,
    username: String,
    password: SecretString,
    retry_backoff: Duration,
}

struct RawResponse {
    status: StatusCode,
    challenge: Option<String>,
    body: String,
}

impl SippyClient {
    pub fn from_config(config: &SippyConfig) -> Result<Self> {
        let (Some(url), Some(username), Some(password)) = (config.url(), config.username(), config.password()) else {
            return Err(RpcError::Misconfig(
                "Missing Sippy configuration: url, username and password are required".to_owned(),
            ));
        };

        let url = Url::parse(url).map_err(|e| RpcError::Misconfig(format!("Invalid Sippy URL: {e}")))?;

        if config.tls_skip_verify {
            tracing::warn!(url = %mask_url(url.as_str()), "TLS certificate verification disabled for Sippy");
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.tls_skip_verify)
            .build()
            .map_err(|e| RpcError::Misconfig(format!("Failed to build Sippy HTTP client: {e}")))?;

        Ok(Self {
            http,
            url,
            username: username.to_owned(),
            password: password.clone(),
            retry_backoff: config.retry_backoff,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Invoke an XML-RPC method and decode its result
    pub async fn call(&self, method: &str, params: &[Value]) -> Result<Value> {
        let body = encode_method_call(method, params);

        tracing::debug!(method, url = %mask_url(self.url.as_str()), "calling sippy");

        let mut response = self.exchange(&body).await?;

        if matches!(response.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            tracing::warn!(
                method,
                status = response.status.as_u16(),
                backoff_ms = self.retry_backoff.as_millis(),
                "sippy rejected credentials, repeating handshake"
            );

            tokio::time::sleep(self.retry_backoff).await;
            response = self.exchange(&body).await?;
        }

        match response.status {
            StatusCode::OK => parse_method_response(&response.body),
            StatusCode::UNAUTHORIZED => Err(RpcError::Unauthorized {
                username: self.username.clone(),
            }),
            StatusCode::FORBIDDEN => Err(RpcError::Forbidden {
                username: self.username.clone(),
            }),
            StatusCode::NOT_FOUND => Err(RpcError::NotFound),
            status => Err(RpcError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_owned(),
                body: response.body,
            }),
        }
    }

    /// One handshake: an unauthenticated request, then an authorized one
    /// if the server issued a challenge we understand.
    async fn exchange(&self, body: &str) -> Result<RawResponse> {
        let first = self.send(body, None).await?;

        if first.status != StatusCode::UNAUTHORIZED {
            return Ok(first);
        }

        let Some(challenge) = first.challenge.as_deref() else {
            tracing::debug!("sippy returned 401 without a challenge");
            return Ok(first);
        };

        let password = self.password.expose_secret();

        let authorization = if let Some(digest) = DigestChallenge::parse(challenge) {
            digest.authorization(&self.username, password, "POST", self.url.path(), &generate_cnonce())
        } else if challenge.trim_start().to_ascii_lowercase().starts_with("basic") {
            basic_authorization(&self.username, password)
        } else {
            tracing::debug!(challenge, "unsupported authentication challenge from sippy");
            return Ok(first);
        };

        self.send(body, Some(authorization)).await
    }

    async fn send(&self, body: &str, authorization: Option<String>) -> Result<RawResponse> {
        let mut request = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "text/xml")
            .header(ACCEPT, "text/xml")
            .body(body.to_owned());

        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let response = request.send().await.map_err(|e| RpcError::from_transport(&e))?;

        let status = response.status();
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = response.text().await.map_err(|e| RpcError::from_transport(&e))?;

        Ok(RawResponse { status, challenge, body })
    }
}
