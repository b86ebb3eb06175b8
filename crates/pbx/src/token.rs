use std::time::Duration;

use base64::Engine as _;
use jiff::Timestamp;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{PbxError, Result};

/// Tokens are refreshed once fewer than this many milliseconds remain
const REFRESH_BUFFER_MS: i64 = 5 * 60 * 1000;
/// Lifetime assumed when the token carries no `exp` claim
const DEFAULT_LIFETIME_MS: i64 = 60 * 60 * 1000;
/// Lifetime assumed when the token payload cannot be decoded
const UNDECODABLE_LIFETIME_MS: i64 = 30 * 60 * 1000;

#[derive(Debug, Clone)]
struct CachedToken {
    token: SecretString,
    expires_at_ms: i64,
}

impl CachedToken {
    const fn is_fresh(&self, now_ms: i64) -> bool {
        self.expires_at_ms - now_ms > REFRESH_BUFFER_MS
    }
}

#[derive(Deserialize)]
struct AuthenticateResponse {
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<f64>,
}

/// Expiry of a JWT in unix milliseconds
///
/// The signature is not verified; only the `exp` claim is read.
#[allow(clippy::cast_possible_truncation)]
fn expiry_ms(token: &str, now_ms: i64) -> i64 {
    let claims = token.split('.').nth(1).and_then(|payload| {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice::<Claims>(&bytes).ok()
    });

    match claims {
        Some(Claims { exp: Some(exp) }) => (exp * 1000.0) as i64,
        Some(Claims { exp: None }) => now_ms + DEFAULT_LIFETIME_MS,
        None => now_ms + UNDECODABLE_LIFETIME_MS,
    }
}

fn now_ms() -> i64 {
    Timestamp::now().as_millisecond()
}

/// Bearer token cache for the Issabel `pbxapi`
///
/// Refreshes are serialized: concurrent callers wait for a single
/// authenticate call.
pub struct TokenProvider {
    http: Client,
    base_url: String,
    username: String,
    password: SecretString,
    timeout: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: Client, base_url: String, username: String, password: SecretString, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
            timeout,
            cached: Mutex::new(None),
        }
    }

    /// Current token, authenticating when none is cached or it is near expiry
    pub async fn token(&self) -> Result<SecretString> {
        let mut cached = self.cached.lock().await;
        let now = now_ms();

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }

        let token = self.authenticate().await?;
        let expires_at_ms = expiry_ms(&token, now);

        tracing::debug!(expires_in_s = (expires_at_ms - now) / 1000, "issabel token refreshed");

        let token = SecretString::from(token);
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at_ms,
        });

        Ok(token)
    }

    /// Drop the cached token so the next call re-authenticates
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn authenticate(&self) -> Result<String> {
        let url = format!("{}/pbxapi/authenticate", self.base_url);

        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .form(&[
                ("user", self.username.as_str()),
                ("password", self.password.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| PbxError::from_transport(&e))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(PbxError::Unauthorized),
            StatusCode::NOT_FOUND => return Err(PbxError::NotFound(url)),
            status => {
                return Err(PbxError::Http {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
        }

        let body: AuthenticateResponse = response.json().await.map_err(|_| PbxError::NoToken)?;

        body.access_token.filter(|t| !t.is_empty()).ok_or(PbxError::NoToken)
    }
}
