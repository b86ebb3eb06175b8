//! HTTP Digest (RFC 2617, MD5) and Basic authorization headers

use std::sync::OnceLock;

use base64::Engine as _;
use regex::Regex;

/// Parsed `WWW-Authenticate: Digest ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
}

pub(crate) fn param_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)=(?:"([^"]*)"|([^\s,]+))"#).expect("challenge pattern is valid"))
}

impl DigestChallenge {
    /// Parse a challenge header, returning `None` unless it is a Digest
    /// challenge carrying a nonce.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(char::is_whitespace)?;

        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut realm = None;
        let mut nonce = None;
        let mut qop = None;
        let mut opaque = None;

        for captures in param_regex().captures_iter(params) {
            let value = captures
                .get(2)
                .or_else(|| captures.get(3))
                .map(|m| m.as_str().to_owned())
                .unwrap_or_default();

            match captures[1].to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "qop" => qop = Some(select_qop(&value)),
                "opaque" => opaque = Some(value),
                _ => {}
            }
        }

        Some(Self {
            realm: realm.unwrap_or_default(),
            nonce: nonce.filter(|n| !n.is_empty())?,
            qop,
            opaque,
        })
    }

    /// Compute the digest response hash
    ///
    /// HA1 = MD5(user:realm:pass), HA2 = MD5(method:uri), and the response
    /// is MD5(HA1:nonce:00000001:cnonce:qop:HA2) with qop defaulting to
    /// `auth` when the challenge did not offer one.
    pub fn response(&self, username: &str, password: &str, method: &str, uri: &str, cnonce: &str) -> String {
        let ha1 = md5_hex(&format!("{username}:{}:{password}", self.realm));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let qop = self.qop.as_deref().unwrap_or("auth");

        md5_hex(&format!("{ha1}:{}:{NONCE_COUNT}:{cnonce}:{qop}:{ha2}", self.nonce))
    }

    /// Build the `Authorization` header value for this challenge
    pub fn authorization(&self, username: &str, password: &str, method: &str, uri: &str, cnonce: &str) -> String {
        let response = self.response(username, password, method, uri, cnonce);

        let mut header = format!(
            r#"Digest username="{username}", realm="{}", nonce="{}", uri="{uri}", response="{response}""#,
            self.realm, self.nonce
        );

        if let Some(qop) = &self.qop {
            header.push_str(&format!(r#", qop={qop}, nc={NONCE_COUNT}, cnonce="{cnonce}""#));
        }

        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }

        header
    }
}

const NONCE_COUNT: &str = "00000001";

/// Servers may offer several protection qualities; only `auth` is computed.
fn select_qop(offered: &str) -> String {
    let options: Vec<&str> = offered.split(',').map(str::trim).filter(|o| !o.is_empty()).collect();

    if options.contains(&"auth") {
        return "auth".to_owned();
    }

    options.first().copied().unwrap_or("auth").to_owned()
}

/// Random client nonce, hex encoded
pub fn generate_cnonce() -> String {
    let bytes: [u8; 16] = rand::random();
    md5_hex_bytes(&bytes)
}

/// `Basic base64(user:pass)` header value
pub fn basic_authorization(username: &str, password: &str) -> String {
    let credentials = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {credentials}")
}

fn md5_hex(input: &str) -> String {
    md5_hex_bytes(input.as_bytes())
}

fn md5_hex_bytes(input: &[u8]) -> String {
    format!("{:x}", md5::compute(input))
}
