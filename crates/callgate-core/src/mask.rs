/// Mask a credential for display, keeping the first and last two chars
///
/// Values of four characters or fewer are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();

    if chars.len() <= 4 {
        return "***".to_owned();
    }

    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();

    format!("{head}***{tail}")
}

/// Strip userinfo from a URL for display
pub fn mask_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return "invalid-url".to_owned();
    };

    // Only fails for cannot-be-a-base URLs, which carry no userinfo anyway
    let _ = url.set_username("");
    let _ = url.set_password(None);

    url.to_string()
}
