//! The `refresh_token` cookie.

use axum::http::{header, HeaderMap, HeaderValue};

pub const REFRESH_COOKIE: &str = "refresh_token";

/// Value of the refresh cookie, if the request carries one.
pub fn read_refresh_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` for a fresh refresh token scoped to `path`.
pub fn refresh_cookie(token: &str, path: &str, max_age_secs: i64, secure: bool) -> HeaderValue {
    build(token, path, max_age_secs, secure)
}

/// `Set-Cookie` that makes the browser drop the refresh token.
pub fn clear_refresh_cookie(path: &str, secure: bool) -> HeaderValue {
    build("", path, 0, secure)
}

fn build(value: &str, path: &str, max_age_secs: i64, secure: bool) -> HeaderValue {
    let mut cookie = format!(
        "{REFRESH_COOKIE}={value}; Path={path}; Max-Age={max_age_secs}; HttpOnly; SameSite=Strict"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    // Tokens are UUIDs and paths are static, so the value is always valid ASCII.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; refresh_token=abc-123; lang=en"),
        );
        assert_eq!(read_refresh_token(&headers).as_deref(), Some("abc-123"));
    }

    #[test]
    fn missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(read_refresh_token(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("refresh_token="));
        assert_eq!(read_refresh_token(&headers), None);
    }

    #[test]
    fn cookie_attributes() {
        let value = refresh_cookie("tok", "/auth", 60, true);
        let text = value.to_str().unwrap();
        assert!(text.starts_with("refresh_token=tok; Path=/auth; Max-Age=60"));
        assert!(text.contains("HttpOnly"));
        assert!(text.ends_with("; Secure"));

        let cleared = clear_refresh_cookie("/auth", false);
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
        assert!(!cleared.to_str().unwrap().contains("Secure"));
    }
}
