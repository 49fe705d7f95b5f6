//! Refresh token cookie handling.

use axum::http::header;

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "jwt";

/// Cookie lifetime in seconds (1 day). Outlives the token it carries.
pub const REFRESH_COOKIE_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|part| part.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that stores a refresh token.
pub fn refresh_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={}",
        REFRESH_COOKIE_NAME, token, REFRESH_COOKIE_MAX_AGE_SECS
    )
}

/// `Set-Cookie` value that clears the refresh token, with the same attributes it was set with.
pub fn clear_refresh_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0",
        REFRESH_COOKIE_NAME
    )
}
