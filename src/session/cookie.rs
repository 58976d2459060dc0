//! Session cookie encoding and rendering.
//!
//! The cookie's only payload is the percent-escaped session ID; all other
//! attributes come from [`CookieSettings`].

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

use crate::config::CookieSettings;
use crate::error::SessionError;

/// Percent-escape a session ID for use as a cookie value.
pub fn escape_session_id(session_id: &str) -> String {
    urlencoding::encode(session_id).into_owned()
}

/// Reverse [`escape_session_id`].
///
/// Malformed escapes (`%` not followed by two hex digits) and non-UTF-8
/// results are rejected rather than passed through. `+` is kept literally,
/// not read as a space.
pub fn unescape_session_id(value: &str) -> Result<String, SessionError> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(SessionError::Decode(format!("invalid escape in {value:?}")));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    urlencoding::decode(value)
        .map(|id| id.into_owned())
        .map_err(|e| SessionError::Decode(e.to_string()))
}

/// Find a cookie's raw value in the request's `Cookie` headers.
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| parse_cookie(h, name))
}

/// Parse a specific cookie from a Cookie header value.
fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some(value) = trimmed.strip_prefix(name)
            && let Some(value) = value.strip_prefix('=')
        {
            return Some(value);
        }
    }
    None
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn render(
    settings: &CookieSettings,
    value: &str,
    max_age_secs: i64,
    expires: DateTime<Utc>,
) -> String {
    let mut parts = vec![
        format!("{}={}", settings.name, value),
        format!("Path={}", settings.path),
    ];
    if let Some(domain) = &settings.domain {
        parts.push(format!("Domain={domain}"));
    }
    parts.push(format!("Max-Age={max_age_secs}"));
    parts.push(format!("Expires={}", http_date(expires)));
    if settings.http_only {
        parts.push("HttpOnly".into());
    }
    if settings.secure {
        parts.push("Secure".into());
    }
    parts.push(format!("SameSite={}", settings.same_site));
    parts.join("; ")
}

/// Set-Cookie value binding `session_id` to the client for `max_age`.
pub fn make_set_cookie(settings: &CookieSettings, session_id: &str, max_age: Duration) -> String {
    let secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    let expires = ChronoDuration::try_seconds(secs)
        .and_then(|d| Utc::now().checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    render(settings, &escape_session_id(session_id), secs, expires)
}

/// Set-Cookie value that makes the client drop its session cookie.
pub fn make_expired_cookie(settings: &CookieSettings) -> String {
    let year_ago = Utc::now() - ChronoDuration::days(365);
    render(settings, "", -1, year_ago)
}

/// Append a Set-Cookie header.
pub(crate) fn append_set_cookie(sink: &mut HeaderMap, cookie: String) -> Result<(), SessionError> {
    let value = HeaderValue::try_from(cookie)
        .map_err(|e| SessionError::Internal(format!("invalid Set-Cookie header: {e}")))?;
    sink.append(header::SET_COOKIE, value);
    Ok(())
}
