//! Axum session middleware layer.
//!
//! Resolves the request's session through the [`SessionManager`], makes the
//! [`SessionHandle`](super::SessionHandle) available via request extensions,
//! and appends any newly issued session cookie to the response unless the
//! handler already set the session cookie itself (e.g. logout).

use axum::extract::Request;
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::{SessionManager, SessionStore};

/// Axum middleware function for session handling.
pub async fn session_middleware<S: SessionStore + 'static>(
    manager: Arc<SessionManager<S>>,
    mut req: Request,
    next: Next,
) -> Response {
    let mut set_cookies = HeaderMap::new();
    let handle = match manager.resolve(req.headers(), &mut set_cookies).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(error = %e, "Session resolution failed");
            return e.into_response();
        }
    };

    req.extensions_mut().insert(handle);

    // Run the route handler
    let mut response = next.run(req).await;

    if sets_cookie(response.headers(), manager.cookie_name()) {
        return response;
    }

    for cookie in set_cookies.get_all(header::SET_COOKIE) {
        response
            .headers_mut()
            .append(header::SET_COOKIE, cookie.clone());
    }

    response
}

/// Whether `headers` already carry a Set-Cookie for `name`.
fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|c| c.strip_prefix(name).is_some_and(|rest| rest.starts_with('=')))
}
