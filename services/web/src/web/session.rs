//! services/web/src/web/session.rs
//!
//! Cookie plumbing for the server-side session: extracting the token from
//! request headers, minting the Set-Cookie header, and the flash helpers
//! shared by the handlers.

use std::sync::Arc;

use artblog_core::domain::Flash;
use artblog_core::ports::PortError;
use axum::http::header::{HeaderMap, HeaderValue, COOKIE, REFERER, SET_COOKIE};
use axum::response::{IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::error::WebError;
use crate::web::state::AppState;

const SESSION_COOKIE: &str = "session";

/// Pulls the session token out of the Cookie header, if any. A token that
/// is not a UUID is treated as absent.
pub fn token_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    let cookie_header = headers.get(COOKIE)?.to_str().ok()?;
    let raw = cookie_header.split(';').find_map(|c| {
        let c = c.trim();
        c.strip_prefix("session=")
    })?;
    Uuid::parse_str(raw).ok()
}

/// Returns the token of a live session, creating one when the request has
/// no cookie or the cookie points at an expired/unknown row. The second
/// element is the Set-Cookie header to attach when a session was created.
pub async fn ensure_session(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<(Uuid, Option<String>), WebError> {
    if let Some(token) = token_from_headers(headers) {
        match state.sessions.find(token).await {
            Ok(session) => return Ok((session.token, None)),
            Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let session = state.sessions.create().await?;
    let max_age = state.config.session_ttl_days * 24 * 60 * 60;
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, session.token, max_age
    );
    Ok((session.token, Some(cookie)))
}

/// Stores a one-shot message on the session for the next rendered page.
pub async fn set_flash(state: &Arc<AppState>, token: Uuid, flash: Flash) -> Result<(), WebError> {
    state.sessions.set_flash(token, flash).await?;
    Ok(())
}

/// Reads and clears the pending flash, if the request carries a session.
pub async fn take_flash(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<Option<Flash>, WebError> {
    let Some(token) = token_from_headers(headers) else {
        return Ok(None);
    };
    match state.sessions.take_flash(token).await {
        Ok(flash) => Ok(flash),
        Err(PortError::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A redirect that also sets the session cookie when one was just minted.
pub fn redirect_with_cookie(
    location: &str,
    cookie: Option<String>,
) -> Result<Response, WebError> {
    let mut response = Redirect::to(location).into_response();
    if let Some(cookie) = cookie {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| WebError::Internal(format!("invalid cookie header: {}", e)))?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(response)
}

/// Redirect to the referring page, falling back to the index. Used when an
/// ownership guard turns a request away.
pub fn redirect_back(headers: &HeaderMap) -> Redirect {
    let target = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("/");
    Redirect::to(target)
}
