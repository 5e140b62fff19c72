//! services/web/src/web/middleware.rs
//!
//! Request middleware: session resolution, the login guard, and the
//! method-override shim for HTML forms.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::web::session::token_from_headers;
use crate::web::state::{AppState, CurrentUser};

/// Resolves the current identity once per inbound request and stashes it in
/// request extensions. Anonymous requests simply carry no `CurrentUser`;
/// only infrastructure failures produce an error response.
pub async fn resolve_identity(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = token_from_headers(req.headers());
    match state.auth.resolve(token).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser(user));
        }
        Ok(None) => {}
        Err(e) => return crate::error::WebError::from(e).into_response(),
    }
    next.run(req).await
}

/// The "must be authenticated" guard: anonymous requests are redirected to
/// the login page. Runs after `resolve_identity`.
pub async fn require_login(req: Request, next: Next) -> Response {
    if req.extensions().get::<CurrentUser>().is_none() {
        return Redirect::to("/login").into_response();
    }
    next.run(req).await
}

/// HTML forms can only submit GET and POST, so edit/delete forms post to
/// `/{id}?_method=PUT` (or `DELETE`) and this pre-routing shim rewrites the
/// method, like Express's method-override. Must be layered around the whole
/// router so it runs before route matching.
pub async fn method_override(mut req: Request, next: Next) -> Response {
    if req.method() == Method::POST {
        let target = req.uri().query().and_then(|query| {
            query.split('&').find_map(|pair| match pair {
                "_method=PUT" | "_method=put" => Some(Method::PUT),
                "_method=DELETE" | "_method=delete" => Some(Method::DELETE),
                _ => None,
            })
        });
        if let Some(method) = target {
            *req.method_mut() = method;
        }
    }
    next.run(req).await
}
