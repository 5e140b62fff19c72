//! services/web/src/web/auth.rs
//!
//! Handlers for user signup, login, and logout. Authentication failures
//! never surface as HTTP errors: they redirect back to the form with a
//! one-shot flash message, like the rest of the site's navigation.

use std::sync::Arc;

use artblog_core::domain::Flash;
use artblog_core::ports::PortError;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use crate::auth::AuthError;
use crate::error::WebError;
use crate::web::session::{
    ensure_session, redirect_with_cookie, set_flash, take_flash, token_from_headers,
};
use crate::web::state::{AppState, MaybeUser};
use crate::web::views;

#[derive(Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// GET /signup
pub async fn signup_form(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let flash = take_flash(&state, &headers).await?;
    Ok(views::signup(user.as_ref(), flash.as_ref()).into_response())
}

/// POST /signup - creates the user and logs them straight in.
pub async fn signup_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Result<Response, WebError> {
    let (token, cookie) = ensure_session(&state, &headers).await?;
    match state
        .auth
        .signup(token, &form.username, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            set_flash(
                &state,
                token,
                Flash::success(format!("Welcome {}!", user.username)),
            )
            .await?;
            redirect_with_cookie("/", cookie)
        }
        Err(AuthError::Crypto(e)) => Err(WebError::Crypto(e)),
        Err(AuthError::Store(e)) => Err(WebError::Port(e)),
        // AlreadyExists and Invalid go back to the form.
        Err(e) => {
            set_flash(&state, token, Flash::error(e.to_string())).await?;
            redirect_with_cookie("/signup", cookie)
        }
    }
}

/// GET /login
pub async fn login_form(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let flash = take_flash(&state, &headers).await?;
    Ok(views::login(user.as_ref(), flash.as_ref()).into_response())
}

/// POST /login
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let (token, cookie) = ensure_session(&state, &headers).await?;
    match state.auth.login(token, &form.username, &form.password).await {
        Ok(user) => {
            set_flash(
                &state,
                token,
                Flash::success(format!("Welcome back {}!", user.username)),
            )
            .await?;
            redirect_with_cookie("/", cookie)
        }
        Err(AuthError::Crypto(e)) => Err(WebError::Crypto(e)),
        Err(AuthError::Store(e)) => Err(WebError::Port(e)),
        // UserNotFound and BadPassword go back to the form.
        Err(e) => {
            set_flash(&state, token, Flash::error(e.to_string())).await?;
            redirect_with_cookie("/login", cookie)
        }
    }
}

/// GET /logout - idempotent; logging out without a session is a no-op.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    if let Some(token) = token_from_headers(&headers) {
        state.auth.logout(token).await?;
        let goodbye = Flash::success("Goodbye. See you next time!");
        match state.sessions.set_flash(token, goodbye).await {
            Ok(()) | Err(PortError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Redirect::to("/").into_response())
}
