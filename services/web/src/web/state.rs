//! services/web/src/web/state.rs
//!
//! Defines the application's shared state.

use std::convert::Infallible;
use std::sync::Arc;

use artblog_core::domain::User;
use artblog_core::ports::SessionStore;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::AuthService;
use crate::config::Config;
use crate::posts::PostService;

/// The shared application state, created once at startup and passed to all
/// handlers. Everything behind it is injected at construction; there is no
/// global lazily-initialized handle anywhere.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub posts: PostService,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<Config>,
}

/// The identity resolved for this request, stashed in request extensions by
/// the session middleware. Absent for anonymous visitors.
#[derive(Clone)]
pub struct CurrentUser(pub User);

/// Extractor form of the optional identity, for handlers that serve both
/// logged-in and anonymous visitors.
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<CurrentUser>().map(|c| c.0.clone()),
        ))
    }
}
