//! services/web/src/web/posts.rs
//!
//! Handlers for reading and mutating posts. Reads are open to everyone;
//! mutations sit behind the login guard, and the ownership check redirects
//! non-owners to the page they came from without revealing whether the post
//! existed.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::WebError;
use crate::posts::PostError;
use crate::web::session::{redirect_back, take_flash};
use crate::web::state::{AppState, CurrentUser, MaybeUser};
use crate::web::views;

#[derive(Deserialize)]
pub struct PostForm {
    pub image: String,
    pub title: String,
    pub content: String,
}

/// Store problems are the only post-service errors that reach the error
/// type; NotFound/Forbidden are handled per route.
fn fatal(e: PostError) -> WebError {
    match e {
        PostError::Store(p) => WebError::Port(p),
        other => WebError::Internal(other.to_string()),
    }
}

/// GET / - the post list, newest first.
pub async fn index(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let flash = take_flash(&state, &headers).await?;
    let posts = state.posts.list().await.map_err(fatal)?;
    Ok(views::index(user.as_ref(), flash.as_ref(), &posts).into_response())
}

/// GET /{id} - the post detail page, readable by anyone. A path segment
/// that is not a post id gets the 404 page, same as an unknown post.
pub async fn show(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Response, WebError> {
    let Ok(id) = Uuid::parse_str(&id) else {
        return Ok((StatusCode::NOT_FOUND, views::not_found()).into_response());
    };
    match state.posts.get(id).await {
        Ok(post) => Ok(views::post_detail(user.as_ref(), &post).into_response()),
        Err(PostError::NotFound) => {
            Ok((StatusCode::NOT_FOUND, views::not_found()).into_response())
        }
        Err(e) => Err(fatal(e)),
    }
}

/// GET /add - behind the login guard.
pub async fn add_form(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let flash = take_flash(&state, &headers).await?;
    Ok(views::add_post(Some(&user), flash.as_ref()).into_response())
}

/// POST /add
pub async fn add_submit(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Form(form): Form<PostForm>,
) -> Result<Response, WebError> {
    state
        .posts
        .create(&user, &form.image, &form.title, &form.content)
        .await
        .map_err(fatal)?;
    Ok(Redirect::to("/").into_response())
}

/// GET /{id}/edit - owner only. The login guard is inline here (rather than
/// router middleware) because `/{id}` also serves anonymous reads.
pub async fn edit_form(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login").into_response());
    };
    match state.posts.owned(&user, id).await {
        Ok(post) => Ok(views::edit_post(Some(&user), &post).into_response()),
        Err(PostError::NotFound | PostError::Forbidden) => {
            Ok(redirect_back(&headers).into_response())
        }
        Err(e) => Err(fatal(e)),
    }
}

/// PUT /{id} - owner only.
pub async fn update(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Form(form): Form<PostForm>,
) -> Result<Response, WebError> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login").into_response());
    };
    match state
        .posts
        .update(&user, id, &form.image, &form.title, &form.content)
        .await
    {
        Ok(()) => Ok(Redirect::to(&format!("/{}", id)).into_response()),
        Err(PostError::NotFound | PostError::Forbidden) => {
            Ok(redirect_back(&headers).into_response())
        }
        Err(e) => Err(fatal(e)),
    }
}

/// DELETE /{id} - owner only.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login").into_response());
    };
    match state.posts.delete(&user, id).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(PostError::NotFound | PostError::Forbidden) => {
            Ok(redirect_back(&headers).into_response())
        }
        Err(e) => Err(fatal(e)),
    }
}
