//! crates/artblog_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered user, safe to hand to views. Never carries the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

/// A blog post. `author` holds the owner's username as a weak reference:
/// it is used for lookup and ownership checks only, never as a foreign key.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub author: String,
    pub image: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// A server-side browser session. `user_id` is `None` while anonymous;
/// anonymous sessions still exist so flash messages survive redirects.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Uuid,
    pub user_id: Option<Uuid>,
    pub flash: Option<Flash>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A one-shot message shown on the next rendered page, then cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}
