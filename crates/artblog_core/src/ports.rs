//! crates/artblog_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like the
//! database or the password hashing primitive.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Flash, Post, Session, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all persistence port operations.
/// This abstracts away the specific errors of the backing store.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The requested record does not exist.
    #[error("Item not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the insert.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The backing store could not be reached in time. Fatal to the request.
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),

    /// Anything else the store reported.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Error from the password hashing primitive. Treated as fatal to the
/// current request, never as an authentication failure.
#[derive(Debug, thiserror::Error)]
#[error("Password hashing failed: {0}")]
pub struct CryptoError(pub String);

//=========================================================================================
// Persistence Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user. Uniqueness of `username` and `email` must be
    /// enforced by the store itself in the same operation as the insert,
    /// so two concurrent signups for the same name cannot both succeed.
    /// A violated constraint surfaces as `PortError::Duplicate`.
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> PortResult<User>;

    /// Login-time lookup. Returns the credential view including the hash.
    async fn find_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    /// Session-rehydration lookup, keyed by the store-assigned id.
    async fn find_by_id(&self, id: Uuid) -> PortResult<User>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert(
        &self,
        author: &str,
        image: &str,
        title: &str,
        content: &str,
    ) -> PortResult<Post>;

    async fn find(&self, id: Uuid) -> PortResult<Post>;

    /// All posts, newest first by creation time.
    async fn list_newest_first(&self) -> PortResult<Vec<Post>>;

    /// Replaces image/title/content and stamps `edited_at`.
    /// The author column is never touched. `NotFound` if no row matched.
    async fn update(
        &self,
        id: Uuid,
        image: &str,
        title: &str,
        content: &str,
        edited_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// `NotFound` if no row matched.
    async fn delete(&self, id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a fresh anonymous session with a new random token.
    async fn create(&self) -> PortResult<Session>;

    /// `NotFound` for unknown tokens and for expired sessions alike.
    async fn find(&self, token: Uuid) -> PortResult<Session>;

    /// Binds (`Some`) or unbinds (`None`) the session's identity.
    async fn set_user(&self, token: Uuid, user_id: Option<Uuid>) -> PortResult<()>;

    async fn set_flash(&self, token: Uuid, flash: Flash) -> PortResult<()>;

    /// Reads and clears the flash in a single statement, so a message is
    /// rendered at most once.
    async fn take_flash(&self, token: Uuid) -> PortResult<Option<Flash>>;

    async fn delete(&self, token: Uuid) -> PortResult<()>;
}

//=========================================================================================
// Credential Port
//=========================================================================================

/// One-way password transform. Implementations hold only algorithm
/// parameters, no mutable state, and must tolerate concurrent calls.
pub trait CredentialStore: Send + Sync {
    /// Salted one-way hash of `plaintext`, in a self-describing format
    /// that `verify` can parse back.
    fn hash(&self, plaintext: &str) -> Result<String, CryptoError>;

    /// Returns false on mismatch and on a malformed `hash`; never errors.
    fn verify(&self, plaintext: &str, hash: &str) -> bool;
}
