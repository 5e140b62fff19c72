//! services/web/src/error.rs
//!
//! Defines the primary error type for the entire web service.

use artblog_core::ports::{CryptoError, PortError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `web` service.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a failure of the password hashing primitive.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running the startup migrations.
    #[error("Migration Error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Persistence and crypto failures are fatal to the current request, never
/// to the process: they log and answer 500.
impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!("request failed: {:?}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong on our side. Please try again.",
        )
            .into_response()
    }
}
