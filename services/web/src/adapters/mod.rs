//! services/web/src/adapters/mod.rs
//!
//! Concrete implementations of the core ports: the PostgreSQL store and the
//! Argon2 credential store.

pub mod db;
pub mod password;

pub use db::PgStore;
pub use password::Argon2Credentials;
