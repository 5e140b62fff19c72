pub mod auth;
pub mod middleware;
pub mod posts;
pub mod session;
pub mod state;
pub mod views;

// Re-export the pieces the binary needs to build the router.
pub use middleware::{method_override, require_login, resolve_identity};
pub use state::{AppState, CurrentUser};
