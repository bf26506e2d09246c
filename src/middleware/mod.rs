/// Middleware module
///
/// Request gate for token-authenticated routes.

mod auth_guard;

pub use auth_guard::AuthGuard;
