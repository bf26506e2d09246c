mod auth;
mod health_check;
mod users;

pub use auth::{current_identity, login, refresh, register};
pub use health_check::health_check;
pub use users::{get_user, UserResponse};
