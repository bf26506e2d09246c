/// Authentication module
///
/// Password hashing, token claims, token issuance/validation, the request
/// gate, role/ownership checks, and recording issued tokens.

mod authorization;
mod claims;
mod guard;
mod jwt;
mod password;
mod session;

pub use authorization::{require_role, require_self_or_role};
pub use claims::{AccessClaims, Expiring, Identity, RefreshClaims, Role};
pub use guard::authenticate;
pub use jwt::{
    issue_tokens, validate_access_token, validate_refresh_token, validate_token, JwtKeys,
    TokenPair, ACCESS_TOKEN_TTL_HOURS, REFRESH_TOKEN_TTL_HOURS,
};
pub use password::{PasswordHasher, DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST};
pub use session::record_issued_tokens;
