/// Request gate
///
/// Reads the designated token header and validates the access token in it.
/// The actix middleware in `crate::middleware` wraps this.

use actix_web::http::header::HeaderMap;

use crate::auth::claims::Identity;
use crate::auth::jwt::validate_access_token;
use crate::configuration::AuthConfig;
use crate::error::{AuthError, TokenError};

/// Resolve the caller's identity from request headers at instant `now`.
///
/// Claims are all-or-nothing: the identity is returned only when the token
/// validated completely.
pub fn authenticate(
    headers: &HeaderMap,
    config: &AuthConfig,
    now: i64,
) -> Result<Identity, AuthError> {
    let raw = match headers.get(config.token_header()) {
        Some(value) => value.to_str().map_err(|_| {
            AuthError::InvalidCredential(TokenError::Malformed(
                "token header is not valid text".to_string(),
            ))
        })?,
        None => return Err(AuthError::MissingCredential),
    };

    let token = raw.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    validate_access_token(config.keys(), token, now)
        .map(|claims| claims.identity)
        .map_err(AuthError::InvalidCredential)
}
