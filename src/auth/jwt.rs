/// JWT Token Issuance and Validation
///
/// Both directions share one HS256 secret held by [`JwtKeys`], which is built
/// once at startup and passed by reference. Issuance and validation take the
/// clock as an argument so they stay pure functions of their inputs.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::claims::{AccessClaims, Expiring, Identity, RefreshClaims};
use crate::error::{AppError, ConfigError, TokenError};

/// Access tokens live for 24 hours
pub const ACCESS_TOKEN_TTL_HOURS: i64 = 24;
/// Refresh tokens live for 168 hours (7 days)
pub const REFRESH_TOKEN_TTL_HOURS: i64 = 168;

/// Signing and verification keys derived from the shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys").finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// # Errors
    /// Returns `ConfigError::MissingRequired` when the secret is empty.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        if secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("auth.secret".to_string()));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Sign an access token and a refresh token for `identity`.
///
/// # Errors
/// Signing only fails on a key fault, reported as `AppError::Internal`.
pub fn issue_tokens(
    keys: &JwtKeys,
    identity: &Identity,
    now: DateTime<Utc>,
) -> Result<TokenPair, AppError> {
    let access_claims = AccessClaims {
        identity: identity.clone(),
        exp: (now + Duration::hours(ACCESS_TOKEN_TTL_HOURS)).timestamp(),
    };
    let refresh_claims = RefreshClaims {
        user_id: identity.user_id.clone(),
        exp: (now + Duration::hours(REFRESH_TOKEN_TTL_HOURS)).timestamp(),
    };

    let pair = TokenPair {
        access_token: sign(keys, &access_claims)?,
        refresh_token: sign(keys, &refresh_claims)?,
    };

    tracing::debug!(
        user_id = %identity.user_id,
        access_exp = access_claims.exp,
        refresh_exp = refresh_claims.exp,
        "Issued token pair"
    );

    Ok(pair)
}

fn sign<T: Serialize>(keys: &JwtKeys, claims: &T) -> Result<String, AppError> {
    encode(&Header::new(Algorithm::HS256), claims, &keys.encoding)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token at instant `now` (Unix seconds).
pub fn validate_access_token(
    keys: &JwtKeys,
    token: &str,
    now: i64,
) -> Result<AccessClaims, TokenError> {
    validate_token(keys, token, now)
}

/// Validate a refresh token at instant `now` (Unix seconds).
pub fn validate_refresh_token(
    keys: &JwtKeys,
    token: &str,
    now: i64,
) -> Result<RefreshClaims, TokenError> {
    validate_token(keys, token, now)
}

/// Parse, verify signature, decode claims, then check expiry.
///
/// jsonwebtoken covers the first three steps; its own expiry check is
/// switched off so the boundary (`exp <= now` is expired, no leeway) and the
/// clock are ours.
pub fn validate_token<T>(keys: &JwtKeys, token: &str, now: i64) -> Result<T, TokenError>
where
    T: DeserializeOwned + Expiring,
{
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let claims = decode::<T>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(e.to_string()),
        })?;

    if claims.is_expired_at(now) {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Role;
    use chrono::TimeZone;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn keys() -> JwtKeys {
        JwtKeys::new(SECRET).expect("Failed to build keys")
    }

    fn identity() -> Identity {
        Identity {
            email_address: "a@x.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            user_type: Role::User,
            user_id: "u1".to_string(),
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        assert!(matches!(
            JwtKeys::new(""),
            Err(ConfigError::MissingRequired(_))
        ));
        assert!(JwtKeys::new("   ").is_err());
    }

    #[test]
    fn test_round_trip_yields_identity() {
        let keys = keys();
        let now = Utc::now();
        let pair = issue_tokens(&keys, &identity(), now).expect("Failed to issue tokens");

        let claims = validate_access_token(&keys, &pair.access_token, now.timestamp())
            .expect("Failed to validate token");

        assert_eq!(claims.identity, identity());
    }

    #[test]
    fn test_expiry_offsets() {
        let keys = keys();
        let now = fixed_now();
        let pair = issue_tokens(&keys, &identity(), now).unwrap();

        let access = validate_access_token(&keys, &pair.access_token, now.timestamp()).unwrap();
        let refresh = validate_refresh_token(&keys, &pair.refresh_token, now.timestamp()).unwrap();

        assert_eq!(access.exp - now.timestamp(), 24 * 3600);
        assert_eq!(refresh.exp - now.timestamp(), 168 * 3600);
    }

    #[test]
    fn test_expiry_boundary() {
        let keys = keys();
        let now = fixed_now();
        let pair = issue_tokens(&keys, &identity(), now).unwrap();
        let exp = now.timestamp() + ACCESS_TOKEN_TTL_HOURS * 3600;

        assert!(validate_access_token(&keys, &pair.access_token, exp - 1).is_ok());
        assert_eq!(
            validate_access_token(&keys, &pair.access_token, exp),
            Err(TokenError::Expired)
        );
        assert_eq!(
            validate_access_token(&keys, &pair.access_token, exp + 1),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_refresh_token_names_its_subject() {
        let keys = keys();
        let now = fixed_now();
        let pair = issue_tokens(&keys, &identity(), now).unwrap();

        let refresh = validate_refresh_token(&keys, &pair.refresh_token, now.timestamp()).unwrap();
        assert_eq!(refresh.user_id, "u1");
    }

    #[test]
    fn test_same_instant_refresh_tokens_differ_per_user() {
        let keys = keys();
        let now = fixed_now();
        let mut other = identity();
        other.user_id = "u2".to_string();

        let first = issue_tokens(&keys, &identity(), now).unwrap();
        let second = issue_tokens(&keys, &other, now).unwrap();

        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_refresh_outlives_access() {
        let keys = keys();
        let now = fixed_now();
        let pair = issue_tokens(&keys, &identity(), now).unwrap();
        let two_days_later = now.timestamp() + 48 * 3600;

        assert_eq!(
            validate_access_token(&keys, &pair.access_token, two_days_later),
            Err(TokenError::Expired)
        );
        assert!(validate_refresh_token(&keys, &pair.refresh_token, two_days_later).is_ok());
    }

    #[test]
    fn test_tokens_signed_at_different_instants_validate_identically() {
        let keys = keys();
        let now = fixed_now();
        let first = issue_tokens(&keys, &identity(), now).unwrap();
        let second = issue_tokens(&keys, &identity(), now + Duration::seconds(5)).unwrap();
        let check_at = now.timestamp() + 60;

        let a = validate_access_token(&keys, &first.access_token, check_at).unwrap();
        let b = validate_access_token(&keys, &second.access_token, check_at).unwrap();

        assert_eq!(a.identity, b.identity);
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let keys = keys();
        let now = fixed_now();
        let pair = issue_tokens(&keys, &identity(), now).unwrap();

        let result = validate_access_token(&keys, &pair.refresh_token, now.timestamp());
        assert!(matches!(result, Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_access_token_is_not_a_refresh_token() {
        let keys = keys();
        let now = fixed_now();
        let pair = issue_tokens(&keys, &identity(), now).unwrap();

        let result = validate_refresh_token(&keys, &pair.access_token, now.timestamp());
        assert!(matches!(result, Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let keys = keys();
        for token in ["", "abc", "invalid.token.here", "a.b", "a.b.c.d"] {
            let result = validate_access_token(&keys, token, 0);
            assert!(
                matches!(result, Err(TokenError::Malformed(_))),
                "{:?} should be malformed, got {:?}",
                token,
                result
            );
        }
    }

    #[test]
    fn test_wrong_secret_is_invalid_signature() {
        let now = fixed_now();
        let pair = issue_tokens(&keys(), &identity(), now).unwrap();
        let other = JwtKeys::new("a-completely-different-secret-value").unwrap();

        assert_eq!(
            validate_access_token(&other, &pair.access_token, now.timestamp()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_any_bit_flip_is_rejected() {
        let keys = keys();
        let now = fixed_now();
        let pair = issue_tokens(&keys, &identity(), now).unwrap();
        let original = pair.access_token.as_bytes();

        for index in 0..original.len() {
            // Low seven bits only, so the token stays ASCII.
            for bit in 0..7 {
                let mut bytes = original.to_vec();
                bytes[index] ^= 1 << bit;
                let tampered = String::from_utf8(bytes).expect("ASCII stays UTF-8");

                match validate_access_token(&keys, &tampered, now.timestamp()) {
                    Err(TokenError::InvalidSignature) | Err(TokenError::Malformed(_)) => {}
                    other => panic!(
                        "flipping bit {} of byte {} gave {:?}",
                        bit, index, other
                    ),
                }
            }
        }
    }
}
