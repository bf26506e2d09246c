/// Token Claims
///
/// Two explicitly typed payloads are signed per login: [`AccessClaims`]
/// carries the full identity, [`RefreshClaims`] only the subject and an expiry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Enumerated user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match on the wire name.
impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            _ => Err(ValidationError::InvalidFormat("user_type".to_string())),
        }
    }
}

/// Identity fields embedded in an access token.
///
/// This is also the request context the auth guard attaches on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: Role,
    pub user_id: String,
}

/// Claims for access tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub identity: Identity,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Claims for refresh tokens: the subject and nothing else of the identity.
///
/// Unknown fields are rejected so an access token never passes as one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    /// Subject the token was issued to
    pub user_id: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Anything the validator can check an expiry on
pub trait Expiring {
    fn expires_at(&self) -> i64;

    /// Expired when the expiry is at or before `now`.
    fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at() <= now
    }
}

impl Expiring for AccessClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

impl Expiring for RefreshClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}
