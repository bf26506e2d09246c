/// Credential Store
///
/// The subsystem only needs a handful of reads and writes against user
/// records. [`UserStore`] is that contract; `postgres` and `memory` provide
/// the two backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::{Identity, Role};
use crate::error::StorageError;

mod memory;
mod postgres;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;

/// A stored user, including the current token pair if one was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub phone_number: String,
    pub password_hash: String,
    pub user_type: Role,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Identity fields that go into an access token
    pub fn identity(&self) -> Identity {
        Identity {
            email_address: self.email_address.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            user_type: self.user_type,
            user_id: self.user_id.clone(),
        }
    }
}

/// Insert input. The store assigns the user identifier.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub phone_number: String,
    pub password_hash: String,
    pub user_type: Role,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StorageError>;

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError>;

    async fn count_by_email(&self, email: &str) -> Result<i64, StorageError>;

    async fn count_by_phone(&self, phone: &str) -> Result<i64, StorageError>;

    /// Set the token fields for `user_id`, creating the token entry if absent.
    /// Concurrent writers for one user resolve last-write-wins.
    async fn upsert_token_fields(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Insert a user and return the generated identifier
    async fn insert(&self, user: NewUser) -> Result<String, StorageError>;
}
