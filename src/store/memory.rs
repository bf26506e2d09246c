use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{NewUser, UserRecord, UserStore};
use crate::error::{DuplicateIdentity, StorageError};

/// Token fields as last written for a user identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFields {
    pub access_token: String,
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, UserRecord>,
    tokens: HashMap<String, TokenFields>,
}

/// Process-local store with the same semantics as the Postgres one.
///
/// Token fields live apart from user rows so an upsert for an unknown
/// identifier still lands.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: Mutex<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Unavailable("user store lock poisoned".to_string()))
    }

    /// Token fields for `user_id`, whether or not a user record exists
    pub fn token_fields(&self, user_id: &str) -> Result<Option<TokenFields>, StorageError> {
        Ok(self.lock()?.tokens.get(user_id).cloned())
    }

    fn merged(inner: &Inner, record: &UserRecord) -> UserRecord {
        let mut record = record.clone();
        if let Some(tokens) = inner.tokens.get(&record.user_id) {
            record.access_token = Some(tokens.access_token.clone());
            record.refresh_token = Some(tokens.refresh_token.clone());
            record.updated_at = tokens.updated_at;
        }
        record
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner
            .users
            .values()
            .find(|u| u.email_address == email)
            .map(|u| Self::merged(&inner, u)))
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.users.get(user_id).map(|u| Self::merged(&inner, u)))
    }

    async fn count_by_email(&self, email: &str) -> Result<i64, StorageError> {
        let inner = self.lock()?;
        Ok(inner.users.values().filter(|u| u.email_address == email).count() as i64)
    }

    async fn count_by_phone(&self, phone: &str) -> Result<i64, StorageError> {
        let inner = self.lock()?;
        Ok(inner.users.values().filter(|u| u.phone_number == phone).count() as i64)
    }

    async fn upsert_token_fields(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.lock()?.tokens.insert(
            user_id.to_string(),
            TokenFields {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                updated_at,
            },
        );
        Ok(())
    }

    async fn insert(&self, user: NewUser) -> Result<String, StorageError> {
        let mut inner = self.lock()?;

        // Mirrors the unique indexes on the users table.
        if inner.users.values().any(|u| u.email_address == user.email_address) {
            return Err(StorageError::Duplicate(DuplicateIdentity::Email));
        }
        if inner.users.values().any(|u| u.phone_number == user.phone_number) {
            return Err(StorageError::Duplicate(DuplicateIdentity::Phone));
        }

        let user_id = Uuid::new_v4().to_string();
        inner.users.insert(
            user_id.clone(),
            UserRecord {
                user_id: user_id.clone(),
                first_name: user.first_name,
                last_name: user.last_name,
                email_address: user.email_address,
                phone_number: user.phone_number,
                password_hash: user.password_hash,
                user_type: user.user_type,
                access_token: None,
                refresh_token: None,
                created_at: user.created_at,
                updated_at: user.created_at,
            },
        );

        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn new_user(email: &str, phone: &str) -> NewUser {
        NewUser {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email_address: email.to_string(),
            phone_number: phone.to_string(),
            password_hash: "$2b$04$hash".to_string(),
            user_type: Role::User,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_lookup() {
        let store = InMemoryUserStore::new();
        let id = store.insert(new_user("a@x.com", "5551234")).await.unwrap();

        let by_id = store.find_by_id(&id).await.unwrap().expect("missing by id");
        let by_email = store.find_by_email("a@x.com").await.unwrap().expect("missing by email");

        assert_eq!(by_id, by_email);
        assert_eq!(by_id.user_id, id);
        assert!(by_id.access_token.is_none());
        assert_eq!(store.count_by_email("a@x.com").await.unwrap(), 1);
        assert_eq!(store.count_by_phone("5551234").await.unwrap(), 1);
        assert_eq!(store.count_by_email("b@x.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@x.com", "5551234")).await.unwrap();

        let result = store.insert(new_user("a@x.com", "5559999")).await;
        assert!(matches!(
            result,
            Err(StorageError::Duplicate(DuplicateIdentity::Email))
        ));
        assert_eq!(store.count_by_phone("5559999").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_phone() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@x.com", "5551234")).await.unwrap();

        let result = store.insert(new_user("b@x.com", "5551234")).await;
        assert!(matches!(
            result,
            Err(StorageError::Duplicate(DuplicateIdentity::Phone))
        ));
        assert_eq!(store.count_by_email("b@x.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_visible_on_record() {
        let store = InMemoryUserStore::new();
        let id = store.insert(new_user("a@x.com", "5551234")).await.unwrap();
        let at = Utc::now();

        store.upsert_token_fields(&id, "acc", "ref", at).await.unwrap();
        let first = store.find_by_id(&id).await.unwrap().unwrap();
        store.upsert_token_fields(&id, "acc", "ref", at).await.unwrap();
        let second = store.find_by_id(&id).await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(second.access_token.as_deref(), Some("acc"));
        assert_eq!(second.refresh_token.as_deref(), Some("ref"));
        assert_eq!(second.updated_at, at);
    }

    #[tokio::test]
    async fn upsert_without_user_record_still_lands() {
        let store = InMemoryUserStore::new();
        store
            .upsert_token_fields("ghost", "acc", "ref", Utc::now())
            .await
            .unwrap();

        assert!(store.find_by_id("ghost").await.unwrap().is_none());
        let tokens = store.token_fields("ghost").unwrap().expect("tokens missing");
        assert_eq!(tokens.access_token, "acc");
    }

    #[tokio::test]
    async fn later_upsert_wins() {
        let store = InMemoryUserStore::new();
        store.upsert_token_fields("u1", "a1", "r1", Utc::now()).await.unwrap();
        store.upsert_token_fields("u1", "a2", "r2", Utc::now()).await.unwrap();

        let tokens = store.token_fields("u1").unwrap().unwrap();
        assert_eq!((tokens.access_token.as_str(), tokens.refresh_token.as_str()), ("a2", "r2"));
    }
}
