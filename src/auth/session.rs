/// Session Recording
///
/// Persists the token pair most recently issued to a user.

use chrono::{DateTime, Utc};

use crate::auth::jwt::TokenPair;
use crate::error::StorageError;
use crate::store::UserStore;

/// Upsert the pair against `user_id`. No retries; a store failure goes
/// straight back to the caller.
pub async fn record_issued_tokens(
    store: &dyn UserStore,
    user_id: &str,
    tokens: &TokenPair,
    now: DateTime<Utc>,
) -> Result<(), StorageError> {
    store
        .upsert_token_fields(user_id, &tokens.access_token, &tokens.refresh_token, now)
        .await?;

    tracing::debug!(user_id = %user_id, "Recorded issued tokens");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserStore;

    fn pair(tag: &str) -> TokenPair {
        TokenPair {
            access_token: format!("access-{}", tag),
            refresh_token: format!("refresh-{}", tag),
        }
    }

    #[tokio::test]
    async fn records_pair_with_timestamp() {
        let store = InMemoryUserStore::new();
        let now = Utc::now();

        record_issued_tokens(&store, "u1", &pair("1"), now).await.unwrap();

        let stored = store.token_fields("u1").unwrap().expect("pair not stored");
        assert_eq!(stored.access_token, "access-1");
        assert_eq!(stored.refresh_token, "refresh-1");
        assert_eq!(stored.updated_at, now);
    }

    #[tokio::test]
    async fn recording_twice_is_idempotent() {
        let store = InMemoryUserStore::new();
        let now = Utc::now();

        record_issued_tokens(&store, "u1", &pair("1"), now).await.unwrap();
        let first = store.token_fields("u1").unwrap();
        record_issued_tokens(&store, "u1", &pair("1"), now).await.unwrap();

        assert_eq!(first, store.token_fields("u1").unwrap());
    }

    #[tokio::test]
    async fn new_pair_replaces_old() {
        let store = InMemoryUserStore::new();

        record_issued_tokens(&store, "u1", &pair("old"), Utc::now()).await.unwrap();
        record_issued_tokens(&store, "u1", &pair("new"), Utc::now()).await.unwrap();

        let stored = store.token_fields("u1").unwrap().unwrap();
        assert_eq!(stored.access_token, "access-new");
        assert_eq!(stored.refresh_token, "refresh-new");
    }
}
