use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{NewUser, UserRecord, UserStore};
use crate::error::{DuplicateIdentity, StorageError};

/// Postgres-backed store.
///
/// Tokens are kept in `user_tokens`, keyed by `user_id` without a foreign
/// key, so recording a pair never depends on the user row existing.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    first_name: String,
    last_name: String,
    email_address: String,
    phone_number: String,
    password_hash: String,
    user_type: String,
    access_token: Option<String>,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StorageError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let user_type = row.user_type.parse().map_err(|_| {
            StorageError::Unexpected(format!(
                "user {} has unknown user_type {:?}",
                row.user_id, row.user_type
            ))
        })?;

        Ok(UserRecord {
            user_id: row.user_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email_address: row.email_address,
            phone_number: row.phone_number,
            password_hash: row.password_hash,
            user_type,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Which unique identity a failed insert collided with, if any.
fn duplicate_identity(err: &sqlx::Error) -> Option<DuplicateIdentity> {
    let db_err = match err {
        sqlx::Error::Database(db_err) => db_err,
        _ => return None,
    };
    if db_err.code().as_deref() != Some(UNIQUE_VIOLATION) {
        return None;
    }

    let constraint = db_err.constraint().unwrap_or_default();
    if constraint.contains("phone_number") {
        Some(DuplicateIdentity::Phone)
    } else if constraint.contains("email_address") {
        Some(DuplicateIdentity::Email)
    } else {
        None
    }
}

const SELECT_USER: &str = r#"
    SELECT u.user_id, u.first_name, u.last_name, u.email_address, u.phone_number,
           u.password_hash, u.user_type, t.access_token, t.refresh_token,
           u.created_at, COALESCE(t.updated_at, u.updated_at) AS updated_at
    FROM users u
    LEFT JOIN user_tokens t ON t.user_id = u.user_id
"#;

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema in `migrations/`
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Unavailable(format!("migration failed: {}", e)))
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<UserRecord>, StorageError> {
        let query = format!("{} WHERE u.{} = $1", SELECT_USER, column);
        sqlx::query_as::<_, UserRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(UserRecord::try_from)
            .transpose()
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StorageError> {
        self.find_one("email_address", email).await
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StorageError> {
        self.find_one("user_id", user_id).await
    }

    async fn count_by_email(&self, email: &str) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE email_address = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn count_by_phone(&self, phone: &str) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM users WHERE phone_number = $1",
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn upsert_token_fields(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, access_token, refresh_token, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert(&self, user: NewUser) -> Result<String, StorageError> {
        let user_id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, first_name, last_name, email_address, phone_number,
                               password_hash, user_type, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            "#,
        )
        .bind(&user_id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email_address)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .bind(user.user_type.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match duplicate_identity(&e) {
            Some(duplicate) => StorageError::Duplicate(duplicate),
            None => e.into(),
        })?;

        Ok(user_id)
    }
}
