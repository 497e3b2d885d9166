/// Refresh Token Management
///
/// Refresh tokens are long-lived opaque credentials:
/// - 64 random alphanumeric characters (~381 bits), generated by a CSPRNG
/// - Stored as-is and used as the lookup key; their entropy is the protection
/// - Reusable until they expire or are revoked (no rotation)
/// - Revocation is one atomic write that never moves an existing `revoked_at`
///
/// The stores are plain data layers. Whether a token may still be used is
/// decided by `RefreshToken::is_usable`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DatabaseError;

const REFRESH_TOKEN_LENGTH: usize = 64;

/// A persisted refresh token
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a refresh token. `Expired` and `Revoked` are both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Expired,
    Revoked,
}

impl RefreshToken {
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        if self.revoked_at.is_some() {
            TokenState::Revoked
        } else if now >= self.expires_at {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == TokenState::Active
    }
}

/// Generate a new cryptographically secure refresh token
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Persistent registry of refresh tokens, keyed by the token string
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Store a fresh token for `user_id` and return its plaintext
    async fn issue(&self, user_id: Uuid) -> Result<String, DatabaseError>;

    /// Fetch the record for `token`, `NotFound` if there is none
    async fn lookup(&self, token: &str) -> Result<RefreshToken, DatabaseError>;

    /// Mark `token` revoked. Revoking twice keeps the first timestamp.
    async fn revoke(&self, token: &str) -> Result<(), DatabaseError>;

    /// Revoke every unrevoked token owned by `user_id`, returning how many changed
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, DatabaseError>;

    /// Remove every token. Only used by the development reset.
    async fn delete_all(&self) -> Result<u64, DatabaseError>;
}

/// PostgreSQL implementation of `RefreshTokenStore`
pub struct PgRefreshTokenStore {
    pool: PgPool,
    lifetime: Duration,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool, lifetime: Duration) -> Self {
        Self { pool, lifetime }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn issue(&self, user_id: Uuid) -> Result<String, DatabaseError> {
        let token = generate_refresh_token();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, created_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, NULL)
            "#,
        )
        .bind(&token)
        .bind(user_id)
        .bind(now)
        .bind(now + self.lifetime)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    async fn lookup(&self, token: &str) -> Result<RefreshToken, DatabaseError> {
        sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, user_id, created_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("refresh token".to_string()))
    }

    async fn revoke(&self, token: &str) -> Result<(), DatabaseError> {
        // COALESCE keeps the first revocation time in a single statement
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $1)
            WHERE token = $2
            "#,
        )
        .bind(Utc::now())
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("refresh token".to_string()));
        }
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1
            WHERE user_id = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(user_id = %user_id, "All refresh tokens revoked for user");
        Ok(result.rows_affected())
    }

    async fn delete_all(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM refresh_tokens")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// In-process implementation of `RefreshTokenStore`
///
/// Every operation holds the write lock for its whole check-then-set, which
/// gives the same per-record atomicity as the SQL version.
pub struct InMemoryRefreshTokenStore {
    lifetime: Duration,
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            tokens: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn issue(&self, user_id: Uuid) -> Result<String, DatabaseError> {
        let token = generate_refresh_token();
        let now = Utc::now();
        let record = RefreshToken {
            token: token.clone(),
            user_id,
            created_at: now,
            expires_at: now + self.lifetime,
            revoked_at: None,
        };

        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token) {
            return Err(DatabaseError::QueryExecution(
                "duplicate refresh token".to_string(),
            ));
        }
        tokens.insert(token.clone(), record);

        Ok(token)
    }

    async fn lookup(&self, token: &str) -> Result<RefreshToken, DatabaseError> {
        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound("refresh token".to_string()))
    }

    async fn revoke(&self, token: &str) -> Result<(), DatabaseError> {
        let mut tokens = self.tokens.write().await;
        let record = tokens
            .get_mut(token)
            .ok_or_else(|| DatabaseError::NotFound("refresh token".to_string()))?;

        if record.revoked_at.is_none() {
            record.revoked_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let now = Utc::now();
        let mut revoked = 0;

        for record in self.tokens.write().await.values_mut() {
            if record.user_id == user_id && record.revoked_at.is_none() {
                record.revoked_at = Some(now);
                revoked += 1;
            }
        }

        tracing::info!(user_id = %user_id, "All refresh tokens revoked for user");
        Ok(revoked)
    }

    async fn delete_all(&self) -> Result<u64, DatabaseError> {
        let mut tokens = self.tokens.write().await;
        let removed = tokens.len() as u64;
        tokens.clear();
        Ok(removed)
    }
}
