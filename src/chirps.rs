/// Chirps
///
/// Short public posts. Bodies are limited to 140 characters and a fixed list
/// of words is masked before storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{DatabaseError, ValidationError};

pub const MAX_CHIRP_LENGTH: usize = 140;

const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];
const MASK: &str = "****";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Chirp {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: Uuid,
}

impl Chirp {
    pub fn new(user_id: Uuid, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            body: body.into(),
            user_id,
        }
    }
}

/// Listing order by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Check the length limit, then mask profane words.
///
/// Words are split on single spaces and compared case-insensitively, so
/// `Kerfuffle!` (with punctuation) is kept as is.
pub fn clean_body(body: &str) -> Result<String, ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyField("Chirp".to_string()));
    }
    if body.chars().count() > MAX_CHIRP_LENGTH {
        return Err(ValidationError::TooLong("Chirp".to_string(), MAX_CHIRP_LENGTH));
    }

    let cleaned = body
        .split(' ')
        .map(|word| {
            if PROFANE_WORDS.contains(&word.to_lowercase().as_str()) {
                MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    Ok(cleaned)
}

#[async_trait]
pub trait ChirpStore: Send + Sync {
    async fn create(&self, user_id: Uuid, body: &str) -> Result<Chirp, DatabaseError>;

    /// All chirps, optionally only those of `author`
    async fn list(
        &self,
        author: Option<Uuid>,
        order: SortOrder,
    ) -> Result<Vec<Chirp>, DatabaseError>;

    async fn get(&self, chirp_id: Uuid) -> Result<Chirp, DatabaseError>;

    async fn delete(&self, chirp_id: Uuid) -> Result<(), DatabaseError>;

    async fn delete_all(&self) -> Result<u64, DatabaseError>;
}

/// PostgreSQL implementation of `ChirpStore`
pub struct PgChirpStore {
    pool: PgPool,
}

impl PgChirpStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChirpStore for PgChirpStore {
    async fn create(&self, user_id: Uuid, body: &str) -> Result<Chirp, DatabaseError> {
        let chirp = Chirp::new(user_id, body);

        sqlx::query(
            r#"
            INSERT INTO chirps (id, created_at, updated_at, body, user_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(chirp.id)
        .bind(chirp.created_at)
        .bind(chirp.updated_at)
        .bind(&chirp.body)
        .bind(chirp.user_id)
        .execute(&self.pool)
        .await?;

        Ok(chirp)
    }

    async fn list(
        &self,
        author: Option<Uuid>,
        order: SortOrder,
    ) -> Result<Vec<Chirp>, DatabaseError> {
        let query = match order {
            SortOrder::Asc => {
                r#"
                SELECT id, created_at, updated_at, body, user_id
                FROM chirps
                WHERE $1::uuid IS NULL OR user_id = $1
                ORDER BY created_at ASC
                "#
            }
            SortOrder::Desc => {
                r#"
                SELECT id, created_at, updated_at, body, user_id
                FROM chirps
                WHERE $1::uuid IS NULL OR user_id = $1
                ORDER BY created_at DESC
                "#
            }
        };

        let chirps = sqlx::query_as::<_, Chirp>(query)
            .bind(author)
            .fetch_all(&self.pool)
            .await?;

        Ok(chirps)
    }

    async fn get(&self, chirp_id: Uuid) -> Result<Chirp, DatabaseError> {
        sqlx::query_as::<_, Chirp>(
            "SELECT id, created_at, updated_at, body, user_id FROM chirps WHERE id = $1",
        )
        .bind(chirp_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("chirp".to_string()))
    }

    async fn delete(&self, chirp_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(chirp_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("chirp".to_string()));
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM chirps").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// In-process implementation of `ChirpStore`
#[derive(Default)]
pub struct InMemoryChirpStore {
    chirps: RwLock<HashMap<Uuid, Chirp>>,
}

impl InMemoryChirpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChirpStore for InMemoryChirpStore {
    async fn create(&self, user_id: Uuid, body: &str) -> Result<Chirp, DatabaseError> {
        let chirp = Chirp::new(user_id, body);
        self.chirps.write().await.insert(chirp.id, chirp.clone());
        Ok(chirp)
    }

    async fn list(
        &self,
        author: Option<Uuid>,
        order: SortOrder,
    ) -> Result<Vec<Chirp>, DatabaseError> {
        let mut chirps: Vec<Chirp> = self
            .chirps
            .read()
            .await
            .values()
            .filter(|chirp| author.map_or(true, |id| chirp.user_id == id))
            .cloned()
            .collect();

        chirps.sort_by_key(|chirp| chirp.created_at);
        if order == SortOrder::Desc {
            chirps.reverse();
        }
        Ok(chirps)
    }

    async fn get(&self, chirp_id: Uuid) -> Result<Chirp, DatabaseError> {
        self.chirps
            .read()
            .await
            .get(&chirp_id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound("chirp".to_string()))
    }

    async fn delete(&self, chirp_id: Uuid) -> Result<(), DatabaseError> {
        self.chirps
            .write()
            .await
            .remove(&chirp_id)
            .map(|_| ())
            .ok_or_else(|| DatabaseError::NotFound("chirp".to_string()))
    }

    async fn delete_all(&self) -> Result<u64, DatabaseError> {
        let mut chirps = self.chirps.write().await;
        let removed = chirps.len() as u64;
        chirps.clear();
        Ok(removed)
    }
}
