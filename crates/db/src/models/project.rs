use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// A long-term project. Both text columns hold encrypted fields; this layer
/// never sees the plaintext.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub encrypted_title: String,
    pub encrypted_action_hint: String,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        encrypted_title: &str,
        encrypted_action_hint: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"INSERT INTO projects (id, user_id, encrypted_title, encrypted_action_hint, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, user_id, encrypted_title, encrypted_action_hint, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(encrypted_title)
        .bind(encrypted_action_hint)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"SELECT id, user_id, encrypted_title, encrypted_action_hint, created_at
               FROM projects
               WHERE user_id = $1
               ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
