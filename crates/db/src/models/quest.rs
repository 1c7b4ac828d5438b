use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A daily task rewritten as a quest. Daily rows are kept in plaintext.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub user_id: Uuid,
    pub date_key: String,
    pub original_task: String,
    pub title: String,
    pub action_hint: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuest {
    pub date_key: String,
    pub original_task: String,
    pub title: String,
    pub action_hint: String,
}

impl Quest {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Uuid,
        data: &CreateQuest,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Quest>(
            r#"INSERT INTO quests (id, user_id, date_key, original_task, title, action_hint, completed, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, 0, $7)
               RETURNING id, user_id, date_key, original_task, title, action_hint, completed, completed_at, created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&data.date_key)
        .bind(&data.original_task)
        .bind(&data.title)
        .bind(&data.action_hint)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user_and_date(
        pool: &SqlitePool,
        user_id: Uuid,
        date_key: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Quest>(
            r#"SELECT id, user_id, date_key, original_task, title, action_hint, completed, completed_at, created_at
               FROM quests
               WHERE user_id = $1 AND date_key = $2
               ORDER BY created_at ASC"#,
        )
        .bind(user_id)
        .bind(date_key)
        .fetch_all(pool)
        .await
    }

    /// Mark a quest completed. Already-completed quests keep their original
    /// `completed_at`. Returns None when the quest does not belong to the user.
    pub async fn complete(
        pool: &SqlitePool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Quest>(
            r#"UPDATE quests
               SET completed = 1,
                   completed_at = COALESCE(completed_at, $3)
               WHERE id = $1 AND user_id = $2
               RETURNING id, user_id, date_key, original_task, title, action_hint, completed, completed_at, created_at"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }
}
