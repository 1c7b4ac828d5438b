use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Per-user reward counters. `version` is bumped on every write so concurrent
/// chest openings can detect that they raced.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub open_counter: i64,
    pub bonus_token_count: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"SELECT user_id, open_counter, bonus_token_count, version, created_at, updated_at
               FROM user_profiles
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Load the profile, inserting a zeroed one first if the user has none.
    pub async fn find_or_create(
        conn: &mut SqliteConnection,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query(
            r#"INSERT INTO user_profiles (user_id, open_counter, bonus_token_count, version, created_at, updated_at)
               VALUES ($1, 0, 0, 0, $2, $2)
               ON CONFLICT(user_id) DO NOTHING"#,
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        sqlx::query_as::<_, UserProfile>(
            r#"SELECT user_id, open_counter, bonus_token_count, version, created_at, updated_at
               FROM user_profiles
               WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
    }

    /// Write new counters only if nobody else has written since `expected_version`
    /// was read. Returns false when the row moved on.
    pub async fn compare_and_set(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        expected_version: i64,
        open_counter: i64,
        bonus_token_count: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE user_profiles
               SET open_counter = $3,
                   bonus_token_count = $4,
                   version = version + 1,
                   updated_at = $5
               WHERE user_id = $1 AND version = $2"#,
        )
        .bind(user_id)
        .bind(expected_version)
        .bind(open_counter)
        .bind(bonus_token_count)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
