use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Record that a user opened the chest for a given day. At most one per
/// `(user_id, date_key)`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DailyChest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub date_key: String,
    pub loot_item_id: Uuid,
    pub opened_at: DateTime<Utc>,
}

impl DailyChest {
    pub async fn create<'e, E>(
        executor: E,
        user_id: Uuid,
        date_key: &str,
        loot_item_id: Uuid,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, DailyChest>(
            r#"INSERT INTO daily_chests (id, user_id, date_key, loot_item_id, opened_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, user_id, date_key, loot_item_id, opened_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(date_key)
        .bind(loot_item_id)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_user_and_date(
        pool: &SqlitePool,
        user_id: Uuid,
        date_key: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, DailyChest>(
            r#"SELECT id, user_id, date_key, loot_item_id, opened_at
               FROM daily_chests
               WHERE user_id = $1 AND date_key = $2"#,
        )
        .bind(user_id)
        .bind(date_key)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DBService, is_unique_violation};

    #[tokio::test]
    async fn second_chest_for_same_day_violates_uniqueness() {
        let db = DBService::new_in_memory().await.unwrap();
        let user_id = Uuid::new_v4();

        DailyChest::create(&db.pool, user_id, "2025-06-01", Uuid::new_v4())
            .await
            .unwrap();
        let err = DailyChest::create(&db.pool, user_id, "2025-06-01", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));

        // another day, or another user, is fine
        DailyChest::create(&db.pool, user_id, "2025-06-02", Uuid::new_v4())
            .await
            .unwrap();
        DailyChest::create(&db.pool, Uuid::new_v4(), "2025-06-01", Uuid::new_v4())
            .await
            .unwrap();
    }
}
