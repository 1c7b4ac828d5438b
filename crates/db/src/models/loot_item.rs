use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Loot tiers, ordered from most to least common.
#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    TS,
    EnumString,
    Display,
)]
#[sqlx(type_name = "rarity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Rarity::Common, Rarity::Rare, Rarity::Epic, Rarity::Legendary];

    /// Cumulative thresholds over a roll in `[0, 100)`, evaluated in order:
    /// the first tier whose bound exceeds the roll wins.
    pub const THRESHOLDS: [(Rarity, f64); 4] = [
        (Rarity::Common, 70.0),
        (Rarity::Rare, 90.0),
        (Rarity::Epic, 98.0),
        (Rarity::Legendary, 100.0),
    ];

    fn position(self) -> usize {
        match self {
            Rarity::Common => 0,
            Rarity::Rare => 1,
            Rarity::Epic => 2,
            Rarity::Legendary => 3,
        }
    }

    /// Exclusive upper bound of this tier in the roll table
    pub fn upper_bound(self) -> f64 {
        Self::THRESHOLDS[self.position()].1
    }

    /// Chance of this tier dropping from a single roll, in percent
    pub fn drop_chance_percent(self) -> f64 {
        let lower = match self.position() {
            0 => 0.0,
            i => Self::THRESHOLDS[i - 1].1,
        };
        self.upper_bound() - lower
    }

    /// The next tier up, if any
    pub fn next(self) -> Option<Rarity> {
        Self::ALL.get(self.position() + 1).copied()
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct LootItem {
    pub id: Uuid,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub user_id: Uuid,
    pub rarity: Rarity,
    pub name: String,
    pub flavor_text: String,
    pub icon: String,
    pub obtained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateLootItem {
    pub rarity: Rarity,
    pub name: String,
    pub flavor_text: String,
    pub icon: String,
}

impl LootItem {
    /// An item that is handed out without being stored (guest sessions).
    /// It belongs to no user, so `user_id` is nil.
    pub fn unsaved(data: CreateLootItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            rarity: data.rarity,
            name: data.name,
            flavor_text: data.flavor_text,
            icon: data.icon,
            obtained_at: Utc::now(),
        }
    }

    pub async fn create<'e, E>(
        executor: E,
        user_id: Uuid,
        data: &CreateLootItem,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, LootItem>(
            r#"INSERT INTO loot_items (id, user_id, rarity, name, flavor_text, icon, obtained_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, user_id, rarity, name, flavor_text, icon, obtained_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(data.rarity)
        .bind(&data.name)
        .bind(&data.flavor_text)
        .bind(&data.icon)
        .bind(Utc::now())
        .fetch_one(executor)
        .await
    }

    /// All of a user's loot, newest first
    pub async fn find_by_user_id(
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, LootItem>(
            r#"SELECT id, user_id, rarity, name, flavor_text, icon, obtained_at
               FROM loot_items
               WHERE user_id = $1
               ORDER BY obtained_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, LootItem>(
            r#"SELECT id, user_id, rarity, name, flavor_text, icon, obtained_at
               FROM loot_items
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn count_by_rarity<'e, E>(
        executor: E,
        user_id: Uuid,
        rarity: Rarity,
    ) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM loot_items WHERE user_id = $1 AND rarity = $2",
        )
        .bind(user_id)
        .bind(rarity)
        .fetch_one(executor)
        .await
    }

    /// Delete up to `count` of the user's oldest items of `rarity` and return the
    /// ids that were removed. Callers check the length against what they asked for.
    pub async fn consume_oldest(
        conn: &mut SqliteConnection,
        user_id: Uuid,
        rarity: Rarity,
        count: i64,
    ) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"DELETE FROM loot_items
               WHERE id IN (
                   SELECT id FROM loot_items
                   WHERE user_id = $1 AND rarity = $2
                   ORDER BY obtained_at ASC
                   LIMIT $3
               )
               RETURNING id"#,
        )
        .bind(user_id)
        .bind(rarity)
        .bind(count)
        .fetch_all(&mut *conn)
        .await
    }
}
