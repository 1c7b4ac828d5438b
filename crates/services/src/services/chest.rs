//! Daily chest opening: rolls the reward engine, generates the item and
//! persists item + counters as one unit.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use backon::{ExponentialBuilder, Retryable};
use chrono::NaiveDate;
use db::{
    is_contention, is_unique_violation,
    models::{
        daily_chest::DailyChest,
        loot_item::{CreateLootItem, LootItem},
        user_profile::UserProfile,
    },
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    loot_factory::{GenerationError, LootFactory},
    reward_engine::{
        RewardState, RngRolls, RollSource, resolve_guest_open, roll_bonus, roll_rarity,
    },
};

const MAX_COMMIT_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum ChestError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("invalid date key {0:?}: expected YYYY-MM-DD")]
    InvalidDateKey(String),
    #[error("chest for {0} already opened")]
    AlreadyOpened(String),
    #[error("reward state changed concurrently")]
    Conflict,
}

fn contention(err: sqlx::Error) -> ChestError {
    if is_contention(&err) {
        ChestError::Conflict
    } else {
        ChestError::Database(err)
    }
}

/// What the caller gets back from an open.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ChestOpening {
    pub item: LootItem,
    pub granted_bonus_token: bool,
    pub is_pity_trigger: bool,
    /// Counters after the open; absent for guests
    pub reward_state: Option<RewardState>,
}

/// Accepts only canonical `YYYY-MM-DD` keys.
pub fn validate_date_key(date_key: &str) -> Result<NaiveDate, ChestError> {
    NaiveDate::parse_from_str(date_key, "%Y-%m-%d")
        .ok()
        .filter(|date| date.format("%Y-%m-%d").to_string() == date_key)
        .ok_or_else(|| ChestError::InvalidDateKey(date_key.to_string()))
}

pub struct ChestService {
    pool: SqlitePool,
    factory: Arc<dyn LootFactory>,
    rolls: Mutex<Box<dyn RollSource>>,
}

impl ChestService {
    pub fn new(pool: SqlitePool, factory: Arc<dyn LootFactory>) -> Self {
        Self::with_rolls(pool, factory, RngRolls::from_entropy())
    }

    pub fn with_rolls(
        pool: SqlitePool,
        factory: Arc<dyn LootFactory>,
        rolls: impl RollSource + 'static,
    ) -> Self {
        Self {
            pool,
            factory,
            rolls: Mutex::new(Box::new(rolls)),
        }
    }

    fn roll<T>(&self, f: impl FnOnce(&mut (dyn RollSource + 'static)) -> T) -> T {
        let mut rolls = self.rolls.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **rolls)
    }

    /// Open the chest for `date_key` on behalf of a signed-in user.
    ///
    /// Generation happens before anything is written, so a failed generation
    /// leaves the counters untouched. The counter update, the item and the
    /// daily record are committed in one transaction. The two halves of
    /// [`resolve_open`](super::reward_engine::resolve_open) run separately here:
    /// rarity before `forge`, the bonus roll inside the transaction against the
    /// counter it reads.
    pub async fn open(&self, user_id: Uuid, date_key: &str) -> Result<ChestOpening, ChestError> {
        validate_date_key(date_key)?;

        if DailyChest::find_by_user_and_date(&self.pool, user_id, date_key)
            .await?
            .is_some()
        {
            return Err(ChestError::AlreadyOpened(date_key.to_string()));
        }

        let rarity = self.roll(|rolls| roll_rarity(rolls));
        let loot = self
            .factory
            .forge(rarity)
            .await
            .inspect_err(|e| warn!(user_id = %user_id, %rarity, error = %e, "Loot generation failed"))?
            .into_create(rarity);

        let opening = (|| async { self.commit_open(user_id, date_key, &loot).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(Duration::from_millis(10))
                    .with_max_delay(Duration::from_millis(250))
                    .with_max_times(MAX_COMMIT_ATTEMPTS)
                    .with_jitter(),
            )
            .when(|e: &ChestError| matches!(e, ChestError::Conflict))
            .notify(|_, dur| {
                debug!(
                    user_id = %user_id,
                    "Chest open raced another writer, retrying after {:?}",
                    dur
                )
            })
            .await?;

        info!(
            user_id = %user_id,
            date_key,
            rarity = %opening.item.rarity,
            granted_bonus_token = opening.granted_bonus_token,
            is_pity_trigger = opening.is_pity_trigger,
            "Chest opened"
        );
        Ok(opening)
    }

    async fn commit_open(
        &self,
        user_id: Uuid,
        date_key: &str,
        loot: &CreateLootItem,
    ) -> Result<ChestOpening, ChestError> {
        let mut tx = self.pool.begin().await.map_err(contention)?;

        let profile = UserProfile::find_or_create(&mut *tx, user_id)
            .await
            .map_err(contention)?;
        let prior = RewardState::from(&profile);
        let bonus = self.roll(|rolls| roll_bonus(prior.open_counter, rolls));
        let next = prior.apply(&bonus);

        let written = UserProfile::compare_and_set(
            &mut *tx,
            user_id,
            profile.version,
            i64::from(next.open_counter),
            i64::from(next.bonus_token_count),
        )
        .await
        .map_err(contention)?;
        if !written {
            return Err(ChestError::Conflict);
        }

        let item = LootItem::create(&mut *tx, user_id, loot)
            .await
            .map_err(contention)?;
        DailyChest::create(&mut *tx, user_id, date_key, item.id)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ChestError::AlreadyOpened(date_key.to_string())
                } else {
                    contention(e)
                }
            })?;

        tx.commit().await.map_err(contention)?;

        Ok(ChestOpening {
            item,
            granted_bonus_token: bonus.granted_bonus_token,
            is_pity_trigger: bonus.is_pity_trigger,
            reward_state: Some(next),
        })
    }

    /// Open a chest for a session with no durable counter. Rarity only; nothing
    /// is stored and no bonus token or pity is ever reported.
    pub async fn open_guest(&self) -> Result<ChestOpening, ChestError> {
        let outcome = self.roll(|rolls| resolve_guest_open(rolls));
        let loot = self
            .factory
            .forge(outcome.rarity)
            .await?
            .into_create(outcome.rarity);
        debug!(rarity = %outcome.rarity, "Guest chest opened");

        Ok(ChestOpening {
            item: LootItem::unsaved(loot),
            granted_bonus_token: outcome.granted_bonus_token,
            is_pity_trigger: outcome.is_pity_trigger,
            reward_state: None,
        })
    }

    pub async fn reward_state(&self, user_id: Uuid) -> Result<RewardState, ChestError> {
        Ok(UserProfile::find_by_user_id(&self.pool, user_id)
            .await?
            .map(|profile| RewardState::from(&profile))
            .unwrap_or_default())
    }
}
