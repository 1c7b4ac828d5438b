//! N-for-1 rarity upgrades.

use std::sync::Arc;

use db::models::loot_item::{LootItem, Rarity};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::loot_factory::{GenerationError, LootFactory};

#[derive(Debug, Error)]
pub enum CraftingError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{0} items cannot be crafted")]
    NotCraftable(Rarity),
    #[error("need {required} {source_rarity} items, have {available}")]
    InsufficientMaterials {
        source_rarity: Rarity,
        required: u32,
        available: u32,
    },
}

/// Exchange `required_count` items of `source` for one item of `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub target: Rarity,
    pub source: Rarity,
    pub required_count: u32,
}

pub const RECIPES: [Recipe; 3] = [
    Recipe {
        target: Rarity::Rare,
        source: Rarity::Common,
        required_count: 5,
    },
    Recipe {
        target: Rarity::Epic,
        source: Rarity::Rare,
        required_count: 5,
    },
    Recipe {
        target: Rarity::Legendary,
        source: Rarity::Epic,
        required_count: 3,
    },
];

pub fn recipe_for(target: Rarity) -> Option<&'static Recipe> {
    RECIPES.iter().find(|recipe| recipe.target == target)
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CraftResult {
    pub item: LootItem,
    pub consumed: Vec<Uuid>,
}

pub struct CraftingService {
    pool: SqlitePool,
    factory: Arc<dyn LootFactory>,
}

impl CraftingService {
    pub fn new(pool: SqlitePool, factory: Arc<dyn LootFactory>) -> Self {
        Self { pool, factory }
    }

    /// Consume the user's oldest source items and create one `target` item.
    /// The item is generated first; the consume and the create share a
    /// transaction and either both happen or neither does.
    pub async fn craft(&self, user_id: Uuid, target: Rarity) -> Result<CraftResult, CraftingError> {
        let recipe = recipe_for(target).ok_or(CraftingError::NotCraftable(target))?;

        let available = LootItem::count_by_rarity(&self.pool, user_id, recipe.source).await?;
        ensure_enough(recipe, available)?;

        let loot = self
            .factory
            .forge(recipe.target)
            .await
            .inspect_err(|e| warn!(user_id = %user_id, %target, error = %e, "Crafting generation failed"))?
            .into_create(recipe.target);

        let mut tx = self.pool.begin().await?;
        let consumed = LootItem::consume_oldest(
            &mut *tx,
            user_id,
            recipe.source,
            i64::from(recipe.required_count),
        )
        .await?;
        if consumed.len() != recipe.required_count as usize {
            // someone spent the materials since the availability check
            tx.rollback().await?;
            return Err(CraftingError::InsufficientMaterials {
                source_rarity: recipe.source,
                required: recipe.required_count,
                available: consumed.len() as u32,
            });
        }
        let item = LootItem::create(&mut *tx, user_id, &loot).await?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            %target,
            consumed = consumed.len(),
            "Crafted item"
        );
        Ok(CraftResult { item, consumed })
    }
}

fn ensure_enough(recipe: &Recipe, available: i64) -> Result<(), CraftingError> {
    if available < i64::from(recipe.required_count) {
        return Err(CraftingError::InsufficientMaterials {
            source_rarity: recipe.source,
            required: recipe.required_count,
            available: u32::try_from(available).unwrap_or(0),
        });
    }
    Ok(())
}
