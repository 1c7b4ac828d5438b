use std::sync::Arc;

use db::DBService;
use jsonwebtoken::DecodingKey;
use secrecy::ExposeSecret;
use services::services::{
    chest::ChestService, config::AppConfig, crafting::CraftingService, field_cipher::FieldCipher,
    loot_factory::LootFactory, project::ProjectService, quest::QuestService,
    quest_narrator::QuestNarrator,
};

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    cipher: Arc<FieldCipher>,
    chests: Arc<ChestService>,
    crafting: Arc<CraftingService>,
    quests: Arc<QuestService>,
    projects: Arc<ProjectService>,
    jwt_key: Arc<DecodingKey>,
    allow_guest_chests: bool,
}

impl AppState {
    pub fn new(
        db: DBService,
        config: &AppConfig,
        factory: Arc<dyn LootFactory>,
        narrator: Arc<dyn QuestNarrator>,
    ) -> Self {
        Self::with_chests(
            db.clone(),
            config,
            ChestService::new(db.pool.clone(), factory.clone()),
            factory,
            narrator,
        )
    }

    /// Same as [`AppState::new`] but with a caller-built chest service, e.g. one
    /// with scripted rolls.
    pub fn with_chests(
        db: DBService,
        config: &AppConfig,
        chests: ChestService,
        factory: Arc<dyn LootFactory>,
        narrator: Arc<dyn QuestNarrator>,
    ) -> Self {
        let pool = db.pool.clone();
        let cipher = config.cipher.clone();
        Self {
            cipher: cipher.clone(),
            chests: Arc::new(chests),
            crafting: Arc::new(CraftingService::new(pool.clone(), factory)),
            quests: Arc::new(QuestService::new(pool.clone(), narrator)),
            projects: Arc::new(ProjectService::new(pool, cipher)),
            jwt_key: Arc::new(DecodingKey::from_secret(
                config.auth_jwt_secret.expose_secret().as_bytes(),
            )),
            allow_guest_chests: config.allow_guest_chests,
            db,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn cipher(&self) -> &FieldCipher {
        &self.cipher
    }

    pub fn chests(&self) -> &ChestService {
        &self.chests
    }

    pub fn crafting(&self) -> &CraftingService {
        &self.crafting
    }

    pub fn quests(&self) -> &QuestService {
        &self.quests
    }

    pub fn projects(&self) -> &ProjectService {
        &self.projects
    }

    pub fn jwt_key(&self) -> &DecodingKey {
        &self.jwt_key
    }

    pub fn allow_guest_chests(&self) -> bool {
        self.allow_guest_chests
    }
}
