//! Themed loot synthesis for a given rarity tier.

use async_trait::async_trait;
use db::models::loot_item::{CreateLootItem, Rarity};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::claude_api::{ClaudeApiClient, ClaudeApiError};

const MAX_NAME_CHARS: usize = 80;
const MAX_FLAVOR_CHARS: usize = 400;

/// Text generation failed or produced something unusable.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("text generation unavailable: {0}")]
    Unavailable(String),
    #[error("claude api error: {0}")]
    ClaudeApi(#[from] ClaudeApiError),
    #[error("generated content unusable: {0}")]
    Unusable(String),
}

/// Name, flavour text and icon for a freshly rolled item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForgedLoot {
    pub name: String,
    pub flavor_text: String,
    pub icon: String,
}

impl ForgedLoot {
    /// Trim and bound the generated fields, rejecting empty ones.
    pub fn sanitized(self) -> Result<Self, GenerationError> {
        let name = clip(self.name.trim(), MAX_NAME_CHARS);
        let flavor_text = clip(self.flavor_text.trim(), MAX_FLAVOR_CHARS);
        let icon = self.icon.trim().to_string();

        if name.is_empty() {
            return Err(GenerationError::Unusable("empty item name".to_string()));
        }
        if icon.is_empty() {
            return Err(GenerationError::Unusable("empty item icon".to_string()));
        }

        Ok(Self {
            name,
            flavor_text,
            icon,
        })
    }

    pub fn into_create(self, rarity: Rarity) -> CreateLootItem {
        CreateLootItem {
            rarity,
            name: self.name,
            flavor_text: self.flavor_text,
            icon: self.icon,
        }
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[async_trait]
pub trait LootFactory: Send + Sync {
    async fn forge(&self, rarity: Rarity) -> Result<ForgedLoot, GenerationError>;
}

#[derive(Debug, Deserialize)]
struct LootReply {
    name: String,
    #[serde(alias = "description", alias = "flavorText")]
    flavor_text: String,
    #[serde(alias = "emoji")]
    icon: String,
}

const LOOT_SYSTEM_PROMPT: &str = "You invent small fantasy RPG items. Reply with JSON only: \
{\"name\": string, \"flavor_text\": one sentence, \"icon\": a single emoji}.";

/// Loot generation backed by Claude. Built without an API key it fails every
/// call with [`GenerationError::Unavailable`].
#[derive(Debug, Clone)]
pub struct ClaudeLootFactory {
    claude: Option<ClaudeApiClient>,
}

impl ClaudeLootFactory {
    pub fn new(claude: Option<ClaudeApiClient>) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl LootFactory for ClaudeLootFactory {
    async fn forge(&self, rarity: Rarity) -> Result<ForgedLoot, GenerationError> {
        let claude = self
            .claude
            .as_ref()
            .ok_or_else(|| GenerationError::Unavailable(ClaudeApiError::MissingApiKey.to_string()))?;

        let prompt = format!("Create one {rarity} item.");
        let reply: LootReply = claude
            .ask_json(&prompt, Some(LOOT_SYSTEM_PROMPT), 512)
            .await?;
        debug!(%rarity, name = %reply.name, "Forged loot");

        ForgedLoot {
            name: reply.name,
            flavor_text: reply.flavor_text,
            icon: reply.icon,
        }
        .sanitized()
    }
}
