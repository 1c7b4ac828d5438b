//! Rewrites a plain daily task as an RPG quest.

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    claude_api::{ClaudeApiClient, ClaudeApiError},
    loot_factory::GenerationError,
};

const MAX_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NarratedQuest {
    pub title: String,
    #[serde(alias = "actionHint")]
    pub action_hint: String,
}

impl NarratedQuest {
    pub fn sanitized(self) -> Result<Self, GenerationError> {
        let title: String = self.title.trim().chars().take(MAX_TITLE_CHARS).collect();
        if title.is_empty() {
            return Err(GenerationError::Unusable("empty quest title".to_string()));
        }
        Ok(Self {
            title,
            action_hint: self.action_hint.trim().to_string(),
        })
    }
}

#[async_trait]
pub trait QuestNarrator: Send + Sync {
    async fn narrate(&self, task: &str) -> Result<NarratedQuest, GenerationError>;
}

const QUEST_SYSTEM_PROMPT: &str = "Rewrite the user's task as a short RPG quest. Reply with JSON only: \
{\"title\": string, \"action_hint\": one concrete first step}.";

#[derive(Debug, Clone)]
pub struct ClaudeQuestNarrator {
    claude: Option<ClaudeApiClient>,
}

impl ClaudeQuestNarrator {
    pub fn new(claude: Option<ClaudeApiClient>) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl QuestNarrator for ClaudeQuestNarrator {
    async fn narrate(&self, task: &str) -> Result<NarratedQuest, GenerationError> {
        let claude = self
            .claude
            .as_ref()
            .ok_or_else(|| GenerationError::Unavailable(ClaudeApiError::MissingApiKey.to_string()))?;

        let reply: NarratedQuest = claude
            .ask_json(task, Some(QUEST_SYSTEM_PROMPT), 512)
            .await?;
        reply.sanitized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_hint_and_trims_title() {
        let quest = NarratedQuest {
            title: "  The Inbox Hydra  ".to_string(),
            action_hint: " Archive ten emails ".to_string(),
        }
        .sanitized()
        .unwrap();
        assert_eq!(quest.title, "The Inbox Hydra");
        assert_eq!(quest.action_hint, "Archive ten emails");
    }

    #[test]
    fn blank_title_is_unusable() {
        let result = NarratedQuest {
            title: "\n".to_string(),
            action_hint: "anything".to_string(),
        }
        .sanitized();
        assert!(matches!(result, Err(GenerationError::Unusable(_))));
    }

    #[test]
    fn reply_accepts_camel_case_hint() {
        let quest: NarratedQuest =
            serde_json::from_str(r#"{"title": "Dish Dungeon", "actionHint": "Fill the sink"}"#)
                .unwrap();
        assert_eq!(quest.action_hint, "Fill the sink");
    }
}
