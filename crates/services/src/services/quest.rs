//! Daily quests. These rows are stored in plaintext.

use std::sync::Arc;

use db::models::quest::{CreateQuest, Quest};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::{
    chest::validate_date_key,
    loot_factory::GenerationError,
    quest_narrator::QuestNarrator,
};

const MAX_TASK_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum QuestError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("invalid quest: {0}")]
    Invalid(String),
    #[error("quest not found")]
    NotFound,
}

pub struct QuestService {
    pool: SqlitePool,
    narrator: Arc<dyn QuestNarrator>,
}

fn check_date_key(date_key: &str) -> Result<(), QuestError> {
    validate_date_key(date_key)
        .map(|_| ())
        .map_err(|e| QuestError::Invalid(e.to_string()))
}

impl QuestService {
    pub fn new(pool: SqlitePool, narrator: Arc<dyn QuestNarrator>) -> Self {
        Self { pool, narrator }
    }

    pub async fn create(&self, user_id: Uuid, date_key: &str, task: &str) -> Result<Quest, QuestError> {
        check_date_key(date_key)?;
        let task = task.trim();
        if task.is_empty() {
            return Err(QuestError::Invalid("task must not be empty".to_string()));
        }
        if task.chars().count() > MAX_TASK_CHARS {
            return Err(QuestError::Invalid(format!(
                "task longer than {MAX_TASK_CHARS} characters"
            )));
        }

        let narrated = self.narrator.narrate(task).await?;
        let quest = Quest::create(
            &self.pool,
            user_id,
            &CreateQuest {
                date_key: date_key.to_string(),
                original_task: task.to_string(),
                title: narrated.title,
                action_hint: narrated.action_hint,
            },
        )
        .await?;

        info!(user_id = %user_id, quest_id = %quest.id, date_key, "Quest created");
        Ok(quest)
    }

    pub async fn list(&self, user_id: Uuid, date_key: &str) -> Result<Vec<Quest>, QuestError> {
        check_date_key(date_key)?;
        Ok(Quest::find_by_user_and_date(&self.pool, user_id, date_key).await?)
    }

    pub async fn complete(&self, user_id: Uuid, quest_id: Uuid) -> Result<Quest, QuestError> {
        Quest::complete(&self.pool, user_id, quest_id)
            .await?
            .ok_or(QuestError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use db::DBService;

    use super::*;
    use crate::services::quest_narrator::NarratedQuest;

    struct EchoNarrator;

    #[async_trait]
    impl QuestNarrator for EchoNarrator {
        async fn narrate(&self, task: &str) -> Result<NarratedQuest, GenerationError> {
            Ok(NarratedQuest {
                title: format!("The Quest of {task}"),
                action_hint: "Begin.".to_string(),
            })
        }
    }

    async fn service() -> QuestService {
        let db = DBService::new_in_memory().await.unwrap();
        QuestService::new(db.pool, Arc::new(EchoNarrator))
    }

    #[tokio::test]
    async fn create_list_complete() {
        let service = service().await;
        let user_id = Uuid::new_v4();

        let quest = service.create(user_id, "2025-06-01", "  laundry ").await.unwrap();
        assert_eq!(quest.title, "The Quest of laundry");
        assert_eq!(quest.original_task, "laundry");
        assert!(!quest.completed);

        service.create(user_id, "2025-06-02", "dishes").await.unwrap();
        let listed = service.list(user_id, "2025-06-01").await.unwrap();
        assert_eq!(listed.len(), 1);

        let done = service.complete(user_id, quest.id).await.unwrap();
        assert!(done.completed);
        let first_completed_at = done.completed_at.unwrap();

        // completing again keeps the first timestamp
        let again = service.complete(user_id, quest.id).await.unwrap();
        assert_eq!(again.completed_at, Some(first_completed_at));
    }

    #[tokio::test]
    async fn other_users_cannot_complete() {
        let service = service().await;
        let quest = service.create(Uuid::new_v4(), "2025-06-01", "read").await.unwrap();
        assert!(matches!(
            service.complete(Uuid::new_v4(), quest.id).await,
            Err(QuestError::NotFound)
        ));
    }

    #[tokio::test]
    async fn rejects_blank_tasks_and_bad_dates() {
        let service = service().await;
        let user_id = Uuid::new_v4();
        assert!(matches!(
            service.create(user_id, "2025-06-01", "   ").await,
            Err(QuestError::Invalid(_))
        ));
        assert!(matches!(
            service.create(user_id, "June 1st", "run").await,
            Err(QuestError::Invalid(_))
        ));
        assert!(matches!(
            service.list(user_id, "2025/06/01").await,
            Err(QuestError::Invalid(_))
        ));
    }
}
