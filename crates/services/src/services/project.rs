//! Long-term projects. Title and action hint are encrypted at rest with
//! [`FieldCipher`]; the database only ever holds ciphertext.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::models::project::Project;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::field_cipher::{CipherError, EncryptedPair, FieldCipher};

const MAX_FIELD_CHARS: usize = 2000;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error("invalid project: {0}")]
    Invalid(String),
    #[error("project not found")]
    NotFound,
}

/// A decrypted project. Rows whose ciphertext no longer authenticates under
/// the current key come back with `unreadable` set and no text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub title: Option<String>,
    pub action_hint: Option<String>,
    pub unreadable: bool,
    pub created_at: DateTime<Utc>,
}

pub struct ProjectService {
    pool: SqlitePool,
    cipher: Arc<FieldCipher>,
}

impl ProjectService {
    pub fn new(pool: SqlitePool, cipher: Arc<FieldCipher>) -> Self {
        Self { pool, cipher }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        title: &str,
        action_hint: &str,
    ) -> Result<ProjectView, ProjectError> {
        let title = title.trim();
        let action_hint = action_hint.trim();
        if title.is_empty() {
            return Err(ProjectError::Invalid("title must not be empty".to_string()));
        }
        if title.chars().count() > MAX_FIELD_CHARS || action_hint.chars().count() > MAX_FIELD_CHARS {
            return Err(ProjectError::Invalid(format!(
                "fields are limited to {MAX_FIELD_CHARS} characters"
            )));
        }

        let pair = self.cipher.encrypt_pair(title, action_hint)?;
        let project = Project::create(
            &self.pool,
            user_id,
            &pair.encrypted_title,
            &pair.encrypted_action_hint,
        )
        .await?;

        info!(user_id = %user_id, project_id = %project.id, "Project created");
        Ok(ProjectView {
            id: project.id,
            title: Some(title.to_string()),
            action_hint: Some(action_hint.to_string()),
            unreadable: false,
            created_at: project.created_at,
        })
    }

    /// All of the user's projects, newest first. One undecryptable row does
    /// not hide the others.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<ProjectView>, ProjectError> {
        let projects = Project::find_by_user_id(&self.pool, user_id).await?;
        Ok(projects.into_iter().map(|p| self.view(p)).collect())
    }

    pub async fn delete(&self, user_id: Uuid, project_id: Uuid) -> Result<(), ProjectError> {
        match Project::delete(&self.pool, user_id, project_id).await? {
            0 => Err(ProjectError::NotFound),
            _ => {
                info!(user_id = %user_id, project_id = %project_id, "Project deleted");
                Ok(())
            }
        }
    }

    fn view(&self, project: Project) -> ProjectView {
        let pair = EncryptedPair {
            encrypted_title: project.encrypted_title,
            encrypted_action_hint: project.encrypted_action_hint,
        };
        match self.cipher.decrypt_pair(&pair) {
            Ok(plain) => ProjectView {
                id: project.id,
                title: Some(plain.title),
                action_hint: Some(plain.action_hint),
                unreadable: false,
                created_at: project.created_at,
            },
            Err(e) => {
                warn!(project_id = %project.id, error = %e, "Project fields could not be decrypted");
                ProjectView {
                    id: project.id,
                    title: None,
                    action_hint: None,
                    unreadable: true,
                    created_at: project.created_at,
                }
            }
        }
    }
}
