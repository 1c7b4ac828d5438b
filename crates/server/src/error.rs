use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{
    chest::ChestError, crafting::CraftingError, field_cipher::CipherError,
    project::ProjectError, quest::QuestError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Chest(#[from] ChestError),
    #[error(transparent)]
    Crafting(#[from] CraftingError),
    #[error(transparent)]
    Quest(#[from] QuestError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error(transparent)]
    Query(#[from] QueryRejection),
    #[error(transparent)]
    Path(#[from] PathRejection),
    #[error("authentication required")]
    Unauthorized,
    #[error("not found")]
    NotFound,
}

const INTERNAL: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "internal_error");
const GENERATION: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "generation_error");
const VALIDATION: (StatusCode, &str) = (StatusCode::BAD_REQUEST, "validation_error");
const NOT_FOUND: (StatusCode, &str) = (StatusCode::NOT_FOUND, "not_found");

fn cipher_status(err: &CipherError) -> (StatusCode, &'static str) {
    match err {
        CipherError::Configuration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
        CipherError::Decryption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decryption_error"),
        CipherError::Encryption => INTERNAL,
    }
}

impl ApiError {
    pub fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Chest(err) => match err {
                ChestError::InvalidDateKey(_) => VALIDATION,
                ChestError::AlreadyOpened(_) => (StatusCode::CONFLICT, "already_opened"),
                ChestError::Conflict => (StatusCode::CONFLICT, "conflict"),
                ChestError::Generation(_) => GENERATION,
                ChestError::Database(_) => INTERNAL,
            },
            ApiError::Crafting(err) => match err {
                CraftingError::NotCraftable(_) => VALIDATION,
                CraftingError::InsufficientMaterials { .. } => {
                    (StatusCode::CONFLICT, "insufficient_materials")
                }
                CraftingError::Generation(_) => GENERATION,
                CraftingError::Database(_) => INTERNAL,
            },
            ApiError::Quest(err) => match err {
                QuestError::Invalid(_) => VALIDATION,
                QuestError::NotFound => NOT_FOUND,
                QuestError::Generation(_) => GENERATION,
                QuestError::Database(_) => INTERNAL,
            },
            ApiError::Project(err) => match err {
                ProjectError::Invalid(_) => VALIDATION,
                ProjectError::NotFound => NOT_FOUND,
                ProjectError::Cipher(cipher) => cipher_status(cipher),
                ProjectError::Database(_) => INTERNAL,
            },
            ApiError::Cipher(err) => cipher_status(err),
            ApiError::Database(_) => INTERNAL,
            ApiError::Json(_) | ApiError::Query(_) | ApiError::Path(_) => VALIDATION,
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::NotFound => NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            error!(kind, error = %self, "Request failed");
        }
        let body = ApiResponse::<()>::error(kind, self.to_string());
        (status, ResponseJson(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use services::services::{field_cipher::DecryptionFailure, loot_factory::GenerationError};

    use super::*;

    #[test]
    fn maps_domain_errors_to_kinds() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (
                ChestError::AlreadyOpened("2025-06-01".into()).into(),
                StatusCode::CONFLICT,
                "already_opened",
            ),
            (
                ChestError::InvalidDateKey("x".into()).into(),
                StatusCode::BAD_REQUEST,
                "validation_error",
            ),
            (
                CipherError::Decryption(DecryptionFailure::Authentication).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "decryption_error",
            ),
            (
                CipherError::Configuration("ENCRYPTION_KEY").into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
            ),
            (
                CraftingError::Generation(GenerationError::Unusable("empty".into())).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "generation_error",
            ),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized"),
            (QuestError::NotFound.into(), StatusCode::NOT_FOUND, "not_found"),
        ];
        for (err, status, kind) in cases {
            assert_eq!(err.status_and_kind(), (status, kind), "{err}");
        }
    }
}
