use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{delete, post},
};
use axum_extra::extract::WithRejection;
use services::services::{field_cipher::PlainPair, project::ProjectView};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

/// POST /api/projects
/// Fields are encrypted before they reach the database
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(payload), _): WithRejection<Json<PlainPair>, ApiError>,
) -> Result<ResponseJson<ApiResponse<ProjectView>>, ApiError> {
    let project = state
        .projects()
        .create(user.user_id, &payload.title, &payload.action_hint)
        .await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

/// GET /api/projects
pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectView>>>, ApiError> {
    let projects = state.projects().list(user.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

/// DELETE /api/projects/{project_id}
pub async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Path(project_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.projects().delete(user.user_id, project_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project).get(list_projects))
        .route("/projects/{project_id}", delete(delete_project))
}
