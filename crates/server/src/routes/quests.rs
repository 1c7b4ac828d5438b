use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use db::models::quest::Quest;
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestRequest {
    pub date_key: String,
    pub task: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestListQuery {
    pub date_key: String,
}

/// POST /api/quests
/// Turn a plain task into a quest for the given day
pub async fn create_quest(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateQuestRequest>, ApiError>,
) -> Result<ResponseJson<ApiResponse<Quest>>, ApiError> {
    let quest = state
        .quests()
        .create(user.user_id, &payload.date_key, &payload.task)
        .await?;
    Ok(ResponseJson(ApiResponse::success(quest)))
}

/// GET /api/quests?dateKey=YYYY-MM-DD
pub async fn list_quests(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<QuestListQuery>, ApiError>,
) -> Result<ResponseJson<ApiResponse<Vec<Quest>>>, ApiError> {
    let quests = state.quests().list(user.user_id, &query.date_key).await?;
    Ok(ResponseJson(ApiResponse::success(quests)))
}

/// POST /api/quests/{quest_id}/complete
pub async fn complete_quest(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Path(quest_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<ResponseJson<ApiResponse<Quest>>, ApiError> {
    let quest = state.quests().complete(user.user_id, quest_id).await?;
    Ok(ResponseJson(ApiResponse::success(quest)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quests", post(create_quest).get(list_quests))
        .route("/quests/{quest_id}/complete", post(complete_quest))
}
