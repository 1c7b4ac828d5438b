use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use db::models::loot_item::{LootItem, Rarity};
use serde::Deserialize;
use services::services::{crafting::CraftResult, reward_engine::RewardState};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CraftRequest {
    pub target_rarity: Rarity,
}

/// GET /api/profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<RewardState>>, ApiError> {
    let reward_state = state.chests().reward_state(user.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(reward_state)))
}

/// GET /api/loot
pub async fn list_loot(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<LootItem>>>, ApiError> {
    let items = LootItem::find_by_user_id(&state.db().pool, user.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(items)))
}

/// GET /api/loot/{item_id}
pub async fn get_loot_item(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Path(item_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<ResponseJson<ApiResponse<LootItem>>, ApiError> {
    let item = LootItem::find_by_id(&state.db().pool, item_id)
        .await?
        .filter(|item| item.user_id == user.user_id)
        .ok_or(ApiError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(item)))
}

/// POST /api/craft
pub async fn craft(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(payload), _): WithRejection<Json<CraftRequest>, ApiError>,
) -> Result<ResponseJson<ApiResponse<CraftResult>>, ApiError> {
    let result = state
        .crafting()
        .craft(user.user_id, payload.target_rarity)
        .await?;
    Ok(ResponseJson(ApiResponse::success(result)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/loot", get(list_loot))
        .route("/loot/{item_id}", get(get_loot_item))
        .route("/craft", post(craft))
}
