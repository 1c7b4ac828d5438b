use axum::{
    Json, Router, extract::State, response::Json as ResponseJson, routing::post,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use services::services::chest::{ChestOpening, validate_date_key};
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct OpenChestRequest {
    pub date_key: String,
}

/// POST /api/open-chest
/// Signed-in users get the full reward roll. Without a token the request falls
/// back to the guest roll when guests are allowed.
pub async fn open_chest(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    WithRejection(Json(payload), _): WithRejection<Json<OpenChestRequest>, ApiError>,
) -> Result<ResponseJson<ApiResponse<ChestOpening>>, ApiError> {
    let opening = match user {
        Some(user) => state.chests().open(user.user_id, &payload.date_key).await?,
        None if state.allow_guest_chests() => {
            validate_date_key(&payload.date_key)?;
            info!(date_key = %payload.date_key, "Opening guest chest");
            state.chests().open_guest().await?
        }
        None => return Err(ApiError::Unauthorized),
    };
    Ok(ResponseJson(ApiResponse::success(opening)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/open-chest", post(open_chest))
}
