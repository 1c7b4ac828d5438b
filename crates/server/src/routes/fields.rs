use axum::{
    Json, Router, extract::State, response::Json as ResponseJson, routing::post,
};
use axum_extra::extract::WithRejection;
use services::services::field_cipher::{EncryptedPair, PlainPair};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

/// POST /api/encrypt-fields
pub async fn encrypt_fields(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<PlainPair>, ApiError>,
) -> Result<ResponseJson<ApiResponse<EncryptedPair>>, ApiError> {
    let pair = state
        .cipher()
        .encrypt_pair(&payload.title, &payload.action_hint)?;
    Ok(ResponseJson(ApiResponse::success(pair)))
}

/// POST /api/decrypt-fields
pub async fn decrypt_fields(
    State(state): State<AppState>,
    WithRejection(Json(payload), _): WithRejection<Json<EncryptedPair>, ApiError>,
) -> Result<ResponseJson<ApiResponse<PlainPair>>, ApiError> {
    let plain = state.cipher().decrypt_pair(&payload)?;
    Ok(ResponseJson(ApiResponse::success(plain)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/encrypt-fields", post(encrypt_fields))
        .route("/decrypt-fields", post(decrypt_fields))
}
