use axum::{Router, response::Json as ResponseJson, routing::get};
use serde::Serialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::AppState;

#[derive(Debug, Serialize, TS)]
pub struct HealthStatus {
    pub status: String,
}

/// GET /api/health
pub async fn health() -> ResponseJson<ApiResponse<HealthStatus>> {
    ResponseJson(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
