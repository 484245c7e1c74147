use axum::{response::IntoResponse, Json};

use crate::error::ApiResponse;

/// Liveness probe. Unauthenticated.
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::success(serde_json::json!({
        "status": "ok",
        "service": "notifly",
    })))
}
