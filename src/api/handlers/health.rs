use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub downstream_url: String,
}

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Archive relay API" }))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        downstream_url: state.config.downstream_url.clone(),
    })
}
