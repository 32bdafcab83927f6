// rest_api/src/handlers/system.rs

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use models::views::DashboardStats;
use security::permissions;

use crate::auth::AuthUser;
use crate::errors::ApiResult;
use crate::state::AppState;

// Handler for the /api/v1/health endpoint
pub async fn health_check_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let engine = state.services.store.get_type();
    (StatusCode::OK, Json(json!({ "status": "ok", "message": "REST API is healthy", "storage": engine })))
}

// Handler for the /api/v1/version endpoint
pub async fn version_handler() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "version": env!("CARGO_PKG_VERSION"), "api_level": 1 })))
}

pub async fn dashboard_stats(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<DashboardStats>> {
    user.require(&state, permissions::DASHBOARD_READ)?;
    Ok(Json(state.services.query.dashboard_stats().await?))
}
