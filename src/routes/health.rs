use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use crate::error::Result;
use crate::state::AppState;

pub async fn healthz(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    sqlx::query("SELECT 1").execute(state.pool.as_ref()).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
