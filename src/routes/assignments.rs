use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::AuthContext;
use crate::db::{self, Assignment};
use crate::error::Result;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateAssignment {
    pub proposal_id: String,
    pub reviewer_id: String,
    pub deadline_at: Option<DateTime<Utc>>,
}

pub async fn create_assignment(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateAssignment>,
) -> Result<(StatusCode, Json<Assignment>)> {
    auth.require_admin()?;
    let assignment = db::assignments::assign(
        state.pool.as_ref(),
        &payload.proposal_id,
        &payload.reviewer_id,
        payload.deadline_at,
    )
    .await?;
    tracing::info!(
        "reviewer {} assigned to proposal {} by {}",
        payload.reviewer_id,
        payload.proposal_id,
        auth.user_id
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn list_proposal_assignments(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Vec<Assignment>>> {
    auth.require_admin()?;
    let pool = state.pool.as_ref();
    db::proposals::get(pool, &id).await?;
    let rows = db::assignments::list_for_proposal(pool, &id).await?;
    Ok(Json(rows))
}

pub async fn delete_assignment(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path((id, reviewer_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    auth.require_admin()?;
    db::assignments::unassign(state.pool.as_ref(), &id, &reviewer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
