use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{AuthContext, Role};
use crate::db::{self, Review};
use crate::error::{Error, Result};
use crate::lifecycle::Recommendation;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FileReview {
    pub score: i32,
    pub recommendation: String,
    #[serde(default)]
    pub comments: String,
}

pub async fn file_review(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(payload): Json<FileReview>,
) -> Result<(StatusCode, Json<Review>)> {
    auth.require_role(Role::Reviewer)?;
    let pool = state.pool.as_ref();
    let assignment = db::assignments::get(pool, &id).await?;
    if assignment.reviewer_id != auth.user_id {
        return Err(Error::Forbidden(
            "reviews may only be filed by the assigned reviewer".into(),
        ));
    }
    let recommendation = Recommendation::parse(&payload.recommendation).ok_or_else(|| {
        Error::validation(format!("unknown recommendation: {}", payload.recommendation))
    })?;
    let review = db::reviews::file(
        pool,
        Utc::now(),
        &assignment,
        payload.score,
        recommendation,
        &payload.comments,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_proposal_reviews(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    auth.require_admin()?;
    let pool = state.pool.as_ref();
    db::proposals::get(pool, &id).await?;
    let rows = db::reviews::list_for_proposal(pool, &id).await?;
    Ok(Json(rows))
}
