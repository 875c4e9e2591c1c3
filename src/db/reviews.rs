//! Scored reviews, one per validated assignment. The filing gates live here;
//! who may file (the assignment's reviewer) is checked by the handler.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{Assignment, Review};
use crate::error::{Error, Result};
use crate::lifecycle::{Recommendation, WindowStatus};
use crate::storage;

pub async fn file(
    pool: &PgPool,
    now: DateTime<Utc>,
    assignment: &Assignment,
    score: i32,
    recommendation: Recommendation,
    comments: &str,
) -> Result<Review> {
    if !(0..=100).contains(&score) {
        return Err(Error::validation("score must be between 0 and 100"));
    }
    if assignment.is_draft {
        return Err(Error::ReviewClosed(format!(
            "assignment {} has not been validated",
            assignment.id
        )));
    }

    let proposal = super::proposals::get(pool, &assignment.proposal_id).await?;
    let window = super::windows::get(pool, &proposal.window_id).await?;
    let window_status = window.effective_status(now);
    if window_status != WindowStatus::Review {
        return Err(Error::ReviewClosed(format!(
            "window {} is {window_status}",
            window.id
        )));
    }
    let deadline = assignment.effective_deadline(&window);
    if now > deadline {
        return Err(Error::ReviewClosed(format!(
            "review deadline passed at {deadline}"
        )));
    }

    let id = storage::generate_id("rev");
    sqlx::query_as::<_, Review>(
        r#"
        INSERT INTO reviews (id, assignment_id, score, recommendation, comments, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&assignment.id)
    .bind(score)
    .bind(recommendation.as_str())
    .bind(comments)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::on_unique(e, "review for this assignment"))
}

pub async fn list_for_proposal(pool: &PgPool, proposal_id: &str) -> Result<Vec<Review>> {
    let rows = sqlx::query_as::<_, Review>(
        r#"
        SELECT r.* FROM reviews r
        JOIN assignments a ON a.id = r.assignment_id
        WHERE a.proposal_id = $1
        ORDER BY r.submitted_at
        "#,
    )
    .bind(proposal_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
