//! Submission window repository. Windows are never deleted; once created
//! they only gain proposals, and their status is either derived from the
//! clock or pinned by an administrator override.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{Window, WindowWithStats};
use crate::error::{Error, Result};
use crate::lifecycle::{self, WindowBounds, WindowStatus};
use crate::storage;

pub async fn create(
    pool: &PgPool,
    name: &str,
    bounds: &WindowBounds,
    created_by: &str,
) -> Result<Window> {
    if name.trim().is_empty() {
        return Err(Error::validation("window name must not be empty"));
    }
    lifecycle::validate_bounds(bounds)?;

    let id = storage::generate_id("win");
    let window = sqlx::query_as::<_, Window>(
        r#"
        INSERT INTO windows (id, name, submission_open_at, submission_close_at,
                             review_start_at, review_deadline_default,
                             response_deadline, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(name.trim())
    .bind(bounds.submission_open_at)
    .bind(bounds.submission_close_at)
    .bind(bounds.review_start_at)
    .bind(bounds.review_deadline_default)
    .bind(bounds.response_deadline)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::on_unique(e, "window name"))?;

    Ok(window)
}

pub async fn get(pool: &PgPool, id: &str) -> Result<Window> {
    sqlx::query_as::<_, Window>("SELECT * FROM windows WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("window", id))
}

/// All windows with their proposal/assignment counts, newest first. The
/// status filter applies to the effective status at `now`, so it has to run
/// after the rows come back.
pub async fn list(
    pool: &PgPool,
    now: DateTime<Utc>,
    status: Option<WindowStatus>,
) -> Result<Vec<WindowWithStats>> {
    let rows = sqlx::query_as::<_, WindowWithStats>(
        r#"
        SELECT w.*,
               COUNT(DISTINCT p.id) FILTER (WHERE NOT p.is_deleted) AS proposal_count,
               COUNT(DISTINCT a.id) FILTER (WHERE a.is_draft AND NOT p.is_deleted) AS draft_assignment_count,
               COUNT(DISTINCT a.id) FILTER (WHERE NOT a.is_draft AND NOT p.is_deleted) AS validated_assignment_count,
               COUNT(DISTINCT a.reviewer_id) FILTER (WHERE NOT p.is_deleted) AS reviewer_count
        FROM windows w
        LEFT JOIN proposals p ON p.window_id = w.id
        LEFT JOIN assignments a ON a.proposal_id = p.id
        GROUP BY w.id
        ORDER BY w.submission_open_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(match status {
        Some(wanted) => rows
            .into_iter()
            .filter(|w| w.effective_status(now) == wanted)
            .collect(),
        None => rows,
    })
}

/// Pin the window to a status, or clear the pin (`None`) so the status is
/// derived from the clock again.
pub async fn set_status_override(
    pool: &PgPool,
    id: &str,
    status: Option<WindowStatus>,
) -> Result<Window> {
    sqlx::query_as::<_, Window>(
        "UPDATE windows SET status_override = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.map(|s| s.as_str()))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::not_found("window", id))
}
