//! Reviewer assignment repository. Assignments start as drafts invisible to
//! reviewers; validating a window flips every draft on it in one statement
//! and stamps `email_sent_at` exactly once.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::auth::Role;
use crate::db::Assignment;
use crate::error::{Error, Result};
use crate::lifecycle::ProposalStatus;
use crate::storage;

pub async fn assign(
    pool: &PgPool,
    proposal_id: &str,
    reviewer_id: &str,
    deadline_at: Option<DateTime<Utc>>,
) -> Result<Assignment> {
    let proposal = super::proposals::get(pool, proposal_id).await?;
    if proposal.status_enum() == ProposalStatus::Draft {
        return Err(Error::validation(
            "draft proposals cannot have reviewers assigned",
        ));
    }
    let reviewer = super::users::get(pool, reviewer_id).await?;
    if reviewer.role != Role::Reviewer.as_str() {
        return Err(Error::validation(format!(
            "user {reviewer_id} does not hold the reviewer role"
        )));
    }

    let id = storage::generate_id("asg");
    sqlx::query_as::<_, Assignment>(
        r#"
        INSERT INTO assignments (id, proposal_id, reviewer_id, deadline_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(proposal_id)
    .bind(reviewer_id)
    .bind(deadline_at)
    .fetch_one(pool)
    .await
    .map_err(Error::from_db)
}

pub async fn get(pool: &PgPool, id: &str) -> Result<Assignment> {
    sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("assignment", id))
}

pub async fn list_for_proposal(pool: &PgPool, proposal_id: &str) -> Result<Vec<Assignment>> {
    let rows = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE proposal_id = $1 ORDER BY created_at",
    )
    .bind(proposal_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Flip every draft assignment on the window's live proposals to validated.
/// `email_sent_at` is stamped only where it was never set, so re-running is
/// a no-op. Returns the rows flipped by this call.
pub async fn validate(pool: &PgPool, now: DateTime<Utc>, window_id: &str) -> Result<Vec<Assignment>> {
    super::windows::get(pool, window_id).await?;

    let validated = sqlx::query_as::<_, Assignment>(
        r#"
        UPDATE assignments a
        SET is_draft = FALSE,
            email_sent_at = COALESCE(a.email_sent_at, $2)
        FROM proposals p
        WHERE a.proposal_id = p.id
          AND p.window_id = $1
          AND NOT p.is_deleted
          AND a.is_draft
        RETURNING a.*
        "#,
    )
    .bind(window_id)
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(validated)
}

/// Remove a draft assignment. Validated assignments are part of the record
/// and can no longer be withdrawn here.
pub async fn unassign(pool: &PgPool, proposal_id: &str, reviewer_id: &str) -> Result<()> {
    let assignment = sqlx::query_as::<_, Assignment>(
        "SELECT * FROM assignments WHERE proposal_id = $1 AND reviewer_id = $2",
    )
    .bind(proposal_id)
    .bind(reviewer_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::not_found("assignment", format!("{proposal_id}/{reviewer_id}")))?;

    if !assignment.is_draft {
        return Err(Error::AssignmentValidated { id: assignment.id });
    }

    // a concurrent validate may land between the read and the delete
    let affected = sqlx::query("DELETE FROM assignments WHERE id = $1 AND is_draft")
        .bind(&assignment.id)
        .execute(pool)
        .await?
        .rows_affected();
    if affected == 0 {
        return Err(Error::AssignmentValidated { id: assignment.id });
    }
    Ok(())
}
