//! Proposal repository.
//!
//! Edit and submit gates call the lifecycle policy with an explicit `now`.
//! The one-submitted-proposal-per-(PI, window) rule is ultimately enforced by
//! the `proposals_one_submitted_per_pi_window` partial unique index; the
//! pre-checks here only exist to give friendly errors on the common path.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::{Proposal, StatusEvent};
use crate::error::{Error, Result};
use crate::lifecycle::{self, ProposalStatus, WindowStatus};
use crate::storage;

/// Investigator-editable fields. Everything else on a proposal row is owned
/// by the workflow.
#[derive(Debug, Clone)]
pub struct ProposalFields {
    pub centre_id: String,
    pub main_area: String,
    pub title: String,
    pub summary: String,
    pub secondary_topics: Vec<String>,
}

impl ProposalFields {
    fn check(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("proposal title must not be empty"));
        }
        Ok(())
    }
}

const FK_MESSAGE: &str = "unknown window, centre, topic, or user reference";

pub async fn create(
    pool: &PgPool,
    now: DateTime<Utc>,
    pi_user_id: &str,
    window_id: &str,
    fields: &ProposalFields,
) -> Result<Proposal> {
    let window = super::windows::get(pool, window_id).await?;
    let window_status = window.effective_status(now);
    if window_status != WindowStatus::Open {
        return Err(Error::WindowNotOpen {
            id: window.id,
            status: window_status,
        });
    }
    fields.check()?;
    if has_submitted(pool, pi_user_id, window_id).await? {
        return Err(Error::DuplicateSubmission);
    }

    let id = storage::generate_id("prp");
    let mut tx = pool.begin().await?;
    let proposal = sqlx::query_as::<_, Proposal>(
        r#"
        INSERT INTO proposals (id, window_id, pi_user_id, centre_id, main_area,
                               title, summary, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(window_id)
    .bind(pi_user_id)
    .bind(&fields.centre_id)
    .bind(&fields.main_area)
    .bind(fields.title.trim())
    .bind(&fields.summary)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| Error::on_fk(e, FK_MESSAGE))?;

    link_topics(&mut tx, &proposal.id, &fields.secondary_topics).await?;
    tx.commit().await?;

    Ok(proposal)
}

/// Fetch a live proposal. Soft-deleted rows are indistinguishable from
/// missing ones.
pub async fn get(pool: &PgPool, id: &str) -> Result<Proposal> {
    sqlx::query_as::<_, Proposal>("SELECT * FROM proposals WHERE id = $1 AND NOT is_deleted")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found("proposal", id))
}

pub async fn list_for_window(pool: &PgPool, window_id: &str) -> Result<Vec<Proposal>> {
    let rows = sqlx::query_as::<_, Proposal>(
        "SELECT * FROM proposals WHERE window_id = $1 AND NOT is_deleted ORDER BY created_at DESC",
    )
    .bind(window_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn list_for_pi(
    pool: &PgPool,
    pi_user_id: &str,
    window_id: Option<&str>,
) -> Result<Vec<Proposal>> {
    let rows = match window_id {
        Some(window_id) => {
            sqlx::query_as::<_, Proposal>(
                "SELECT * FROM proposals
                 WHERE pi_user_id = $1 AND window_id = $2 AND NOT is_deleted
                 ORDER BY created_at DESC",
            )
            .bind(pi_user_id)
            .bind(window_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Proposal>(
                "SELECT * FROM proposals
                 WHERE pi_user_id = $1 AND NOT is_deleted
                 ORDER BY created_at DESC",
            )
            .bind(pi_user_id)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Proposals that have been submitted at least once, for the window export.
pub async fn list_submitted_for_window(pool: &PgPool, window_id: &str) -> Result<Vec<Proposal>> {
    let rows = sqlx::query_as::<_, Proposal>(
        "SELECT * FROM proposals
         WHERE window_id = $1 AND NOT is_deleted AND submitted_at IS NOT NULL
         ORDER BY submitted_at",
    )
    .bind(window_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn secondary_topics(pool: &PgPool, proposal_id: &str) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT topic_id FROM proposal_topics WHERE proposal_id = $1 ORDER BY topic_id",
    )
    .bind(proposal_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn update(
    pool: &PgPool,
    now: DateTime<Utc>,
    id: &str,
    fields: &ProposalFields,
) -> Result<Proposal> {
    let proposal = get(pool, id).await?;
    let window = super::windows::get(pool, &proposal.window_id).await?;
    check_editable(&proposal, &window, now)?;
    fields.check()?;

    let mut tx = pool.begin().await?;
    let updated = sqlx::query_as::<_, Proposal>(
        r#"
        UPDATE proposals
        SET centre_id = $2, main_area = $3, title = $4, summary = $5, updated_at = $6
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&fields.centre_id)
    .bind(&fields.main_area)
    .bind(fields.title.trim())
    .bind(&fields.summary)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| Error::on_fk(e, FK_MESSAGE))?;

    sqlx::query("DELETE FROM proposal_topics WHERE proposal_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    link_topics(&mut tx, id, &fields.secondary_topics).await?;
    tx.commit().await?;

    Ok(updated)
}

/// DRAFT -> SUBMITTED. Concurrent submits by the same PI race on the partial
/// unique index, which surfaces as DuplicateSubmission.
pub async fn submit(pool: &PgPool, now: DateTime<Utc>, id: &str, actor_id: &str) -> Result<Proposal> {
    let proposal = get(pool, id).await?;
    let window = super::windows::get(pool, &proposal.window_id).await?;
    let proposal_status = proposal.status_enum();
    let window_status = window.effective_status(now);
    if !lifecycle::can_submit(proposal_status, window_status) {
        if proposal_status != ProposalStatus::Draft {
            return Err(Error::ProposalLocked {
                id: proposal.id,
                status: proposal_status,
            });
        }
        return Err(Error::WindowNotOpen {
            id: window.id,
            status: window_status,
        });
    }

    let mut tx = pool.begin().await?;
    let submitted = sqlx::query_as::<_, Proposal>(
        r#"
        UPDATE proposals
        SET status = $2, submitted_at = $3, updated_at = $3
        WHERE id = $1 AND status = 'DRAFT'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(ProposalStatus::Submitted.as_str())
    .bind(now)
    .fetch_optional(&mut *tx)
    .await
    .map_err(Error::from_db)?
    // lost a race with another submit of the same proposal
    .ok_or(Error::ProposalLocked {
        id: id.to_string(),
        status: ProposalStatus::Submitted,
    })?;

    record_event(&mut tx, id, actor_id, proposal_status, ProposalStatus::Submitted, now).await?;
    tx.commit().await?;

    Ok(submitted)
}

/// Admin/reviewer status change. Any status is reachable from any other; the
/// audit log is the control, not a transition table. The row is locked for
/// the duration so the logged `from_status` is the state the change actually
/// replaced, even under concurrent changes.
pub async fn update_status(
    pool: &PgPool,
    now: DateTime<Utc>,
    id: &str,
    new_status: ProposalStatus,
    actor_id: &str,
) -> Result<Proposal> {
    let mut tx = pool.begin().await?;
    let proposal = sqlx::query_as::<_, Proposal>(
        "SELECT * FROM proposals WHERE id = $1 AND NOT is_deleted FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::not_found("proposal", id))?;

    let updated = sqlx::query_as::<_, Proposal>(
        "UPDATE proposals SET status = $2, updated_at = $3 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(new_status.as_str())
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(Error::from_db)?;

    record_event(&mut tx, id, actor_id, proposal.status_enum(), new_status, now).await?;
    tx.commit().await?;

    Ok(updated)
}

pub async fn soft_delete(pool: &PgPool, now: DateTime<Utc>, id: &str) -> Result<()> {
    let affected = sqlx::query(
        "UPDATE proposals SET is_deleted = TRUE, updated_at = $2 WHERE id = $1 AND NOT is_deleted",
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(Error::not_found("proposal", id));
    }
    Ok(())
}

pub async fn history(pool: &PgPool, proposal_id: &str) -> Result<Vec<StatusEvent>> {
    let events = sqlx::query_as::<_, StatusEvent>(
        "SELECT * FROM proposal_status_events WHERE proposal_id = $1 ORDER BY changed_at, id",
    )
    .bind(proposal_id)
    .fetch_all(pool)
    .await?;
    Ok(events)
}

fn check_editable(proposal: &Proposal, window: &crate::db::Window, now: DateTime<Utc>) -> Result<()> {
    let proposal_status = proposal.status_enum();
    let window_status = window.effective_status(now);
    if lifecycle::can_edit_proposal(proposal_status, window_status) {
        return Ok(());
    }
    if proposal_status != ProposalStatus::Draft {
        return Err(Error::ProposalLocked {
            id: proposal.id.clone(),
            status: proposal_status,
        });
    }
    Err(Error::WindowNotOpen {
        id: window.id.clone(),
        status: window_status,
    })
}

async fn has_submitted(pool: &PgPool, pi_user_id: &str, window_id: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM proposals
            WHERE pi_user_id = $1 AND window_id = $2
              AND status = 'SUBMITTED' AND NOT is_deleted
        )
        "#,
    )
    .bind(pi_user_id)
    .bind(window_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

async fn link_topics(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    proposal_id: &str,
    topic_ids: &[String],
) -> Result<()> {
    for topic_id in topic_ids {
        sqlx::query(
            "INSERT INTO proposal_topics (proposal_id, topic_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(proposal_id)
        .bind(topic_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| Error::on_fk(e, FK_MESSAGE))?;
    }
    Ok(())
}

async fn record_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    proposal_id: &str,
    actor_id: &str,
    from: ProposalStatus,
    to: ProposalStatus,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO proposal_status_events (proposal_id, actor_id, from_status, to_status, changed_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(proposal_id)
    .bind(actor_id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
