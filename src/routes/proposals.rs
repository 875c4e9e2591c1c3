use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{AuthContext, Role};
use crate::db::{self, Proposal, StatusEvent};
use crate::db::proposals::ProposalFields;
use crate::error::{Error, Result};
use crate::lifecycle::ProposalStatus;
use crate::state::AppState;

use super::windows::sanitize_filename;

#[derive(Serialize)]
pub struct ProposalDetail {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub secondary_topics: Vec<String>,
}

#[derive(Deserialize)]
pub struct CreateProposal {
    pub window_id: String,
    pub centre_id: String,
    pub main_area: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub secondary_topics: Vec<String>,
}

pub async fn create_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateProposal>,
) -> Result<(StatusCode, Json<Proposal>)> {
    auth.require_role(Role::Investigator)?;
    let CreateProposal {
        window_id,
        centre_id,
        main_area,
        title,
        summary,
        secondary_topics,
    } = payload;
    let fields = ProposalFields {
        centre_id,
        main_area,
        title,
        summary,
        secondary_topics,
    };
    let proposal = db::proposals::create(
        state.pool.as_ref(),
        Utc::now(),
        &auth.user_id,
        &window_id,
        &fields,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

#[derive(Deserialize)]
pub struct ListProposalsQuery {
    pub window: Option<String>,
}

/// Investigators see their own proposals; admins and reviewers page through
/// a window.
pub async fn list_proposals(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Query(query): Query<ListProposalsQuery>,
) -> Result<Json<Vec<Proposal>>> {
    let pool = state.pool.as_ref();
    let rows = match auth.role {
        Role::Investigator => {
            db::proposals::list_for_pi(pool, &auth.user_id, query.window.as_deref()).await?
        }
        Role::Admin | Role::Reviewer => {
            let window_id = query
                .window
                .as_deref()
                .ok_or_else(|| Error::validation("window query parameter is required"))?;
            db::proposals::list_for_window(pool, window_id).await?
        }
    };
    Ok(Json(rows))
}

pub async fn get_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<ProposalDetail>> {
    let pool = state.pool.as_ref();
    let proposal = db::proposals::get(pool, &id).await?;
    ensure_can_view(pool, &auth, &proposal).await?;
    let secondary_topics = db::proposals::secondary_topics(pool, &id).await?;
    Ok(Json(ProposalDetail {
        proposal,
        secondary_topics,
    }))
}

#[derive(Deserialize)]
pub struct UpdateProposal {
    pub centre_id: String,
    pub main_area: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub secondary_topics: Vec<String>,
}

pub async fn update_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProposal>,
) -> Result<Json<Proposal>> {
    let pool = state.pool.as_ref();
    let proposal = db::proposals::get(pool, &id).await?;
    if proposal.pi_user_id != auth.user_id {
        return Err(Error::Forbidden(
            "only the owning investigator may edit a proposal".into(),
        ));
    }
    let fields = ProposalFields {
        centre_id: payload.centre_id,
        main_area: payload.main_area,
        title: payload.title,
        summary: payload.summary,
        secondary_topics: payload.secondary_topics,
    };
    let updated = db::proposals::update(pool, Utc::now(), &id, &fields).await?;
    Ok(Json(updated))
}

pub async fn submit_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Proposal>> {
    let pool = state.pool.as_ref();
    let proposal = db::proposals::get(pool, &id).await?;
    if proposal.pi_user_id != auth.user_id {
        return Err(Error::Forbidden(
            "only the owning investigator may submit a proposal".into(),
        ));
    }
    let submitted = db::proposals::submit(pool, Utc::now(), &id, &auth.user_id).await?;
    tracing::info!("proposal {} submitted by {}", id, auth.user_id);
    Ok(Json(submitted))
}

#[derive(Deserialize)]
pub struct UpdateProposalStatus {
    pub status: String,
}

pub async fn update_proposal_status(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProposalStatus>,
) -> Result<Json<Proposal>> {
    if auth.role == Role::Investigator {
        return Err(Error::Forbidden(
            "administrator or reviewer role required".into(),
        ));
    }
    let status = ProposalStatus::parse(&payload.status)
        .ok_or_else(|| Error::validation(format!("unknown status: {}", payload.status)))?;
    let updated =
        db::proposals::update_status(state.pool.as_ref(), Utc::now(), &id, status, &auth.user_id)
            .await?;
    tracing::info!(
        "proposal {} moved to {} by {}",
        id,
        status,
        auth.user_id
    );
    Ok(Json(updated))
}

pub async fn delete_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let pool = state.pool.as_ref();
    let proposal = db::proposals::get(pool, &id).await?;
    // admins may withdraw at any stage; the owning PI only while drafting
    if !auth.is_admin() {
        if proposal.pi_user_id != auth.user_id {
            return Err(Error::Forbidden(
                "only the owning investigator or an administrator may delete a proposal".into(),
            ));
        }
        let status = proposal.status_enum();
        if status != ProposalStatus::Draft {
            return Err(Error::ProposalLocked {
                id: proposal.id,
                status,
            });
        }
    }
    db::proposals::soft_delete(pool, Utc::now(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn proposal_history(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusEvent>>> {
    auth.require_admin()?;
    let pool = state.pool.as_ref();
    db::proposals::get(pool, &id).await?;
    let events = db::proposals::history(pool, &id).await?;
    Ok(Json(events))
}

/// Render the proposal as a PDF attachment. Drafts have nothing to export.
pub async fn export_proposal(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Response> {
    let pool = state.pool.as_ref();
    let proposal = db::proposals::get(pool, &id).await?;
    if !auth.is_admin() && proposal.pi_user_id != auth.user_id {
        return Err(Error::Forbidden(
            "only the owning investigator or an administrator may export a proposal".into(),
        ));
    }
    if proposal.submitted_at.is_none() {
        return Err(Error::validation("draft proposals cannot be exported"));
    }

    let window = db::windows::get(pool, &proposal.window_id).await?;
    let topics = db::proposals::secondary_topics(pool, &id).await?;
    let pdf_path = state
        .config
        .exports_folder
        .join(format!("{}.pdf", proposal.id));
    crate::pdf::render_proposal(&proposal, &window, &topics, &pdf_path).map_err(Error::Export)?;
    let content = std::fs::read(&pdf_path)?;

    let download_name = format!("{}.pdf", sanitize_filename(&proposal.title));
    Ok(Response::builder()
        .header("Content-Type", "application/pdf")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(axum::body::Body::from(content))
        .unwrap())
}

async fn ensure_can_view(
    pool: &sqlx::PgPool,
    auth: &AuthContext,
    proposal: &Proposal,
) -> Result<()> {
    if auth.is_admin() || proposal.pi_user_id == auth.user_id {
        return Ok(());
    }
    if auth.role == Role::Reviewer {
        let assignments = db::assignments::list_for_proposal(pool, &proposal.id).await?;
        // draft assignments have not been communicated yet
        if assignments
            .iter()
            .any(|a| a.reviewer_id == auth.user_id && !a.is_draft)
        {
            return Ok(());
        }
    }
    Err(Error::Forbidden(
        "proposal is visible to its investigator, administrators, and assigned reviewers".into(),
    ))
}
