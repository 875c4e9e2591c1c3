use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::lifecycle::{self, ProposalStatus, WindowBounds, WindowStatus};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Window {
    pub id: String,
    pub name: String,
    pub submission_open_at: DateTime<Utc>,
    pub submission_close_at: DateTime<Utc>,
    pub review_start_at: DateTime<Utc>,
    pub review_deadline_default: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
    pub status_override: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Window {
    pub fn bounds(&self) -> WindowBounds {
        WindowBounds {
            submission_open_at: self.submission_open_at,
            submission_close_at: self.submission_close_at,
            review_start_at: self.review_start_at,
            review_deadline_default: self.review_deadline_default,
            response_deadline: self.response_deadline,
        }
    }

    pub fn effective_status(&self, now: DateTime<Utc>) -> WindowStatus {
        let overridden = self
            .status_override
            .as_deref()
            .and_then(WindowStatus::parse);
        lifecycle::effective_window_status(now, overridden, &self.bounds())
    }
}

/// One row of the window listing: the window plus aggregate counts over its
/// non-deleted proposals.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WindowWithStats {
    pub id: String,
    pub name: String,
    pub submission_open_at: DateTime<Utc>,
    pub submission_close_at: DateTime<Utc>,
    pub review_start_at: DateTime<Utc>,
    pub review_deadline_default: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
    pub status_override: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub proposal_count: i64,
    pub draft_assignment_count: i64,
    pub validated_assignment_count: i64,
    pub reviewer_count: i64,
}

impl WindowWithStats {
    pub fn effective_status(&self, now: DateTime<Utc>) -> WindowStatus {
        let bounds = WindowBounds {
            submission_open_at: self.submission_open_at,
            submission_close_at: self.submission_close_at,
            review_start_at: self.review_start_at,
            review_deadline_default: self.review_deadline_default,
            response_deadline: self.response_deadline,
        };
        let overridden = self
            .status_override
            .as_deref()
            .and_then(WindowStatus::parse);
        lifecycle::effective_window_status(now, overridden, &bounds)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Proposal {
    pub id: String,
    pub window_id: String,
    pub pi_user_id: String,
    pub centre_id: String,
    pub main_area: String,
    pub title: String,
    pub summary: String,
    pub status: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Rows only ever hold strings this crate wrote. An unknown string locks
    /// the proposal rather than unlocking it.
    pub fn status_enum(&self) -> ProposalStatus {
        ProposalStatus::parse(&self.status).unwrap_or(ProposalStatus::Submitted)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusEvent {
    pub id: i64,
    pub proposal_id: String,
    pub actor_id: String,
    pub from_status: String,
    pub to_status: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub proposal_id: String,
    pub reviewer_id: String,
    pub is_draft: bool,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    /// Deadline a review must beat: the per-assignment override when set,
    /// otherwise the window default.
    pub fn effective_deadline(&self, window: &Window) -> DateTime<Utc> {
        self.deadline_at.unwrap_or(window.review_deadline_default)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub id: String,
    pub assignment_id: String,
    pub score: i32,
    pub recommendation: String,
    pub comments: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub centre_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Centre {
    pub id: String,
    pub name: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
