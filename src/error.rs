//! Error taxonomy and its HTTP mapping.
//!
//! Validation failures are 400, missing rows are 404, and every conflict
//! (duplicate rows, operations against the wrong lifecycle state) is 409
//! with the current state named in the message. Conflicts are never retried;
//! callers re-read and decide.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::lifecycle::{ProposalStatus, WindowStatus};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("a submitted proposal already exists for this investigator in this window")]
    DuplicateSubmission,

    #[error("reviewer is already assigned to this proposal")]
    DuplicateAssignment,

    #[error("{what} already exists")]
    AlreadyExists { what: &'static str },

    #[error("window {id} is not open for submissions (currently {status})")]
    WindowNotOpen { id: String, status: WindowStatus },

    #[error("proposal {id} can no longer be edited (currently {status})")]
    ProposalLocked { id: String, status: ProposalStatus },

    #[error("assignment {id} is already validated")]
    AssignmentValidated { id: String },

    #[error("review cannot be filed: {0}")]
    ReviewClosed(String),

    #[error("missing or malformed identity: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            id: id.into(),
        }
    }

    /// Conversion for statements that can trip one of the named unique
    /// constraints. The database is the sole arbiter of those races, so the
    /// conflict is recognised here rather than pre-checked under a lock.
    pub fn from_db(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if let Some(conflict) = conflict_for_constraint(db.constraint().unwrap_or("")) {
                return conflict;
            }
        }
        Self::Database(err)
    }

    /// Conversion for inserts whose only expected failure is a plain unique
    /// column (names, emails, one review per assignment).
    pub fn on_unique(err: sqlx::Error, what: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::AlreadyExists { what }
            }
            _ => Self::Database(err),
        }
    }

    /// Caller-supplied ids that point nowhere surface as foreign key
    /// violations; report them as bad input rather than a server fault.
    pub fn on_fk(err: sqlx::Error, msg: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::Validation(msg.to_string())
            }
            _ => Self::Database(err),
        }
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            Self::DuplicateSubmission
            | Self::DuplicateAssignment
            | Self::AlreadyExists { .. } => (StatusCode::CONFLICT, "conflict"),
            Self::WindowNotOpen { .. }
            | Self::ProposalLocked { .. }
            | Self::AssignmentValidated { .. }
            | Self::ReviewClosed(_) => (StatusCode::CONFLICT, "state"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::Export(_) | Self::Database(_) | Self::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

fn conflict_for_constraint(name: &str) -> Option<Error> {
    match name {
        "proposals_one_submitted_per_pi_window" => Some(Error::DuplicateSubmission),
        "assignments_proposal_reviewer_key" => Some(Error::DuplicateAssignment),
        _ => None,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        let body = Json(json!({ "error": self.to_string(), "kind": kind }));
        (status, body).into_response()
    }
}
