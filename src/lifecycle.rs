//! Pure lifecycle policy for submission windows and proposals.
//!
//! Every function here is total over explicit inputs: `now` is always a
//! parameter, never read from a clock or cached process-wide. Both the
//! repositories and the HTTP handlers consume these predicates, so the
//! time-boundary rules live in exactly one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

/// Where a submission window sits in its life. Ordered: a window only ever
/// moves forward through these as time passes (manual overrides excepted).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowStatus {
    Upcoming,
    Open,
    Review,
    Closed,
}

impl WindowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "UPCOMING",
            Self::Open => "OPEN",
            Self::Review => "REVIEW",
            Self::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPCOMING" => Some(Self::Upcoming),
            "OPEN" => Some(Self::Open),
            "REVIEW" => Some(Self::Review),
            "CLOSED" => Some(Self::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proposal workflow status. The enum is the only constraint on admin and
/// reviewer status changes; there is deliberately no transition whitelist
/// beyond it (every change is audited instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Draft,
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
    Prioritized,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Prioritized => "PRIORITIZED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "SUBMITTED" => Some(Self::Submitted),
            "UNDER_REVIEW" => Some(Self::UnderReview),
            "ACCEPTED" => Some(Self::Accepted),
            "REJECTED" => Some(Self::Rejected),
            "PRIORITIZED" => Some(Self::Prioritized),
            _ => None,
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer verdict on a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Accept,
    Revise,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "ACCEPT",
            Self::Revise => "REVISE",
            Self::Reject => "REJECT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACCEPT" => Some(Self::Accept),
            "REVISE" => Some(Self::Revise),
            "REJECT" => Some(Self::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five boundary timestamps of a submission window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub submission_open_at: DateTime<Utc>,
    pub submission_close_at: DateTime<Utc>,
    pub review_start_at: DateTime<Utc>,
    pub review_deadline_default: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
}

/// Check the strict ordering invariant:
/// open < close < review start < review deadline < response deadline.
pub fn validate_bounds(bounds: &WindowBounds) -> Result<(), Error> {
    let pairs = [
        (
            bounds.submission_open_at,
            bounds.submission_close_at,
            "submission_open_at must precede submission_close_at",
        ),
        (
            bounds.submission_close_at,
            bounds.review_start_at,
            "submission_close_at must precede review_start_at",
        ),
        (
            bounds.review_start_at,
            bounds.review_deadline_default,
            "review_start_at must precede review_deadline_default",
        ),
        (
            bounds.review_deadline_default,
            bounds.response_deadline,
            "review_deadline_default must precede response_deadline",
        ),
    ];
    for (earlier, later, message) in pairs {
        if earlier >= later {
            return Err(Error::Validation(message.to_string()));
        }
    }
    Ok(())
}

/// Derive a window's status from the clock. Total and monotonic: for fixed
/// bounds, advancing `now` never moves the status backwards.
///
/// Submissions closing is what opens the review phase; `review_start_at`
/// participates only in the ordering invariant, not in derivation.
pub fn derive_window_status(now: DateTime<Utc>, bounds: &WindowBounds) -> WindowStatus {
    if now < bounds.submission_open_at {
        WindowStatus::Upcoming
    } else if now < bounds.submission_close_at {
        WindowStatus::Open
    } else if now < bounds.review_deadline_default {
        WindowStatus::Review
    } else {
        WindowStatus::Closed
    }
}

/// Status a window presents to callers: an administrator override wins,
/// otherwise the status is derived from `now`.
pub fn effective_window_status(
    now: DateTime<Utc>,
    status_override: Option<WindowStatus>,
    bounds: &WindowBounds,
) -> WindowStatus {
    status_override.unwrap_or_else(|| derive_window_status(now, bounds))
}

/// A proposal's fields may change only while it is a draft inside an open
/// window.
pub fn can_edit_proposal(proposal: ProposalStatus, window: WindowStatus) -> bool {
    proposal == ProposalStatus::Draft && window == WindowStatus::Open
}

/// Submission is gated by the same predicate as editing.
pub fn can_submit(proposal: ProposalStatus, window: WindowStatus) -> bool {
    can_edit_proposal(proposal, window)
}
