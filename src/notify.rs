//! Assignment notification relay.
//!
//! Validating a window's assignments stamps `email_sent_at`; this module
//! hands each newly validated assignment to the external notification
//! service as a webhook POST. Delivery mechanics (templates, retries,
//! actual email) belong to that service.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::Assignment;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentNotice {
    pub assignment_id: String,
    pub proposal_id: String,
    pub reviewer_id: String,
    pub window_id: String,
    pub deadline_at: Option<DateTime<Utc>>,
}

/// Fire-and-forget: each notice is posted from its own task and failures are
/// logged, never surfaced to the request that triggered the validation.
pub fn dispatch_validated(state: &AppState, window_id: &str, validated: &[Assignment]) {
    let Some(url) = state.config.notify_webhook_url.clone() else {
        tracing::debug!(
            "NOTIFY_WEBHOOK_URL unset; skipping {} assignment notifications",
            validated.len()
        );
        return;
    };

    for assignment in validated {
        let notice = AssignmentNotice {
            assignment_id: assignment.id.clone(),
            proposal_id: assignment.proposal_id.clone(),
            reviewer_id: assignment.reviewer_id.clone(),
            window_id: window_id.to_string(),
            deadline_at: assignment.deadline_at,
        };
        let client = state.http.clone();
        let url = url.clone();
        tokio::spawn(async move {
            let outcome = client
                .post(&url)
                .json(&notice)
                .send()
                .await
                .and_then(|r| r.error_for_status());
            if let Err(e) = outcome {
                tracing::warn!(
                    "assignment notification failed for {}: {}",
                    notice.assignment_id,
                    e
                );
            }
        });
    }
}
