use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;

use crate::auth::AuthContext;
use crate::db::{self, Window, WindowWithStats};
use crate::error::{Error, Result};
use crate::lifecycle::{WindowBounds, WindowStatus};
use crate::state::AppState;

/// A window as served to clients: the row plus its effective status at the
/// time of the request.
#[derive(Serialize)]
pub struct WindowView {
    #[serde(flatten)]
    pub window: Window,
    pub status: WindowStatus,
}

fn view(window: Window, now: DateTime<Utc>) -> WindowView {
    let status = window.effective_status(now);
    WindowView { window, status }
}

#[derive(Serialize)]
pub struct WindowListItem {
    #[serde(flatten)]
    pub window: WindowWithStats,
    pub status: WindowStatus,
}

#[derive(Deserialize)]
pub struct CreateWindow {
    pub name: String,
    pub submission_open_at: DateTime<Utc>,
    pub submission_close_at: DateTime<Utc>,
    pub review_start_at: DateTime<Utc>,
    pub review_deadline_default: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
}

pub async fn create_window(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Json(payload): Json<CreateWindow>,
) -> Result<(StatusCode, Json<WindowView>)> {
    auth.require_admin()?;
    let bounds = WindowBounds {
        submission_open_at: payload.submission_open_at,
        submission_close_at: payload.submission_close_at,
        review_start_at: payload.review_start_at,
        review_deadline_default: payload.review_deadline_default,
        response_deadline: payload.response_deadline,
    };
    let window =
        db::windows::create(state.pool.as_ref(), &payload.name, &bounds, &auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(view(window, Utc::now()))))
}

#[derive(Deserialize)]
pub struct ListWindowsQuery {
    pub status: Option<String>,
}

pub async fn list_windows(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
    Query(query): Query<ListWindowsQuery>,
) -> Result<Json<Vec<WindowListItem>>> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            WindowStatus::parse(s).ok_or_else(|| Error::validation(format!("unknown status: {s}")))
        })
        .transpose()?;

    let now = Utc::now();
    let rows = db::windows::list(state.pool.as_ref(), now, status).await?;
    let items = rows
        .into_iter()
        .map(|window| {
            let status = window.effective_status(now);
            WindowListItem { window, status }
        })
        .collect();
    Ok(Json(items))
}

pub async fn get_window(
    State(state): State<Arc<AppState>>,
    _auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<WindowView>> {
    let window = db::windows::get(state.pool.as_ref(), &id).await?;
    Ok(Json(view(window, Utc::now())))
}

/// Body for the manual status override. `{"status": "CLOSED"}` pins the
/// window; `{"status": null}` or `{}` clears the pin.
#[derive(Deserialize)]
pub struct StatusOverridePayload {
    pub status: Option<String>,
}

pub async fn update_window_status(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
    Json(payload): Json<StatusOverridePayload>,
) -> Result<Json<WindowView>> {
    auth.require_admin()?;
    let status = payload
        .status
        .as_deref()
        .map(|s| {
            WindowStatus::parse(s).ok_or_else(|| Error::validation(format!("unknown status: {s}")))
        })
        .transpose()?;

    let window = db::windows::set_status_override(state.pool.as_ref(), &id, status).await?;
    tracing::info!(
        "window {} status override set to {:?} by {}",
        id,
        window.status_override,
        auth.user_id
    );
    Ok(Json(view(window, Utc::now())))
}

pub async fn validate_assignments(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Vec<db::Assignment>>> {
    auth.require_admin()?;
    let validated = db::assignments::validate(state.pool.as_ref(), Utc::now(), &id).await?;
    tracing::info!(
        "validated {} assignments on window {} by {}",
        validated.len(),
        id,
        auth.user_id
    );
    crate::notify::dispatch_validated(&state, &id, &validated);
    Ok(Json(validated))
}

/// Bundle every submitted proposal in the window into a zip of PDFs.
pub async fn export_window(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Response> {
    auth.require_admin()?;
    let window = db::windows::get(state.pool.as_ref(), &id).await?;
    let proposals = db::proposals::list_submitted_for_window(state.pool.as_ref(), &id).await?;

    let mut zip_data = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut zip_data));
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);

        for proposal in &proposals {
            let topics = db::proposals::secondary_topics(state.pool.as_ref(), &proposal.id).await?;
            let pdf_path = state
                .config
                .exports_folder
                .join(format!("{}.pdf", proposal.id));
            crate::pdf::render_proposal(proposal, &window, &topics, &pdf_path)
                .map_err(Error::Export)?;
            let content = std::fs::read(&pdf_path)?;
            zip.start_file(format!("{}.pdf", proposal.id), options)
                .map_err(|e| Error::Export(e.to_string()))?;
            zip.write_all(&content)?;
        }

        zip.finish().map_err(|e| Error::Export(e.to_string()))?;
    }

    let download_name = format!("{}_proposals.zip", sanitize_filename(&window.name));
    Ok(Response::builder()
        .header("Content-Type", "application/zip")
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(axum::body::Body::from(zip_data))
        .unwrap())
}

pub(crate) fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
