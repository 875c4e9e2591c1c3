pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod storage;

use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router. `main` serves it; integration tests drive it
/// directly with `tower::ServiceExt::oneshot`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route(
            "/api/windows",
            post(routes::create_window).get(routes::list_windows),
        )
        .route("/api/windows/:id", get(routes::get_window))
        .route("/api/windows/:id/status", put(routes::update_window_status))
        .route(
            "/api/windows/:id/validate-assignments",
            post(routes::validate_assignments),
        )
        .route("/api/windows/:id/export", get(routes::export_window))
        .route(
            "/api/proposals",
            post(routes::create_proposal).get(routes::list_proposals),
        )
        .route(
            "/api/proposals/:id",
            get(routes::get_proposal)
                .put(routes::update_proposal)
                .delete(routes::delete_proposal),
        )
        .route("/api/proposals/:id/submit", post(routes::submit_proposal))
        .route(
            "/api/proposals/:id/status",
            put(routes::update_proposal_status),
        )
        .route("/api/proposals/:id/history", get(routes::proposal_history))
        .route("/api/proposals/:id/export", get(routes::export_proposal))
        .route(
            "/api/proposals/:id/assignments",
            get(routes::list_proposal_assignments),
        )
        .route(
            "/api/proposals/:id/assignments/:reviewer_id",
            delete(routes::delete_assignment),
        )
        .route(
            "/api/proposals/:id/reviews",
            get(routes::list_proposal_reviews),
        )
        .route("/api/assignments", post(routes::create_assignment))
        .route("/api/assignments/:id/review", post(routes::file_review))
        .route(
            "/api/users",
            post(routes::create_user).get(routes::list_users),
        )
        .route(
            "/api/centres",
            post(routes::create_centre).get(routes::list_centres),
        )
        .route(
            "/api/topics",
            post(routes::create_topic).get(routes::list_topics),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
