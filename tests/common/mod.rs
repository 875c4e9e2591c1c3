//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::PgPool;

use ancilla::auth::Role;
use ancilla::config::Config;
use ancilla::db::{self, Centre, DbPool, Topic, User};
use ancilla::lifecycle::WindowBounds;
use ancilla::state::AppState;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment
/// variable. Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Connect to the test database, apply migrations (idempotent), and wipe all
/// rows so every test starts clean.
pub async fn setup_test_db() -> DbPool {
    let pool = db::create_pool(&test_db_url())
        .await
        .expect("failed to connect to test database");
    db::run_migrations(pool.as_ref())
        .await
        .expect("failed to run migrations");
    truncate_all_tables(pool.as_ref()).await;
    pool
}

pub async fn truncate_all_tables(pool: &PgPool) {
    sqlx::raw_sql(
        "TRUNCATE TABLE reviews, assignments, proposal_status_events,
                        proposal_topics, proposals, windows, users, topics, centres
         CASCADE",
    )
    .execute(pool)
    .await
    .expect("failed to truncate tables");
}

/// Build the application router against the test database. Returns the pool
/// too so tests can seed rows directly.
pub async fn build_test_app() -> (axum::Router, DbPool) {
    let pool = setup_test_db().await;
    let config = Config {
        database_url: test_db_url(),
        exports_folder: std::env::temp_dir().join("ancilla-test-exports"),
        notify_webhook_url: None,
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    ancilla::storage::ensure_dirs(&config.exports_folder).expect("exports dir");
    let state = Arc::new(AppState::new(pool.clone(), config));
    (ancilla::build_router(state), pool)
}

pub struct Seed {
    pub admin: User,
    pub pi: User,
    pub pi2: User,
    pub reviewer: User,
    pub reviewer2: User,
    pub centre: Centre,
    pub topic: Topic,
    pub topic2: Topic,
}

/// Directory rows most scenarios need: an admin, two investigators, two
/// reviewers, a centre, and two topics.
pub async fn seed_directory(pool: &PgPool) -> Seed {
    let centre = db::centres::create(pool, "Centre Hospitalier Nord", "Lille")
        .await
        .unwrap();
    let topic = db::topics::create(pool, "Cardiology").await.unwrap();
    let topic2 = db::topics::create(pool, "Nephrology").await.unwrap();
    let admin = db::users::create(pool, "admin@portal.example", "Ada Admin", Role::Admin, None)
        .await
        .unwrap();
    let pi = db::users::create(
        pool,
        "pi@chu.example",
        "Paula Investigator",
        Role::Investigator,
        Some(&centre.id),
    )
    .await
    .unwrap();
    let pi2 = db::users::create(
        pool,
        "pi2@chu.example",
        "Pierre Investigator",
        Role::Investigator,
        Some(&centre.id),
    )
    .await
    .unwrap();
    let reviewer = db::users::create(
        pool,
        "reviewer@portal.example",
        "Rita Reviewer",
        Role::Reviewer,
        None,
    )
    .await
    .unwrap();
    let reviewer2 = db::users::create(
        pool,
        "reviewer2@portal.example",
        "Remi Reviewer",
        Role::Reviewer,
        None,
    )
    .await
    .unwrap();

    Seed {
        admin,
        pi,
        pi2,
        reviewer,
        reviewer2,
        centre,
        topic,
        topic2,
    }
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// The documented example window: submissions throughout January 2025,
/// reviews due 2025-02-21, responses by 2025-03-07.
pub fn bounds_2025() -> WindowBounds {
    WindowBounds {
        submission_open_at: at(2025, 1, 1),
        submission_close_at: at(2025, 1, 31),
        review_start_at: at(2025, 2, 1),
        review_deadline_default: at(2025, 2, 21),
        response_deadline: at(2025, 3, 7),
    }
}

/// A window that is OPEN at the real wall-clock now, for tests that go
/// through the HTTP layer (handlers stamp their own `now`).
pub fn bounds_open_now() -> WindowBounds {
    let now = Utc::now();
    WindowBounds {
        submission_open_at: now - chrono::Duration::hours(1),
        submission_close_at: now + chrono::Duration::hours(1),
        review_start_at: now + chrono::Duration::hours(2),
        review_deadline_default: now + chrono::Duration::hours(3),
        response_deadline: now + chrono::Duration::hours(4),
    }
}
