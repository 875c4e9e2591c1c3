//! Repository integration tests.
//!
//! All tests require TEST_DATABASE_URL to be set and skip otherwise.
//! Run single-threaded, the suite truncates shared tables:
//!   TEST_DATABASE_URL=postgres://... cargo test --test db_integration -- --test-threads=1
//!
//! Repository functions take `now` as a parameter, so every clock-dependent
//! scenario here is deterministic: the example window runs through January
//! 2025 and the tests pick instants inside each phase.

mod common;

use chrono::{DateTime, Utc};

use ancilla::db::{self, proposals::ProposalFields};
use ancilla::error::Error;
use ancilla::lifecycle::{ProposalStatus, Recommendation, WindowBounds, WindowStatus};

/// Skip the test if TEST_DATABASE_URL is not set.
macro_rules! require_db {
    () => {
        if !common::has_test_db() {
            eprintln!("Skipping: TEST_DATABASE_URL not set");
            return;
        }
    };
}

fn open_now() -> DateTime<Utc> {
    common::at(2025, 1, 15)
}

fn review_now() -> DateTime<Utc> {
    common::at(2025, 2, 10)
}

fn closed_now() -> DateTime<Utc> {
    common::at(2025, 3, 1)
}

fn proposal_fields(seed: &common::Seed) -> ProposalFields {
    ProposalFields {
        centre_id: seed.centre.id.clone(),
        main_area: seed.topic.id.clone(),
        title: "Ancillary biomarker study".to_string(),
        summary: "Assess biomarker drift in the parent cohort.".to_string(),
        secondary_topics: vec![],
    }
}

// --- Windows ---

#[tokio::test]
async fn create_window_rejects_unordered_bounds() {
    require_db!();
    let pool = common::setup_test_db().await;
    let seed = common::seed_directory(pool.as_ref()).await;

    let mut bounds = common::bounds_2025();
    bounds.review_start_at = common::at(2024, 6, 1);
    let err = db::windows::create(pool.as_ref(), "Broken", &bounds, &seed.admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn create_window_rejects_duplicate_name() {
    require_db!();
    let pool = common::setup_test_db().await;
    let seed = common::seed_directory(pool.as_ref()).await;

    db::windows::create(pool.as_ref(), "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let err = db::windows::create(
        pool.as_ref(),
        "January 2025",
        &common::bounds_2025(),
        &seed.admin.id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));
}

#[tokio::test]
async fn status_override_wins_and_clears() {
    require_db!();
    let pool = common::setup_test_db().await;
    let seed = common::seed_directory(pool.as_ref()).await;

    let window = db::windows::create(
        pool.as_ref(),
        "January 2025",
        &common::bounds_2025(),
        &seed.admin.id,
    )
    .await
    .unwrap();
    assert_eq!(window.effective_status(open_now()), WindowStatus::Open);

    let pinned = db::windows::set_status_override(pool.as_ref(), &window.id, Some(WindowStatus::Closed))
        .await
        .unwrap();
    assert_eq!(pinned.effective_status(open_now()), WindowStatus::Closed);

    let cleared = db::windows::set_status_override(pool.as_ref(), &window.id, None)
        .await
        .unwrap();
    assert_eq!(cleared.status_override, None);
    assert_eq!(cleared.effective_status(open_now()), WindowStatus::Open);
}

#[tokio::test]
async fn window_list_filters_on_effective_status() {
    require_db!();
    let pool = common::setup_test_db().await;
    let seed = common::seed_directory(pool.as_ref()).await;

    let january = db::windows::create(
        pool.as_ref(),
        "January 2025",
        &common::bounds_2025(),
        &seed.admin.id,
    )
    .await
    .unwrap();
    let march_bounds = WindowBounds {
        submission_open_at: common::at(2025, 3, 1),
        submission_close_at: common::at(2025, 3, 31),
        review_start_at: common::at(2025, 4, 1),
        review_deadline_default: common::at(2025, 4, 21),
        response_deadline: common::at(2025, 5, 7),
    };
    let march = db::windows::create(pool.as_ref(), "March 2025", &march_bounds, &seed.admin.id)
        .await
        .unwrap();

    let open = db::windows::list(pool.as_ref(), open_now(), Some(WindowStatus::Open))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, january.id);

    let upcoming = db::windows::list(pool.as_ref(), open_now(), Some(WindowStatus::Upcoming))
        .await
        .unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0].id, march.id);

    // newest submission_open_at first
    let all = db::windows::list(pool.as_ref(), open_now(), None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, march.id);
}

#[tokio::test]
async fn window_stats_count_live_proposals_and_assignments() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();

    let submitted = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &submitted.id, &seed.pi.id)
        .await
        .unwrap();
    // second investigator keeps a draft
    db::proposals::create(pool, open_now(), &seed.pi2.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();

    db::assignments::assign(pool, &submitted.id, &seed.reviewer.id, None)
        .await
        .unwrap();
    db::assignments::assign(pool, &submitted.id, &seed.reviewer2.id, None)
        .await
        .unwrap();

    let stats = &db::windows::list(pool, open_now(), None).await.unwrap()[0];
    assert_eq!(stats.proposal_count, 2);
    assert_eq!(stats.draft_assignment_count, 2);
    assert_eq!(stats.validated_assignment_count, 0);
    assert_eq!(stats.reviewer_count, 2);

    db::assignments::validate(pool, open_now(), &window.id).await.unwrap();

    let stats = &db::windows::list(pool, open_now(), None).await.unwrap()[0];
    assert_eq!(stats.draft_assignment_count, 0);
    assert_eq!(stats.validated_assignment_count, 2);
    assert_eq!(stats.reviewer_count, 2);
}

// --- Proposals ---

#[tokio::test]
async fn proposal_creation_requires_open_window() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();

    for now in [common::at(2024, 12, 1), review_now(), closed_now()] {
        let err = db::proposals::create(pool, now, &seed.pi.id, &window.id, &proposal_fields(&seed))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WindowNotOpen { .. }), "at {now}");
    }
}

#[tokio::test]
async fn proposal_creation_links_secondary_topics() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();

    let mut fields = proposal_fields(&seed);
    fields.secondary_topics = vec![seed.topic2.id.clone()];
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &fields)
        .await
        .unwrap();

    assert_eq!(proposal.status_enum(), ProposalStatus::Draft);
    assert_eq!(proposal.submitted_at, None);
    let topics = db::proposals::secondary_topics(pool, &proposal.id).await.unwrap();
    assert_eq!(topics, vec![seed.topic2.id.clone()]);
}

#[tokio::test]
async fn draft_edits_then_submit_then_edit_locks() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();

    // three edits while the draft sits in an open window
    for revision in 1..=3 {
        let mut fields = proposal_fields(&seed);
        fields.title = format!("Ancillary biomarker study, revision {revision}");
        let updated = db::proposals::update(pool, open_now(), &proposal.id, &fields)
            .await
            .unwrap();
        assert_eq!(
            updated.title,
            format!("Ancillary biomarker study, revision {revision}")
        );
    }

    let submitted = db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();
    assert_eq!(submitted.status_enum(), ProposalStatus::Submitted);
    assert_eq!(submitted.submitted_at, Some(open_now()));

    // the fourth edit hits the lock
    let err = db::proposals::update(pool, open_now(), &proposal.id, &proposal_fields(&seed))
        .await
        .unwrap_err();
    match err {
        Error::ProposalLocked { status, .. } => assert_eq!(status, ProposalStatus::Submitted),
        other => panic!("expected ProposalLocked, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_outside_open_window_changes_nothing() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();

    let err = db::proposals::submit(pool, review_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap_err();
    match err {
        Error::WindowNotOpen { status, .. } => assert_eq!(status, WindowStatus::Review),
        other => panic!("expected WindowNotOpen, got {other:?}"),
    }

    let unchanged = db::proposals::get(pool, &proposal.id).await.unwrap();
    assert_eq!(unchanged.status_enum(), ProposalStatus::Draft);
    assert_eq!(unchanged.submitted_at, None);
    assert!(db::proposals::history(pool, &proposal.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn one_submitted_proposal_per_investigator_and_window() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();

    let first = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    let second = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();

    db::proposals::submit(pool, open_now(), &first.id, &seed.pi.id)
        .await
        .unwrap();

    // the partial unique index rejects the second submission
    let err = db::proposals::submit(pool, open_now(), &second.id, &seed.pi.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateSubmission));

    // and creation pre-checks the same rule once a submission exists
    let err = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateSubmission));

    // a different investigator is unaffected
    db::proposals::create(pool, open_now(), &seed.pi2.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
}

#[tokio::test]
async fn soft_delete_frees_the_submitted_slot() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();

    let first = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    let second = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &first.id, &seed.pi.id)
        .await
        .unwrap();

    db::proposals::soft_delete(pool, open_now(), &first.id).await.unwrap();

    // deleted rows vanish from reads, listings, and the duplicate check
    let err = db::proposals::get(pool, &first.id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    let listed = db::proposals::list_for_window(pool, &window.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, second.id);
    let stats = &db::windows::list(pool, open_now(), None).await.unwrap()[0];
    assert_eq!(stats.proposal_count, 1);

    db::proposals::submit(pool, open_now(), &second.id, &seed.pi.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn status_changes_are_audited() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();

    // no transition table: any status is reachable from any other
    let steps = [
        (ProposalStatus::UnderReview, review_now()),
        (ProposalStatus::Rejected, review_now()),
        (ProposalStatus::Accepted, closed_now()),
        (ProposalStatus::Prioritized, closed_now()),
    ];
    for (status, now) in steps {
        let updated = db::proposals::update_status(pool, now, &proposal.id, status, &seed.admin.id)
            .await
            .unwrap();
        assert_eq!(updated.status_enum(), status);
    }

    let events = db::proposals::history(pool, &proposal.id).await.unwrap();
    let transitions: Vec<(&str, &str)> = events
        .iter()
        .map(|e| (e.from_status.as_str(), e.to_status.as_str()))
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("DRAFT", "SUBMITTED"),
            ("SUBMITTED", "UNDER_REVIEW"),
            ("UNDER_REVIEW", "REJECTED"),
            ("REJECTED", "ACCEPTED"),
            ("ACCEPTED", "PRIORITIZED"),
        ]
    );
    assert_eq!(events[0].actor_id, seed.pi.id);
    assert!(events[1..].iter().all(|e| e.actor_id == seed.admin.id));
}

#[tokio::test]
async fn concurrent_status_changes_audit_the_replaced_state() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();

    // the row lock serializes these; neither may log a stale from_status
    let (first, second) = tokio::join!(
        db::proposals::update_status(
            pool,
            review_now(),
            &proposal.id,
            ProposalStatus::UnderReview,
            &seed.admin.id,
        ),
        db::proposals::update_status(
            pool,
            review_now(),
            &proposal.id,
            ProposalStatus::Accepted,
            &seed.admin.id,
        ),
    );
    first.unwrap();
    second.unwrap();

    let events = db::proposals::history(pool, &proposal.id).await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].from_status, "DRAFT");
    for pair in events.windows(2) {
        assert_eq!(
            pair[1].from_status, pair[0].to_status,
            "audit chain broken: {events:?}"
        );
    }
}

// --- Assignments ---

#[tokio::test]
async fn assignment_requires_submitted_proposal_and_reviewer_role() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();

    let err = db::assignments::assign(pool, &proposal.id, &seed.reviewer.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();

    let err = db::assignments::assign(pool, &proposal.id, &seed.pi2.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let assignment = db::assignments::assign(pool, &proposal.id, &seed.reviewer.id, None)
        .await
        .unwrap();
    assert!(assignment.is_draft);
    assert_eq!(assignment.email_sent_at, None);
}

#[tokio::test]
async fn duplicate_assignment_is_rejected() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();

    db::assignments::assign(pool, &proposal.id, &seed.reviewer.id, None)
        .await
        .unwrap();
    let err = db::assignments::assign(pool, &proposal.id, &seed.reviewer.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateAssignment));
}

#[tokio::test]
async fn validate_stamps_once_and_is_idempotent() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();
    let assignment = db::assignments::assign(pool, &proposal.id, &seed.reviewer.id, None)
        .await
        .unwrap();

    let first_pass = db::assignments::validate(pool, open_now(), &window.id).await.unwrap();
    assert_eq!(first_pass.len(), 1);
    assert_eq!(first_pass[0].id, assignment.id);
    assert!(!first_pass[0].is_draft);
    assert_eq!(first_pass[0].email_sent_at, Some(open_now()));

    // second run matches nothing and preserves the stamp
    let second_pass = db::assignments::validate(pool, review_now(), &window.id).await.unwrap();
    assert!(second_pass.is_empty());
    let unchanged = db::assignments::get(pool, &assignment.id).await.unwrap();
    assert_eq!(unchanged.email_sent_at, Some(open_now()));

    // a later assignment is picked up without touching the first
    db::assignments::assign(pool, &proposal.id, &seed.reviewer2.id, None)
        .await
        .unwrap();
    let third_pass = db::assignments::validate(pool, review_now(), &window.id).await.unwrap();
    assert_eq!(third_pass.len(), 1);
    assert_eq!(third_pass[0].reviewer_id, seed.reviewer2.id);
    assert_eq!(third_pass[0].email_sent_at, Some(review_now()));
    let untouched = db::assignments::get(pool, &assignment.id).await.unwrap();
    assert_eq!(untouched.email_sent_at, Some(open_now()));
}

#[tokio::test]
async fn validate_skips_deleted_proposals() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let kept = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &kept.id, &seed.pi.id)
        .await
        .unwrap();
    let withdrawn = db::proposals::create(pool, open_now(), &seed.pi2.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &withdrawn.id, &seed.pi2.id)
        .await
        .unwrap();

    db::assignments::assign(pool, &kept.id, &seed.reviewer.id, None)
        .await
        .unwrap();
    let orphaned = db::assignments::assign(pool, &withdrawn.id, &seed.reviewer2.id, None)
        .await
        .unwrap();

    db::proposals::soft_delete(pool, open_now(), &withdrawn.id).await.unwrap();

    let validated = db::assignments::validate(pool, open_now(), &window.id).await.unwrap();
    assert_eq!(validated.len(), 1);
    assert_eq!(validated[0].proposal_id, kept.id);

    let still_draft = db::assignments::get(pool, &orphaned.id).await.unwrap();
    assert!(still_draft.is_draft);
}

#[tokio::test]
async fn unassign_only_while_draft() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();

    // a draft assignment can simply be removed
    db::assignments::assign(pool, &proposal.id, &seed.reviewer.id, None)
        .await
        .unwrap();
    db::assignments::unassign(pool, &proposal.id, &seed.reviewer.id)
        .await
        .unwrap();
    assert!(db::assignments::list_for_proposal(pool, &proposal.id)
        .await
        .unwrap()
        .is_empty());

    // once validated it is part of the record
    db::assignments::assign(pool, &proposal.id, &seed.reviewer.id, None)
        .await
        .unwrap();
    db::assignments::validate(pool, open_now(), &window.id).await.unwrap();
    let err = db::assignments::unassign(pool, &proposal.id, &seed.reviewer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AssignmentValidated { .. }));

    let err = db::assignments::unassign(pool, &proposal.id, &seed.reviewer2.id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

// --- Reviews ---

#[tokio::test]
async fn review_filing_gates() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();
    let draft_assignment = db::assignments::assign(pool, &proposal.id, &seed.reviewer.id, None)
        .await
        .unwrap();

    // not validated yet
    let err = db::reviews::file(pool, review_now(), &draft_assignment, 80, Recommendation::Accept, "ok")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReviewClosed(_)));

    db::assignments::validate(pool, open_now(), &window.id).await.unwrap();
    let assignment = db::assignments::get(pool, &draft_assignment.id).await.unwrap();

    // window still open for submissions, not reviewing yet
    let err = db::reviews::file(pool, open_now(), &assignment, 80, Recommendation::Accept, "ok")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReviewClosed(_)));

    // window closed after the default deadline
    let err = db::reviews::file(pool, closed_now(), &assignment, 80, Recommendation::Accept, "ok")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReviewClosed(_)));

    // score outside 0..=100
    let err = db::reviews::file(pool, review_now(), &assignment, 150, Recommendation::Accept, "ok")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let review = db::reviews::file(
        pool,
        review_now(),
        &assignment,
        85,
        Recommendation::Accept,
        "Strong fit with the parent cohort.",
    )
    .await
    .unwrap();
    assert_eq!(review.score, 85);
    assert_eq!(review.recommendation, "ACCEPT");

    // one review per assignment
    let err = db::reviews::file(pool, review_now(), &assignment, 60, Recommendation::Revise, "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));

    let listed = db::reviews::list_for_proposal(pool, &proposal.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, review.id);
}

#[tokio::test]
async fn per_assignment_deadline_overrides_window_default() {
    require_db!();
    let pool = common::setup_test_db().await;
    let pool = pool.as_ref();
    let seed = common::seed_directory(pool).await;

    let window = db::windows::create(pool, "January 2025", &common::bounds_2025(), &seed.admin.id)
        .await
        .unwrap();
    let proposal = db::proposals::create(pool, open_now(), &seed.pi.id, &window.id, &proposal_fields(&seed))
        .await
        .unwrap();
    db::proposals::submit(pool, open_now(), &proposal.id, &seed.pi.id)
        .await
        .unwrap();
    db::assignments::assign(
        pool,
        &proposal.id,
        &seed.reviewer.id,
        Some(common::at(2025, 2, 5)),
    )
    .await
    .unwrap();
    let validated = db::assignments::validate(pool, open_now(), &window.id).await.unwrap();
    let assignment = validated.into_iter().next().unwrap();

    // 2025-02-10 is inside the window's REVIEW phase but past this
    // assignment's own deadline
    let err = db::reviews::file(pool, review_now(), &assignment, 70, Recommendation::Revise, "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ReviewClosed(_)));

    db::reviews::file(
        pool,
        common::at(2025, 2, 3),
        &assignment,
        70,
        Recommendation::Revise,
        "Needs a tighter endpoint definition.",
    )
    .await
    .unwrap();
}
