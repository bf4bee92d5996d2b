//! Manhole report workflow tests

mod helpers;

use helpers::*;
use wmp_common::api::Actor;
use wmp_common::db::{Addressee, ManholeReportType, ManholeStatus, ServiceType};
use wmp_common::Error;
use wmp_wf::classifier::{ClassifierTask, Verdict};

async fn resolved_count(h: &Harness, company_id: i64) -> i64 {
    h.company(company_id).await.resolved_manholes
}

/// Report in North, assigned to FixCo on creation
async fn assigned_report(h: &Harness) -> i64 {
    h.answer(ClassifierTask::ManholeIssue, Verdict(1));
    h.workflows
        .create_manhole_report(&Actor::user(USER), NORTH, "open", png_image())
        .await
        .unwrap()
        .id
}

async fn resolved_report(h: &Harness) -> i64 {
    let id = assigned_report(h).await;
    h.answer(ClassifierTask::ManholeFixed, Verdict::FIXED);
    h.workflows
        .resolve_manhole_report(&Actor::company(FIX_CO), id, png_image())
        .await
        .unwrap();
    id
}

#[tokio::test]
async fn test_report_assigned_when_area_has_company() {
    let h = Harness::new().await;
    h.answer(ClassifierTask::ManholeIssue, Verdict(2));

    let report = h
        .workflows
        .create_manhole_report(&Actor::user(USER), NORTH, "damaged", png_image())
        .await
        .unwrap();

    assert_eq!(report.status, ManholeStatus::Assigned);
    assert_eq!(report.company_id, Some(FIX_CO));
    assert_eq!(report.report_type, ManholeReportType::Damaged);
    assert!(report.assigned_at.is_some());
    assert_eq!(h.inbox(Addressee::Company(FIX_CO)).await.len(), 1);
}

#[tokio::test]
async fn test_report_pending_without_company_then_admin_assigns() {
    let h = Harness::new().await;
    h.answer(ClassifierTask::ManholeIssue, Verdict(1));

    let report = h
        .workflows
        .create_manhole_report(&Actor::user(USER), SOUTH, "lost", png_image())
        .await
        .unwrap();
    assert_eq!(report.status, ManholeStatus::Pending);
    assert!(report.company_id.is_none());
    assert!(report.assigned_at.is_none());
    assert_eq!(h.count("SELECT COUNT(*) FROM notifications").await, 0);

    // FixCo does not manage South yet
    let refused = h
        .workflows
        .assign_manhole_report(&Actor::admin(1), report.id, FIX_CO)
        .await;
    assert!(matches!(refused, Err(Error::Precondition(_))));

    seed_assignment(&h.pool, SOUTH, FIX_CO, ServiceType::ManholeManagement).await;
    let assigned = h
        .workflows
        .assign_manhole_report(&Actor::admin(1), report.id, FIX_CO)
        .await
        .unwrap();
    assert_eq!(assigned.status, ManholeStatus::Assigned);
    assert_eq!(assigned.company_id, Some(FIX_CO));
    assert!(assigned.assigned_at.is_some());
    assert_eq!(h.inbox(Addressee::Company(FIX_CO)).await.len(), 1);

    let twice = h
        .workflows
        .assign_manhole_report(&Actor::admin(1), report.id, FIX_CO)
        .await;
    assert!(matches!(twice, Err(Error::Precondition(_))));
}

#[tokio::test]
async fn test_no_issue_verdict_rejected() {
    let h = Harness::new().await;
    h.answer(ClassifierTask::ManholeIssue, Verdict::NO_ISSUE);

    let result = h
        .workflows
        .create_manhole_report(&Actor::user(USER), NORTH, "open", png_image())
        .await;

    assert!(matches!(result, Err(Error::Precondition(_))));
    assert_eq!(h.count("SELECT COUNT(*) FROM manhole_reports").await, 0);
    assert_eq!(h.images.stored(), 0);
}

#[tokio::test]
async fn test_invalid_report_type_skips_classifier() {
    let h = Harness::new().await;

    let result = h
        .workflows
        .create_manhole_report(&Actor::user(USER), NORTH, "stolen", png_image())
        .await;

    assert!(matches!(result, Err(Error::Validation(_))));
    assert_eq!(h.classifier.calls(), 0);
}

#[tokio::test]
async fn test_resolution_requires_fixed_verdict() {
    let h = Harness::new().await;
    let id = assigned_report(&h).await;

    for verdict in [Verdict(0), Verdict(2)] {
        h.answer(ClassifierTask::ManholeFixed, verdict);
        let result = h
            .workflows
            .resolve_manhole_report(&Actor::company(FIX_CO), id, png_image())
            .await;
        assert!(matches!(result, Err(Error::Precondition(_))), "verdict {}", verdict);
    }

    let status: String = sqlx::query_scalar("SELECT status FROM manhole_reports WHERE id = ?")
        .bind(id)
        .fetch_one(&h.pool)
        .await
        .unwrap();
    assert_eq!(status, "assigned");
    assert_eq!(resolved_count(&h, FIX_CO).await, 0);
    assert!(h.inbox(Addressee::User(USER)).await.is_empty());
}

#[tokio::test]
async fn test_resolution_updates_report_counter_and_user() {
    let h = Harness::new().await;
    let id = assigned_report(&h).await;

    h.answer(ClassifierTask::ManholeFixed, Verdict::FIXED);
    let report = h
        .workflows
        .resolve_manhole_report(&Actor::company(FIX_CO), id, png_image())
        .await
        .unwrap();

    assert_eq!(report.status, ManholeStatus::Resolved);
    assert!(report.after_image_ref.is_some());
    assert!(report.resolved_at.is_some());
    assert_eq!(resolved_count(&h, FIX_CO).await, 1);
    assert_eq!(h.inbox(Addressee::User(USER)).await.len(), 1);
}

#[tokio::test]
async fn test_only_assigned_company_resolves() {
    let h = Harness::new().await;
    let id = assigned_report(&h).await;

    let result = h
        .workflows
        .resolve_manhole_report(&Actor::company(CLEAN_CO), id, png_image())
        .await;

    assert!(matches!(result, Err(Error::Authorization(_))));
    assert_eq!(h.classifier.calls(), 1);
}

#[tokio::test]
async fn test_confirmation_is_terminal() {
    let h = Harness::new().await;
    let id = resolved_report(&h).await;

    let report = h
        .workflows
        .confirm_manhole_report(&Actor::user(USER), id)
        .await
        .unwrap();
    assert_eq!(report.status, ManholeStatus::Confirmed);
    // creation + confirmation
    assert_eq!(h.inbox(Addressee::Company(FIX_CO)).await.len(), 2);

    for result in [
        h.workflows.confirm_manhole_report(&Actor::user(USER), id).await,
        h.workflows.reject_manhole_resolution(&Actor::user(USER), id).await,
    ] {
        assert!(matches!(result, Err(Error::Precondition(_))));
    }
}

#[tokio::test]
async fn test_rejected_resolution_returns_to_company() {
    let h = Harness::new().await;
    let id = resolved_report(&h).await;

    let report = h
        .workflows
        .reject_manhole_resolution(&Actor::user(USER), id)
        .await
        .unwrap();

    assert_eq!(report.status, ManholeStatus::Assigned);
    assert!(report.after_image_ref.is_none());
    assert!(report.resolved_at.is_none());
    assert_eq!(resolved_count(&h, FIX_CO).await, 1);
    assert!(h
        .inbox(Addressee::Company(FIX_CO))
        .await
        .last()
        .unwrap()
        .contains("rejected"));

    // The company can resolve again
    h.answer(ClassifierTask::ManholeFixed, Verdict::FIXED);
    let report = h
        .workflows
        .resolve_manhole_report(&Actor::company(FIX_CO), id, png_image())
        .await
        .unwrap();
    assert_eq!(report.status, ManholeStatus::Resolved);
    assert_eq!(resolved_count(&h, FIX_CO).await, 2);
}

#[tokio::test]
async fn test_only_reporter_confirms_or_rejects() {
    let h = Harness::new().await;
    let id = resolved_report(&h).await;

    let confirm = h
        .workflows
        .confirm_manhole_report(&Actor::user(OTHER_USER), id)
        .await;
    let reject = h
        .workflows
        .reject_manhole_resolution(&Actor::company(FIX_CO), id)
        .await;

    assert!(matches!(confirm, Err(Error::Authorization(_))));
    assert!(matches!(reject, Err(Error::Authorization(_))));
}
