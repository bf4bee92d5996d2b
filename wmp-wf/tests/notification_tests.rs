//! Notification inbox tests

mod helpers;

use helpers::*;
use wmp_common::api::Actor;
use wmp_common::Error;
use wmp_wf::classifier::{ClassifierTask, Verdict};

/// Two notifications for CleanCo, one for user 1
async fn populated() -> Harness {
    let h = Harness::new().await;
    h.answer(ClassifierTask::Cleanliness, Verdict::UNCLEAN);
    h.answer(ClassifierTask::Cleanliness, Verdict::UNCLEAN);
    for _ in 0..2 {
        h.workflows
            .create_missed_pickup(&Actor::user(USER), NORTH, png_image())
            .await
            .unwrap();
    }

    let id = h
        .workflows
        .create_conversion(&Actor::user(USER), 10)
        .await
        .unwrap()
        .id;
    h.workflows.approve_conversion(&Actor::admin(1), id).await.unwrap();
    h
}

#[tokio::test]
async fn test_inbox_is_per_addressee_newest_first() {
    let h = populated().await;

    let company = h
        .workflows
        .list_notifications(&Actor::company(CLEAN_CO))
        .await
        .unwrap();
    assert_eq!(company.len(), 2);
    assert!(company[0].id > company[1].id);
    assert!(company.iter().all(|n| !n.is_read));

    let user = h.workflows.list_notifications(&Actor::user(USER)).await.unwrap();
    assert_eq!(user.len(), 1);
    assert!(user[0].content.contains("approved"));

    let empty = h
        .workflows
        .list_notifications(&Actor::company(FIX_CO))
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_mark_read_checks_addressee() {
    let h = populated().await;
    let company = h
        .workflows
        .list_notifications(&Actor::company(CLEAN_CO))
        .await
        .unwrap();
    let target = company[0].id;

    let foreign = h
        .workflows
        .mark_notification_read(&Actor::user(USER), target)
        .await;
    assert!(matches!(foreign, Err(Error::NotFound(_))));

    let read = h
        .workflows
        .mark_notification_read(&Actor::company(CLEAN_CO), target)
        .await
        .unwrap();
    assert!(read.is_read);

    // Marking again is harmless
    h.workflows
        .mark_notification_read(&Actor::company(CLEAN_CO), target)
        .await
        .unwrap();

    assert_eq!(
        h.count("SELECT COUNT(*) FROM notifications WHERE is_read = 1").await,
        1
    );
}

#[tokio::test]
async fn test_admin_has_no_inbox() {
    let h = populated().await;

    let result = h.workflows.list_notifications(&Actor::admin(1)).await;
    assert!(matches!(result, Err(Error::Authorization(_))));
}
