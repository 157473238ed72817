//! Notification pipeline and read-surface tests.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use common::*;
use coursepay::settlement::settle_transaction;

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A referred settlement notifies both sides: the referee's confirmation and
/// the referrer's reward.
#[tokio::test]
async fn test_referred_settlement_notifies_both_parties() {
    let (state, gateway) = create_test_app_state();
    let (referrer, referee, reference);
    {
        let conn = state.db.get().unwrap();
        referrer = create_test_user(&conn, "referrer@example.com");
        referee = create_test_user(&conn, "referee@example.com");
        queries::create_referral_relationship(&conn, &referee.id, &referrer.id).unwrap();
        let course = create_test_course(&conn, "Course C1", 5000);
        reference = create_test_transaction(&conn, &referee, &course);
    }
    gateway.script_success(&reference, 5000);

    settle_transaction(&state, &reference).await.unwrap();

    let referee_rows = wait_for_notifications(&state.db, &referee.id, 1).await;
    assert_eq!(referee_rows.len(), 1);
    assert_eq!(referee_rows[0].kind, NotificationKind::EnrollmentConfirmed);

    let referrer_rows = wait_for_notifications(&state.db, &referrer.id, 1).await;
    assert_eq!(referrer_rows.len(), 1);
    assert_eq!(referrer_rows[0].kind, NotificationKind::RewardCredited);

    let payload: serde_json::Value = serde_json::from_str(&referrer_rows[0].payload).unwrap();
    assert_eq!(payload["referee_id"].as_str().unwrap(), referee.id);
    assert_eq!(payload["amount_cents"], 500);
}

/// Settlement replay does not duplicate notifications.
#[tokio::test]
async fn test_replay_does_not_duplicate_notifications() {
    let (state, gateway) = create_test_app_state();
    let (user, reference);
    {
        let conn = state.db.get().unwrap();
        user = create_test_user(&conn, "buyer@example.com");
        let course = create_test_course(&conn, "Course C1", 5000);
        reference = create_test_transaction(&conn, &user, &course);
    }
    gateway.script_success(&reference, 5000);

    settle_transaction(&state, &reference).await.unwrap();
    settle_transaction(&state, &reference).await.unwrap();
    settle_transaction(&state, &reference).await.unwrap();

    let rows = wait_for_notifications(&state.db, &user.id, 1).await;
    // Give the worker a moment to surface any stray duplicates
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let conn = state.db.get().unwrap();
    let rows_after = queries::list_notifications(&conn, &user.id, 50, 0).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows_after.len(), 1);
}

#[tokio::test]
async fn test_list_endpoint_paginates() {
    let (state, _gateway) = create_test_app_state();
    let user;
    {
        let conn = state.db.get().unwrap();
        user = create_test_user(&conn, "buyer@example.com");
        for i in 0..5 {
            queries::create_notification(
                &conn,
                &user.id,
                NotificationKind::EnrollmentConfirmed,
                &format!("{{\"n\":{}}}", i),
            )
            .unwrap();
        }
    }
    let app = test_app(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/notifications/{}?limit=2&offset=0", user.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total"], 5);
    assert_eq!(body["limit"], 2);

    // Newest first
    let first: serde_json::Value =
        serde_json::from_str(body["items"][0]["payload"].as_str().unwrap()).unwrap();
    assert_eq!(first["n"], 4);
}

#[tokio::test]
async fn test_mark_read_endpoint() {
    let (state, _gateway) = create_test_app_state();
    let notification;
    {
        let conn = state.db.get().unwrap();
        let user = create_test_user(&conn, "buyer@example.com");
        notification = queries::create_notification(
            &conn,
            &user.id,
            NotificationKind::EnrollmentConfirmed,
            "{}",
        )
        .unwrap();
    }
    let app = test_app(state.clone());

    let mark_read = |id: String| {
        let app = app.clone();
        async move {
            app.oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/notifications/{}/read", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
        }
    };

    let response = mark_read(notification.id.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["updated"], true);

    {
        let conn = state.db.get().unwrap();
        let rows = queries::list_notifications(&conn, &notification.user_id, 10, 0).unwrap();
        assert!(rows[0].read_at.is_some());
    }

    // Marking again is a no-op, not an error
    let response = mark_read(notification.id.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["updated"], false);

    // Unknown IDs 404
    let response = mark_read("cp_ntf_00000000000000000000000000000000".to_string()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_unknown_user_is_not_found() {
    let (state, _gateway) = create_test_app_state();
    let app = test_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/notifications/cp_usr_00000000000000000000000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
