use std::sync::Arc;

use axum::{body::Body, http::{Request, StatusCode}};
use tokio::time::{timeout, Duration};
use tower::ServiceExt;
use uuid::Uuid;

use notification_cell::*;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn event_for(recipient_id: Uuid) -> NotificationEvent {
    NotificationEvent::new(
        recipient_id,
        NotificationType::AppointmentRequested,
        "New appointment request",
        "A patient requested a consultation",
        Uuid::new_v4(),
    )
}

#[tokio::test]
async fn test_hub_starts_without_channels() {
    let hub = RecipientBroadcastHub::default();
    assert_eq!(hub.channel_count().await, 0);
}

#[tokio::test]
async fn test_event_reaches_only_its_recipient() {
    let hub = RecipientBroadcastHub::new(16);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let mut alice_rx = hub.subscribe(alice).await;
    let mut bob_rx = hub.subscribe(bob).await;

    let event = event_for(alice);
    let delivered = hub.publish(&event).await.unwrap();
    assert_eq!(delivered, 1);

    let payload = timeout(Duration::from_secs(1), alice_rx.recv())
        .await
        .expect("alice should receive")
        .unwrap();
    let received: NotificationEvent = serde_json::from_str(&payload).unwrap();
    assert_eq!(received, event);

    assert!(bob_rx.try_recv().is_err(), "bob must not see alice's notification");
}

#[tokio::test]
async fn test_publish_without_subscriber_is_not_an_error() {
    let hub = RecipientBroadcastHub::new(4);
    let delivered = hub.publish(&event_for(Uuid::new_v4())).await.unwrap();
    assert_eq!(delivered, 0);
}

#[tokio::test]
async fn test_clones_share_channels_and_idle_channels_are_pruned() {
    let hub = RecipientBroadcastHub::new(4);
    let clone = hub.clone();
    let recipient = Uuid::new_v4();

    let receiver = hub.subscribe(recipient).await;
    assert_eq!(clone.channel_count().await, 1);
    assert_eq!(clone.prune_idle_channels().await, 0);

    drop(receiver);
    assert_eq!(clone.prune_idle_channels().await, 1);
    assert_eq!(hub.channel_count().await, 0);
}

#[tokio::test]
async fn test_cleanup_task_drops_channels_of_closed_streams() {
    let hub = RecipientBroadcastHub::new(4);
    let cleanup = hub.spawn_cleanup(Duration::from_millis(10));

    let listening = hub.subscribe(Uuid::new_v4()).await;
    for _ in 0..50 {
        drop(hub.subscribe(Uuid::new_v4()).await);
    }

    timeout(Duration::from_secs(2), async {
        while hub.channel_count().await > 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("idle channels should be pruned by the cleanup task");

    assert_eq!(hub.channel_count().await, 1);
    drop(listening);
    cleanup.abort();
}

#[tokio::test]
async fn test_stream_route_requires_authentication() {
    let config = TestConfig::default();
    let app = notification_routes(
        config.to_arc(),
        RecipientBroadcastHub::default(),
        Arc::new(InMemoryNotificationStore::new()),
    );

    let response = app
        .oneshot(Request::builder().uri("/stream").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stream_route_opens_event_stream_for_caller() {
    let config = TestConfig::default();
    let user = TestUser::patient("p@example.com");
    let hub = RecipientBroadcastHub::default();
    let app = notification_routes(
        config.to_arc(),
        hub.clone(),
        Arc::new(InMemoryNotificationStore::new()),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stream")
                .header("Authorization", JwtTestUtils::bearer(&user, &config))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(hub.channel_count().await, 1);
}
