use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use appointment_cell::models::{AppointmentKind, AppointmentValidationRules, BookAppointmentRequest};
use appointment_cell::{AppointmentService, InMemoryAppointmentStore};
use notification_cell::NotificationDispatcher;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};
use video_conferencing_cell::router::session_routes;
use video_conferencing_cell::services::{InMemoryRoomStore, LocalTokenProvider, SessionRoomCoordinator};

struct TestApp {
    router: Router,
    appointments: Arc<AppointmentService>,
    config: TestConfig,
    patient: TestUser,
    practitioner: TestUser,
}

fn test_app() -> TestApp {
    let config = TestConfig::default();
    let appointments = Arc::new(AppointmentService::new(
        Arc::new(InMemoryAppointmentStore::new()),
        NotificationDispatcher::noop(),
        AppointmentValidationRules::default(),
    ));
    let coordinator = Arc::new(SessionRoomCoordinator::new(
        Arc::new(InMemoryRoomStore::new()),
        appointments.clone(),
        Arc::new(LocalTokenProvider::new(config.to_app_config().room_token_secret).unwrap()),
        NotificationDispatcher::noop(),
    ));

    TestApp {
        router: session_routes(config.to_arc(), coordinator),
        appointments,
        config,
        patient: TestUser::patient("patient@example.com"),
        practitioner: TestUser::practitioner("dr.x@example.com"),
    }
}

async fn send(app: &TestApp, method: Method, uri: &str, user: Option<&TestUser>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("Authorization", JwtTestUtils::bearer(user, &app.config));
    }

    let body = match body {
        Some(value) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn video_appointment(app: &TestApp, confirm: bool) -> Uuid {
    let booked = app
        .appointments
        .book(
            app.patient.uuid(),
            BookAppointmentRequest {
                practitioner_id: app.practitioner.uuid(),
                scheduled_at: Utc::now() + Duration::days(1),
                kind: AppointmentKind::VideoConsultation,
                duration_minutes: None,
                reason: None,
                location: None,
                case_ref: None,
            },
        )
        .await
        .unwrap();

    if confirm {
        app.appointments.confirm(app.practitioner.uuid(), booked.id).await.unwrap();
    }
    booked.id
}

#[tokio::test]
async fn test_health_is_public() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["provider"], "local");
}

#[tokio::test]
async fn test_join_requires_token() {
    let app = test_app();

    let (status, _) = send(&app, Method::POST, "/", None, Some(json!({"appointment_id": Uuid::new_v4()}))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_join_start_and_end_over_http() {
    let app = test_app();
    let appointment_id = video_appointment(&app, true).await;

    let (status, joined) = send(
        &app,
        Method::POST,
        "/",
        Some(&app.patient),
        Some(json!({"appointment_id": appointment_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(joined["room_token"].as_str().is_some_and(|t| !t.is_empty()));
    let room_id = joined["room_id"].as_str().unwrap().to_string();
    assert_eq!(joined["room"]["status"], "created");

    let (_, again) = send(
        &app,
        Method::POST,
        "/",
        Some(&app.practitioner),
        Some(json!({"appointment_id": appointment_id})),
    )
    .await;
    assert_eq!(again["room_id"], joined["room_id"]);

    let uri = format!("/{}", room_id);
    let (status, active) = send(&app, Method::PATCH, &uri, Some(&app.practitioner), Some(json!({"status": "ACTIVE"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["status"], "active");

    let (status, ended) = send(&app, Method::PATCH, &uri, Some(&app.patient), Some(json!({"status": "ENDED"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["status"], "ended");
    assert!(ended["duration_seconds"].as_i64().is_some_and(|d| d >= 0));

    let (status, _) = send(&app, Method::PATCH, &uri, Some(&app.patient), Some(json!({"status": "ACTIVE"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, fetched) = send(&app, Method::GET, &format!("/?room_id={}", room_id), Some(&app.practitioner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "ended");
}

#[tokio::test]
async fn test_unconfirmed_appointment_is_conflict() {
    let app = test_app();
    let appointment_id = video_appointment(&app, false).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/",
        Some(&app.patient),
        Some(json!({"appointment_id": appointment_id})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_stranger_is_forbidden_and_unknown_room_not_found() {
    let app = test_app();
    let appointment_id = video_appointment(&app, true).await;
    let stranger = TestUser::patient("stranger@example.com");

    let (status, _) = send(
        &app,
        Method::POST,
        "/",
        Some(&stranger),
        Some(json!({"appointment_id": appointment_id})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/?appointment_id={}", appointment_id),
        Some(&stranger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/{}", Uuid::new_v4()),
        Some(&app.patient),
        Some(json!({"status": "ENDED"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
