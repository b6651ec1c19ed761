use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, DurationRound, Utc};
use uuid::Uuid;

use appointment_cell::models::*;
use appointment_cell::services::*;
use notification_cell::{NotificationDispatcher, NotificationType, RecordingBroadcastChannel};

struct Fixture {
    store: Arc<InMemoryAppointmentStore>,
    channel: RecordingBroadcastChannel,
    service: AppointmentService,
    patient: Uuid,
    practitioner: Uuid,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let channel = RecordingBroadcastChannel::new();
    let service = AppointmentService::new(
        store.clone(),
        NotificationDispatcher::new(Arc::new(channel.clone())),
        AppointmentValidationRules::default(),
    );

    Fixture {
        store,
        channel,
        service,
        patient: Uuid::new_v4(),
        practitioner: Uuid::new_v4(),
    }
}

fn tomorrow_at(hour: u32) -> chrono::DateTime<Utc> {
    let day = (Utc::now() + Duration::days(1))
        .duration_trunc(Duration::days(1))
        .unwrap();
    day + Duration::hours(hour as i64)
}

fn video_request(practitioner_id: Uuid, at: chrono::DateTime<Utc>) -> BookAppointmentRequest {
    BookAppointmentRequest {
        practitioner_id,
        scheduled_at: at,
        kind: AppointmentKind::VideoConsultation,
        duration_minutes: None,
        reason: Some("Follow-up on lesion".to_string()),
        location: None,
        case_ref: Some(Uuid::new_v4()),
    }
}

#[tokio::test]
async fn test_book_starts_requested_and_notifies_practitioner() {
    let f = fixture();

    let appointment = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();

    assert_eq!(appointment.status, AppointmentStatus::Requested);
    assert_eq!(appointment.patient_id, f.patient);
    assert_eq!(appointment.duration_minutes, 30);

    let events = f.channel.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].recipient_id, f.practitioner);
    assert_eq!(events[0].notification_type, NotificationType::AppointmentRequested);
    assert_eq!(events[0].related_entity_id, appointment.id);
}

#[tokio::test]
async fn test_book_rejects_past_and_present_times() {
    let f = fixture();

    let err = f
        .service
        .book(f.patient, video_request(f.practitioner, Utc::now() - Duration::minutes(5)))
        .await
        .unwrap_err();

    assert_matches!(err, AppointmentError::ValidationError(_));
    assert_eq!(f.store.len().await, 0);
    assert!(f.channel.events().is_empty());
}

#[tokio::test]
async fn test_book_validates_duration_and_parties() {
    let f = fixture();

    let mut too_long = video_request(f.practitioner, tomorrow_at(9));
    too_long.duration_minutes = Some(600);
    assert_matches!(
        f.service.book(f.patient, too_long).await,
        Err(AppointmentError::ValidationError(_))
    );

    let with_self = video_request(f.patient, tomorrow_at(9));
    assert_matches!(
        f.service.book(f.patient, with_self).await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn test_concurrent_bookings_for_same_slot_yield_one_conflict() {
    let f = fixture();
    let at = tomorrow_at(11);
    let other_patient = Uuid::new_v4();

    let (first, second) = futures::future::join(
        f.service.book(f.patient, video_request(f.practitioner, at)),
        f.service.book(other_patient, video_request(f.practitioner, at)),
    )
    .await;

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|r| matches!(r, Err(AppointmentError::Conflict(_))))
            .count(),
        1
    );
    assert_eq!(f.store.active_at(f.practitioner, at).await.len(), 1);
}

#[tokio::test]
async fn test_only_practitioner_confirms_and_patient_is_notified() {
    let f = fixture();
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();

    assert_matches!(
        f.service.confirm(f.patient, booked.id).await,
        Err(AppointmentError::Unauthorized(_))
    );

    let confirmed = f.service.confirm(f.practitioner, booked.id).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let to_patient = f.channel.events_for(f.patient);
    assert_eq!(to_patient.len(), 1);
    assert_eq!(to_patient[0].notification_type, NotificationType::AppointmentConfirmed);
}

#[tokio::test]
async fn test_strangers_cannot_read_or_mutate() {
    let f = fixture();
    let stranger = Uuid::new_v4();
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();

    assert_matches!(f.service.get(stranger, booked.id).await, Err(AppointmentError::Unauthorized(_)));
    assert_matches!(f.service.cancel(stranger, booked.id).await, Err(AppointmentError::Unauthorized(_)));
    assert_matches!(f.service.confirm(stranger, booked.id).await, Err(AppointmentError::Unauthorized(_)));

    let (unchanged, role) = f.service.get(f.patient, booked.id).await.unwrap();
    assert_eq!(unchanged.status, AppointmentStatus::Requested);
    assert_eq!(role, ParticipantRole::Patient);
}

#[tokio::test]
async fn test_cancel_releases_slot_and_notifies_other_party() {
    let f = fixture();
    let at = tomorrow_at(14);
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, at))
        .await
        .unwrap();

    let canceled = f.service.cancel(f.practitioner, booked.id).await.unwrap();
    assert_eq!(canceled.status, AppointmentStatus::Canceled);

    let to_patient = f.channel.events_for(f.patient);
    assert_eq!(to_patient.len(), 1);
    assert_eq!(to_patient[0].notification_type, NotificationType::AppointmentCanceled);

    // The slot is free again.
    f.service
        .book(Uuid::new_v4(), video_request(f.practitioner, at))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cancel_on_completed_is_invalid_transition() {
    let f = fixture();
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();
    f.service.confirm(f.practitioner, booked.id).await.unwrap();
    f.service.complete(f.practitioner, booked.id).await.unwrap();

    let err = f.service.cancel(f.patient, booked.id).await.unwrap_err();
    assert_eq!(
        err,
        AppointmentError::InvalidTransition {
            current: AppointmentStatus::Completed,
            event: AppointmentEvent::Cancel,
        }
    );

    let (unchanged, _) = f.service.get(f.patient, booked.id).await.unwrap();
    assert_eq!(unchanged.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn test_reschedule_moves_slot_and_notifies_practitioner() {
    let f = fixture();
    let old_time = tomorrow_at(10);
    let new_time = tomorrow_at(15);
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, old_time))
        .await
        .unwrap();
    f.service.confirm(f.practitioner, booked.id).await.unwrap();

    let moved = f.service.reschedule(f.patient, booked.id, new_time).await.unwrap();
    assert_eq!(moved.status, AppointmentStatus::Rescheduled);
    assert_eq!(moved.scheduled_at, new_time);

    assert!(f.store.active_at(f.practitioner, old_time).await.is_empty());
    assert_eq!(f.store.active_at(f.practitioner, new_time).await.len(), 1);

    let rescheduled = f
        .channel
        .events_for(f.practitioner)
        .into_iter()
        .filter(|e| e.notification_type == NotificationType::AppointmentRescheduled)
        .count();
    assert_eq!(rescheduled, 1);
}

#[tokio::test]
async fn test_reschedule_onto_taken_slot_leaves_original_untouched() {
    let f = fixture();
    let original_time = tomorrow_at(10);
    let taken_time = tomorrow_at(11);

    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, original_time))
        .await
        .unwrap();
    f.service.confirm(f.practitioner, booked.id).await.unwrap();
    f.service
        .book(Uuid::new_v4(), video_request(f.practitioner, taken_time))
        .await
        .unwrap();

    let err = f
        .service
        .reschedule(f.patient, booked.id, taken_time)
        .await
        .unwrap_err();
    assert_matches!(err, AppointmentError::Conflict(_));

    let (unchanged, _) = f.service.get(f.patient, booked.id).await.unwrap();
    assert_eq!(unchanged.scheduled_at, original_time);
    assert_eq!(unchanged.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn test_reschedule_requires_confirmed_and_future_time() {
    let f = fixture();
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();

    assert_matches!(
        f.service.reschedule(f.patient, booked.id, tomorrow_at(12)).await,
        Err(AppointmentError::InvalidTransition { current: AppointmentStatus::Requested, .. })
    );

    f.service.confirm(f.practitioner, booked.id).await.unwrap();
    assert_matches!(
        f.service
            .reschedule(f.patient, booked.id, Utc::now() - Duration::hours(1))
            .await,
        Err(AppointmentError::ValidationError(_))
    );
}

#[tokio::test]
async fn test_room_end_completes_rescheduled_appointment() {
    let f = fixture();
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();
    f.service.confirm(f.practitioner, booked.id).await.unwrap();
    f.service
        .reschedule(f.patient, booked.id, tomorrow_at(16))
        .await
        .unwrap();

    let completed = f.service.complete_on_room_end(booked.id).await.unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    assert_matches!(
        f.service.complete_on_room_end(booked.id).await,
        Err(AppointmentError::InvalidTransition { .. })
    );
}

#[tokio::test]
async fn test_racing_cancel_and_reschedule_apply_once() {
    let f = fixture();
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();
    f.service.confirm(f.practitioner, booked.id).await.unwrap();

    let (canceled, moved) = futures::future::join(
        f.service.cancel(f.practitioner, booked.id),
        f.service.reschedule(f.patient, booked.id, tomorrow_at(17)),
    )
    .await;

    assert_eq!(canceled.is_ok() as u8 + moved.is_ok() as u8, 1);
}

#[tokio::test]
async fn test_list_is_scoped_to_caller_and_filters() {
    let f = fixture();
    let first = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(8)))
        .await
        .unwrap();
    f.service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(9)))
        .await
        .unwrap();
    f.service
        .book(Uuid::new_v4(), video_request(f.practitioner, tomorrow_at(12)))
        .await
        .unwrap();
    f.service.confirm(f.practitioner, first.id).await.unwrap();

    let mine = f.service.list(f.patient, &AppointmentListQuery::default()).await.unwrap();
    assert_eq!(mine.len(), 2);

    let confirmed = f
        .service
        .list(
            f.patient,
            &AppointmentListQuery {
                status: Some(AppointmentStatus::Confirmed),
                participant: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, first.id);

    let as_practitioner = f
        .service
        .list(
            f.patient,
            &AppointmentListQuery {
                status: None,
                participant: Some(ParticipantRole::Practitioner),
            },
        )
        .await
        .unwrap();
    assert!(as_practitioner.is_empty());

    let practitioner_view = f.service.list(f.practitioner, &AppointmentListQuery::default()).await.unwrap();
    assert_eq!(practitioner_view.len(), 3);
}

#[tokio::test]
async fn test_update_dispatches_by_field() {
    let f = fixture();
    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();

    assert_matches!(
        f.service
            .update(f.patient, booked.id, UpdateAppointmentRequest::default())
            .await,
        Err(AppointmentError::ValidationError(_))
    );

    let confirmed = f
        .service
        .update(
            f.practitioner,
            booked.id,
            UpdateAppointmentRequest {
                scheduled_at: None,
                status: Some(AppointmentStatus::Confirmed),
            },
        )
        .await
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let moved = f
        .service
        .update(
            f.patient,
            booked.id,
            UpdateAppointmentRequest {
                scheduled_at: Some(tomorrow_at(13)),
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.status, AppointmentStatus::Rescheduled);
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_transition() {
    let f = fixture();
    f.channel.set_failing(true);

    let booked = f
        .service
        .book(f.patient, video_request(f.practitioner, tomorrow_at(10)))
        .await
        .unwrap();
    let confirmed = f.service.confirm(f.practitioner, booked.id).await.unwrap();

    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert!(f.channel.events().is_empty());
}

#[tokio::test]
async fn test_unknown_appointment_is_not_found() {
    let f = fixture();
    assert_matches!(
        f.service.get(f.patient, Uuid::new_v4()).await,
        Err(AppointmentError::NotFound)
    );
}
