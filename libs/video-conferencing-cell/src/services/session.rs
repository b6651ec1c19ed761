// libs/video-conferencing-cell/src/services/session.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use appointment_cell::{Appointment, AppointmentService, AppointmentStatus, AuthorizationGuard};
use notification_cell::{NotificationDispatcher, NotificationEvent, NotificationType};

use crate::models::{RoomEvent, RoomLookupQuery, RoomStatus, SessionRoom, VideoConferencingError};
use crate::services::provider::ConferencingProvider;
use crate::services::store::RoomStore;

/// Owns the 1:1 video room bound to a confirmed video appointment.
///
/// Room creation relies on the store rejecting a second live room for the
/// same appointment; a losing concurrent join returns the winner's room.
pub struct SessionRoomCoordinator {
    rooms: Arc<dyn RoomStore>,
    appointments: Arc<AppointmentService>,
    provider: Arc<dyn ConferencingProvider>,
    dispatcher: NotificationDispatcher,
}

impl SessionRoomCoordinator {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        appointments: Arc<AppointmentService>,
        provider: Arc<dyn ConferencingProvider>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            rooms,
            appointments,
            provider,
            dispatcher,
        }
    }

    /// Return the appointment's live room, creating one if none is live.
    /// Repeated calls are idempotent until the room is ended.
    pub async fn get_or_create_room(
        &self,
        appointment_id: Uuid,
        caller_id: Uuid,
    ) -> Result<SessionRoom, VideoConferencingError> {
        let (appointment, role) = self.appointments.get(caller_id, appointment_id).await?;
        Self::ensure_eligible(&appointment)?;

        if let Some(room) = self.rooms.find_live_for_appointment(appointment.id).await? {
            debug!("Reusing live room {} for appointment {}", room.id, appointment.id);
            return Ok(room);
        }

        let room_id = Uuid::new_v4();
        let room_token = self
            .provider
            .issue_room_token(appointment.id, room_id)
            .await
            .map_err(|e| {
                error!("{} provider failed to issue a room token: {}", self.provider.name(), e);
                match e {
                    VideoConferencingError::ProviderError(_) => e,
                    other => VideoConferencingError::ProviderError(other.to_string()),
                }
            })?;

        let now = Utc::now();
        let room = SessionRoom {
            id: room_id,
            appointment_id: appointment.id,
            room_token,
            host_id: appointment.practitioner_id,
            participant_id: appointment.patient_id,
            status: RoomStatus::Created,
            started_at: None,
            ended_at: None,
            duration_seconds: None,
            created_at: now,
            updated_at: now,
        };

        let created = match self.rooms.insert(&room).await {
            Ok(created) => created,
            Err(e) if e.is_unique_violation() => {
                warn!("Concurrent join created the room for appointment {} first", appointment.id);
                return self
                    .rooms
                    .find_live_for_appointment(appointment.id)
                    .await?
                    .ok_or_else(|| {
                        VideoConferencingError::Conflict(format!(
                            "room for appointment {} changed concurrently",
                            appointment.id
                        ))
                    });
            }
            Err(e) => return Err(e.into()),
        };

        // A cancel can land while the provider is issuing the token.
        let (current, _) = self.appointments.get(caller_id, appointment.id).await?;
        if let Err(e) = Self::ensure_eligible(&current) {
            warn!(
                "Appointment {} became {} while room {} was created, ending it",
                current.id, current.status, created.id
            );
            self.retire(&created).await;
            return Err(e);
        }

        self.dispatcher
            .dispatch(NotificationEvent::new(
                appointment.counterpart_of(role),
                NotificationType::SessionRoomReady,
                "Video consultation room ready",
                format!("The {} has opened the video room for your consultation", role),
                created.id,
            ))
            .await;

        info!(
            "Room {} created for appointment {} by {} {}",
            created.id, appointment.id, role, caller_id
        );
        Ok(created)
    }

    /// Fetch a room by its id, or the current room of an appointment.
    pub async fn get_room(
        &self,
        caller_id: Uuid,
        query: &RoomLookupQuery,
    ) -> Result<SessionRoom, VideoConferencingError> {
        match (query.room_id, query.appointment_id) {
            (Some(room_id), None) => {
                let room = self.load(room_id).await?;
                AuthorizationGuard::authorize(caller_id, &room)?;
                Ok(room)
            }
            (None, Some(appointment_id)) => {
                self.appointments.get(caller_id, appointment_id).await?;
                self.rooms
                    .latest_for_appointment(appointment_id)
                    .await?
                    .ok_or(VideoConferencingError::RoomNotFound)
            }
            _ => Err(VideoConferencingError::ValidationError(
                "provide exactly one of room_id or appointment_id".to_string(),
            )),
        }
    }

    /// `PATCH /sessions/{room_id}` with a target status.
    pub async fn update_room(
        &self,
        room_id: Uuid,
        caller_id: Uuid,
        target: RoomStatus,
    ) -> Result<SessionRoom, VideoConferencingError> {
        let event = RoomEvent::for_target(target).ok_or_else(|| {
            VideoConferencingError::ValidationError("a room cannot be moved back to created".to_string())
        })?;
        self.transition(room_id, caller_id, event).await
    }

    /// Apply `start` or `end`. Ending a room completes its appointment.
    pub async fn transition(
        &self,
        room_id: Uuid,
        caller_id: Uuid,
        event: RoomEvent,
    ) -> Result<SessionRoom, VideoConferencingError> {
        let room = self.load(room_id).await?;
        let role = AuthorizationGuard::authorize(caller_id, &room)?;

        let now = Utc::now();
        let next = Self::apply(&room, event, now)?;

        if event == RoomEvent::Start {
            let (appointment, _) = self.appointments.get(caller_id, room.appointment_id).await?;
            Self::ensure_eligible(&appointment)?;
        }

        let updated = match self.rooms.update_if_status(&next, &[room.status]).await? {
            Some(updated) => updated,
            None => {
                let latest = self.load(room_id).await?;
                warn!(
                    "Concurrent update on room {}: {} rejected, now {}",
                    room_id, event, latest.status
                );
                return Err(VideoConferencingError::InvalidTransition {
                    current: latest.status,
                    event,
                });
            }
        };

        info!("Room {}: {} --{}--> {} by {}", updated.id, room.status, event, updated.status, role);

        if event == RoomEvent::End {
            if let Err(e) = self.appointments.complete_on_room_end(updated.appointment_id).await {
                warn!(
                    "Room {} ended but appointment {} was not completed: {}",
                    updated.id, updated.appointment_id, e
                );
            }
        }

        Ok(updated)
    }

    pub async fn provider_health(&self) -> (&'static str, bool) {
        let healthy = match self.provider.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("{} provider health check failed: {}", self.provider.name(), e);
                false
            }
        };
        (self.provider.name(), healthy)
    }

    /// Only confirmed or rescheduled video consultations get a room.
    fn ensure_eligible(appointment: &Appointment) -> Result<(), VideoConferencingError> {
        if !appointment.kind.is_remote() {
            return Err(VideoConferencingError::NotEligible(format!(
                "appointment {} is a {}",
                appointment.id, appointment.kind
            )));
        }
        if !matches!(
            appointment.status,
            AppointmentStatus::Confirmed | AppointmentStatus::Rescheduled
        ) {
            return Err(VideoConferencingError::NotEligible(format!(
                "appointment {} is {}",
                appointment.id, appointment.status
            )));
        }
        Ok(())
    }

    /// End a room that was created for an appointment no longer eligible.
    /// The appointment itself is left as it is.
    async fn retire(&self, room: &SessionRoom) {
        let ended = match Self::apply(room, RoomEvent::End, Utc::now()) {
            Ok(ended) => ended,
            Err(e) => {
                warn!("Room {} cannot be retired: {}", room.id, e);
                return;
            }
        };

        match self.rooms.update_if_status(&ended, &[room.status]).await {
            Ok(Some(_)) => debug!("Retired room {}", room.id),
            Ok(None) => debug!("Room {} moved on before it could be retired", room.id),
            Err(e) => error!("Failed to retire room {}: {}", room.id, e),
        }
    }

    async fn load(&self, room_id: Uuid) -> Result<SessionRoom, VideoConferencingError> {
        self.rooms
            .get(room_id)
            .await?
            .ok_or(VideoConferencingError::RoomNotFound)
    }

    /// Pure room state machine: CREATED -> ACTIVE, CREATED|ACTIVE -> ENDED.
    fn apply(room: &SessionRoom, event: RoomEvent, now: DateTime<Utc>) -> Result<SessionRoom, VideoConferencingError> {
        let mut next = room.clone();
        next.updated_at = now;

        match (room.status, event) {
            (RoomStatus::Created, RoomEvent::Start) => {
                next.status = RoomStatus::Active;
                next.started_at = room.started_at.or(Some(now));
            }
            (RoomStatus::Created | RoomStatus::Active, RoomEvent::End) => {
                next.status = RoomStatus::Ended;
                next.ended_at = Some(now);
                next.duration_seconds = Some(
                    room.started_at
                        .map(|started| (now - started).num_seconds().max(0))
                        .unwrap_or(0),
                );
            }
            (current, event) => {
                return Err(VideoConferencingError::InvalidTransition { current, event });
            }
        }

        Ok(next)
    }
}
