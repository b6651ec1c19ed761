// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::{NotificationDispatcher, NotificationEvent, NotificationType};

use crate::models::{
    Appointment, AppointmentError, AppointmentEvent, AppointmentListQuery, AppointmentStatus,
    AppointmentValidationRules, BookAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::authorization::{AuthorizationGuard, ParticipantRole};
use crate::services::lifecycle::{Actor, AppointmentLifecycleService};
use crate::services::reservation::SlotReservationService;
use crate::services::store::AppointmentStore;

/// Booking, transitions and participant-scoped reads for appointments.
///
/// Every mutation is a conditional write on the status that was read, so two
/// racing transitions on one row cannot both apply.
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    reservation: SlotReservationService,
    lifecycle: AppointmentLifecycleService,
    dispatcher: NotificationDispatcher,
    validation_rules: AppointmentValidationRules,
}

impl AppointmentService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        dispatcher: NotificationDispatcher,
        validation_rules: AppointmentValidationRules,
    ) -> Self {
        Self {
            reservation: SlotReservationService::new(Arc::clone(&store)),
            store,
            lifecycle: AppointmentLifecycleService::new(),
            dispatcher,
            validation_rules,
        }
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    /// Book a new appointment for the calling patient. Starts in `Requested`.
    pub async fn book(
        &self,
        caller_id: Uuid,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking {} for patient {} with practitioner {} at {}",
            request.kind, caller_id, request.practitioner_id, request.scheduled_at
        );

        let duration_minutes = self.validate_booking_request(caller_id, &request)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: caller_id,
            practitioner_id: request.practitioner_id,
            scheduled_at: request.scheduled_at,
            duration_minutes,
            kind: request.kind,
            status: AppointmentStatus::Requested,
            reason: request.reason,
            location: request.location,
            case_ref: request.case_ref,
            created_at: now,
            updated_at: now,
        };

        let saved = self.reservation.reserve_new(&appointment).await?;

        self.dispatcher
            .dispatch(NotificationEvent::new(
                saved.practitioner_id,
                NotificationType::AppointmentRequested,
                "New appointment request",
                format!("A patient requested a {} on {}", saved.kind, saved.scheduled_at.format("%Y-%m-%d %H:%M UTC")),
                saved.id,
            ))
            .await;

        info!("Appointment {} requested", saved.id);
        Ok(saved)
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    /// Load an appointment the caller is party to, with the caller's role.
    pub async fn get(
        &self,
        caller_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<(Appointment, ParticipantRole), AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        let role = AuthorizationGuard::authorize(caller_id, &appointment)?;
        Ok((appointment, role))
    }

    pub async fn list(
        &self,
        caller_id: Uuid,
        query: &AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Listing appointments for {} with {:?}", caller_id, query);

        let appointments = self
            .store
            .list_for_participant(caller_id, query.participant, query.status)
            .await?;

        // The store scopes by participant; re-check so nothing unscoped escapes.
        Ok(appointments
            .into_iter()
            .filter(|a| AuthorizationGuard::authorize(caller_id, a).is_ok())
            .collect())
    }

    // ==========================================================================
    // TRANSITIONS
    // ==========================================================================

    pub async fn confirm(&self, caller_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let (current, role) = self.get(caller_id, appointment_id).await?;
        let confirmed = self
            .transition(Actor::Participant(role), &current, AppointmentEvent::Confirm)
            .await?;

        self.dispatcher
            .dispatch(NotificationEvent::new(
                confirmed.patient_id,
                NotificationType::AppointmentConfirmed,
                "Appointment confirmed",
                format!("Your {} on {} has been confirmed", confirmed.kind, confirmed.scheduled_at.format("%Y-%m-%d %H:%M UTC")),
                confirmed.id,
            ))
            .await;

        info!("Appointment {} confirmed by practitioner {}", confirmed.id, caller_id);
        Ok(confirmed)
    }

    pub async fn cancel(&self, caller_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let (current, role) = self.get(caller_id, appointment_id).await?;
        let canceled = self
            .transition(Actor::Participant(role), &current, AppointmentEvent::Cancel)
            .await?;

        self.dispatcher
            .dispatch(NotificationEvent::new(
                canceled.counterpart_of(role),
                NotificationType::AppointmentCanceled,
                "Appointment canceled",
                format!("The {} on {} was canceled by the {}", canceled.kind, canceled.scheduled_at.format("%Y-%m-%d %H:%M UTC"), role),
                canceled.id,
            ))
            .await;

        info!("Appointment {} canceled by {} {}", canceled.id, role, caller_id);
        Ok(canceled)
    }

    /// Move a confirmed appointment to `new_time`. The old slot is released in
    /// the same write that takes the new one.
    pub async fn reschedule(
        &self,
        caller_id: Uuid,
        appointment_id: Uuid,
        new_time: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let (current, role) = self.get(caller_id, appointment_id).await?;

        let next = self.lifecycle.authorize_transition(
            Actor::Participant(role),
            current.status,
            AppointmentEvent::Reschedule,
        )?;

        if new_time <= Utc::now() {
            return Err(AppointmentError::ValidationError(
                "scheduled_at must be in the future".to_string(),
            ));
        }

        let moved = match self
            .reservation
            .reserve_moved(&current, new_time, next, &[current.status])
            .await?
        {
            Some(moved) => moved,
            None => return Err(self.lost_race(appointment_id, AppointmentEvent::Reschedule).await),
        };

        self.dispatcher
            .dispatch(NotificationEvent::new(
                moved.practitioner_id,
                NotificationType::AppointmentRescheduled,
                "Appointment rescheduled",
                format!(
                    "The {} on {} moved to {}",
                    moved.kind,
                    current.scheduled_at.format("%Y-%m-%d %H:%M UTC"),
                    moved.scheduled_at.format("%Y-%m-%d %H:%M UTC")
                ),
                moved.id,
            ))
            .await;

        info!(
            "Appointment {} rescheduled from {} to {}",
            moved.id, current.scheduled_at, moved.scheduled_at
        );
        Ok(moved)
    }

    pub async fn complete(&self, caller_id: Uuid, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let (current, role) = self.get(caller_id, appointment_id).await?;
        let completed = self
            .transition(Actor::Participant(role), &current, AppointmentEvent::Complete)
            .await?;

        info!("Appointment {} completed by practitioner {}", completed.id, caller_id);
        Ok(completed)
    }

    /// Completion driven by the end of the appointment's video room. The room
    /// coordinator has already authorized the caller against the room.
    pub async fn complete_on_room_end(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let current = self.load(appointment_id).await?;
        let completed = self
            .transition(Actor::RoomEnded, &current, AppointmentEvent::Complete)
            .await?;

        info!("Appointment {} completed on room end", completed.id);
        Ok(completed)
    }

    /// `PATCH /appointments/{id}`: a new time reschedules; a target status
    /// selects the matching event.
    pub async fn update(
        &self,
        caller_id: Uuid,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        match (request.scheduled_at, request.status) {
            (Some(new_time), None | Some(AppointmentStatus::Rescheduled)) => {
                self.reschedule(caller_id, appointment_id, new_time).await
            }
            (None, Some(AppointmentStatus::Confirmed)) => self.confirm(caller_id, appointment_id).await,
            (None, Some(AppointmentStatus::Canceled)) => self.cancel(caller_id, appointment_id).await,
            (None, Some(AppointmentStatus::Completed)) => self.complete(caller_id, appointment_id).await,
            (None, Some(AppointmentStatus::Rescheduled)) => Err(AppointmentError::ValidationError(
                "rescheduling requires scheduled_at".to_string(),
            )),
            (None, Some(AppointmentStatus::Requested)) => Err(AppointmentError::ValidationError(
                "an appointment cannot be moved back to requested".to_string(),
            )),
            (None, None) => Err(AppointmentError::ValidationError(
                "provide scheduled_at or status".to_string(),
            )),
            (Some(_), Some(status)) => Err(AppointmentError::ValidationError(format!(
                "scheduled_at cannot be combined with status {}",
                status
            ))),
        }
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Status-only transition, conditioned on the status that was read.
    async fn transition(
        &self,
        actor: Actor,
        current: &Appointment,
        event: AppointmentEvent,
    ) -> Result<Appointment, AppointmentError> {
        let next = self.lifecycle.authorize_transition(actor, current.status, event)?;

        match self.reservation.release(current, next, &[current.status]).await? {
            Some(updated) => {
                debug!("Appointment {}: {} --{}--> {}", updated.id, current.status, event, updated.status);
                Ok(updated)
            }
            None => Err(self.lost_race(current.id, event).await),
        }
    }

    /// The conditional write matched no row: report the status that won.
    async fn lost_race(&self, appointment_id: Uuid, event: AppointmentEvent) -> AppointmentError {
        match self.load(appointment_id).await {
            Ok(latest) => {
                warn!(
                    "Concurrent update on appointment {}: {} rejected, now {}",
                    appointment_id, event, latest.status
                );
                AppointmentError::InvalidTransition {
                    current: latest.status,
                    event,
                }
            }
            Err(e) => e,
        }
    }

    fn validate_booking_request(
        &self,
        caller_id: Uuid,
        request: &BookAppointmentRequest,
    ) -> Result<i32, AppointmentError> {
        let rules = &self.validation_rules;

        if request.practitioner_id == caller_id {
            return Err(AppointmentError::ValidationError(
                "patient and practitioner must be different people".to_string(),
            ));
        }

        if request.scheduled_at <= Utc::now() {
            return Err(AppointmentError::ValidationError(
                "scheduled_at must be in the future".to_string(),
            ));
        }

        let duration = request.duration_minutes.unwrap_or(rules.default_duration_minutes);
        if duration < rules.min_duration_minutes {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment duration must be at least {} minutes",
                rules.min_duration_minutes
            )));
        }
        if duration > rules.max_duration_minutes {
            return Err(AppointmentError::ValidationError(format!(
                "Appointment duration cannot exceed {} minutes",
                rules.max_duration_minutes
            )));
        }

        for (field, value) in [("reason", &request.reason), ("location", &request.location)] {
            if value.as_ref().map_or(false, |v| v.chars().count() > rules.max_text_length) {
                return Err(AppointmentError::ValidationError(format!(
                    "{} cannot exceed {} characters",
                    field, rules.max_text_length
                )));
            }
        }

        Ok(duration)
    }
}
