// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentEvent, AppointmentStatus};
use crate::services::authorization::ParticipantRole;

/// Who is driving a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Participant(ParticipantRole),
    /// The owning video room was ended by either party.
    RoomEnded,
}

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Target status for `event` applied to `current`, or `InvalidTransition`.
    ///
    /// Booking has no source state and is never valid against an existing row.
    pub fn next_status(
        &self,
        current: AppointmentStatus,
        event: AppointmentEvent,
    ) -> Result<AppointmentStatus, AppointmentError> {
        use AppointmentEvent as E;
        use AppointmentStatus as S;

        let next = match (current, event) {
            (S::Requested, E::Confirm) => S::Confirmed,
            (S::Requested | S::Confirmed, E::Cancel) => S::Canceled,
            (S::Confirmed, E::Reschedule) => S::Rescheduled,
            (S::Confirmed | S::Rescheduled, E::Complete) => S::Completed,
            _ => {
                warn!("Invalid transition attempted: {} on {}", event, current);
                return Err(AppointmentError::InvalidTransition { current, event });
            }
        };

        debug!("Transition validated: {} --{}--> {}", current, event, next);
        Ok(next)
    }

    /// Events the state machine accepts from `current`.
    pub fn valid_events(&self, current: AppointmentStatus) -> Vec<AppointmentEvent> {
        [
            AppointmentEvent::Confirm,
            AppointmentEvent::Cancel,
            AppointmentEvent::Reschedule,
            AppointmentEvent::Complete,
        ]
        .into_iter()
        .filter(|event| self.next_status(current, *event).is_ok())
        .collect()
    }

    /// Whether `actor` may drive `event` at all.
    pub fn permits(&self, actor: Actor, event: AppointmentEvent) -> bool {
        use AppointmentEvent as E;
        use ParticipantRole as R;

        match (actor, event) {
            (Actor::Participant(R::Patient), E::Book | E::Cancel | E::Reschedule) => true,
            (Actor::Participant(R::Practitioner), E::Confirm | E::Cancel | E::Complete) => true,
            (Actor::RoomEnded, E::Complete) => true,
            _ => false,
        }
    }

    /// Combined check: legal from `current` and allowed for `actor`.
    pub fn authorize_transition(
        &self,
        actor: Actor,
        current: AppointmentStatus,
        event: AppointmentEvent,
    ) -> Result<AppointmentStatus, AppointmentError> {
        let next = self.next_status(current, event)?;

        if !self.permits(actor, event) {
            let who = match actor {
                Actor::Participant(role) => role.to_string(),
                Actor::RoomEnded => "room end".to_string(),
            };
            return Err(AppointmentError::Unauthorized(format!(
                "the {} may not {} this appointment",
                who, event
            )));
        }

        Ok(next)
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
