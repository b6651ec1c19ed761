// libs/appointment-cell/src/services/authorization.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// The two legitimate parties of a consultation record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Patient,
    #[serde(alias = "doctor", alias = "host")]
    Practitioner,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantRole::Patient => write!(f, "patient"),
            ParticipantRole::Practitioner => write!(f, "practitioner"),
        }
    }
}

/// Records bound to exactly one patient and one practitioner.
///
/// Appointments expose `patient_id`/`practitioner_id` directly; session rooms
/// map `participant_id`/`host_id` onto the same pair.
pub trait Participants {
    fn patient_id(&self) -> Uuid;
    fn practitioner_id(&self) -> Uuid;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("caller {caller_id} is not a participant of this record")]
pub struct NotAParticipant {
    pub caller_id: Uuid,
}

pub struct AuthorizationGuard;

impl AuthorizationGuard {
    /// Resolve the caller's role on `record`, or reject a stranger.
    pub fn authorize<R: Participants + ?Sized>(
        caller_id: Uuid,
        record: &R,
    ) -> Result<ParticipantRole, NotAParticipant> {
        if caller_id == record.practitioner_id() {
            Ok(ParticipantRole::Practitioner)
        } else if caller_id == record.patient_id() {
            Ok(ParticipantRole::Patient)
        } else {
            warn!("Caller {} denied access to a record they are not party to", caller_id);
            Err(NotAParticipant { caller_id })
        }
    }
}
