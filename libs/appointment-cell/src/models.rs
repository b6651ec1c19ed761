// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

use shared_config::AppConfig;

use crate::services::authorization::{NotAParticipant, ParticipantRole, Participants};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub practitioner_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: AppointmentKind,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub location: Option<String>,
    /// Opaque reference to an analysis case; never dereferenced here.
    pub case_ref: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The other party of the appointment, seen from `role`.
    pub fn counterpart_of(&self, role: ParticipantRole) -> Uuid {
        match role {
            ParticipantRole::Patient => self.practitioner_id,
            ParticipantRole::Practitioner => self.patient_id,
        }
    }
}

impl Participants for Appointment {
    fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    fn practitioner_id(&self) -> Uuid {
        self.practitioner_id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[serde(alias = "REQUESTED")]
    Requested,
    #[serde(alias = "CONFIRMED")]
    Confirmed,
    #[serde(alias = "RESCHEDULED")]
    Rescheduled,
    #[serde(alias = "CANCELED", alias = "cancelled", alias = "CANCELLED")]
    Canceled,
    #[serde(alias = "COMPLETED")]
    Completed,
}

impl AppointmentStatus {
    pub const ACTIVE: [AppointmentStatus; 3] = [
        AppointmentStatus::Requested,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Rescheduled,
    ];

    /// Active statuses occupy the practitioner's slot.
    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Requested => "requested",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    #[serde(alias = "IN_PERSON", alias = "in_person_visit")]
    InPerson,

    #[serde(alias = "VIDEO_CONSULTATION", alias = "video", alias = "telehealth")]
    VideoConsultation,

    #[serde(alias = "FOLLOW_UP", alias = "followup")]
    FollowUp,

    #[serde(alias = "BIOPSY")]
    Biopsy,
}

impl AppointmentKind {
    /// Only video consultations are served through a session room.
    pub fn is_remote(&self) -> bool {
        matches!(self, AppointmentKind::VideoConsultation)
    }
}

impl fmt::Display for AppointmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentKind::InPerson => write!(f, "in-person visit"),
            AppointmentKind::VideoConsultation => write!(f, "video consultation"),
            AppointmentKind::FollowUp => write!(f, "follow-up"),
            AppointmentKind::Biopsy => write!(f, "biopsy"),
        }
    }
}

/// Events accepted by the appointment state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentEvent {
    Book,
    Confirm,
    Cancel,
    Reschedule,
    Complete,
}

impl fmt::Display for AppointmentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentEvent::Book => write!(f, "book"),
            AppointmentEvent::Confirm => write!(f, "confirm"),
            AppointmentEvent::Cancel => write!(f, "cancel"),
            AppointmentEvent::Reschedule => write!(f, "reschedule"),
            AppointmentEvent::Complete => write!(f, "complete"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub practitioner_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub kind: AppointmentKind,
    pub duration_minutes: Option<i32>,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub case_ref: Option<Uuid>,
}

/// `PATCH /appointments/{id}`: a new time (reschedule) or a target status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    /// Restrict to appointments where the caller holds this role.
    pub participant: Option<ParticipantRole>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Cannot {event} an appointment that is {current}")]
    InvalidTransition {
        current: AppointmentStatus,
        event: AppointmentEvent,
    },

    #[error("Slot conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl From<shared_database::StoreError> for AppointmentError {
    fn from(err: shared_database::StoreError) -> Self {
        match err {
            shared_database::StoreError::UniqueViolation(detail) => AppointmentError::Conflict(detail),
            other => AppointmentError::StoreError(other.to_string()),
        }
    }
}

impl From<NotAParticipant> for AppointmentError {
    fn from(err: NotAParticipant) -> Self {
        AppointmentError::Unauthorized(err.to_string())
    }
}

impl From<AppointmentError> for shared_models::error::AppError {
    fn from(err: AppointmentError) -> Self {
        use shared_models::error::AppError;

        let message = err.to_string();
        match err {
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::ValidationError(_) => AppError::ValidationError(message),
            AppointmentError::Unauthorized(_) => AppError::Forbidden(message),
            AppointmentError::InvalidTransition { .. } => AppError::InvalidTransition(message),
            AppointmentError::Conflict(_) => AppError::Conflict(message),
            AppointmentError::StoreError(_) => AppError::Database(message),
        }
    }
}

// ==============================================================================
// VALIDATION MODELS
// ==============================================================================

#[derive(Debug, Clone)]
pub struct AppointmentValidationRules {
    pub min_duration_minutes: i32,
    pub max_duration_minutes: i32,
    pub default_duration_minutes: i32,
    pub max_text_length: usize,
}

impl Default for AppointmentValidationRules {
    fn default() -> Self {
        Self {
            min_duration_minutes: 10,
            max_duration_minutes: 180,
            default_duration_minutes: 30,
            max_text_length: 2000,
        }
    }
}

impl AppointmentValidationRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_duration_minutes: config.min_appointment_minutes,
            max_duration_minutes: config.max_appointment_minutes,
            default_duration_minutes: config.default_appointment_minutes,
            ..Self::default()
        }
    }
}
