// libs/video-conferencing-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use appointment_cell::{AppointmentError, Participants};
use appointment_cell::services::NotAParticipant;
use shared_database::StoreError;
use shared_models::error::AppError;

// ==============================================================================
// SESSION ROOM DOMAIN MODELS
// ==============================================================================

/// Coordinator-side record of one video session for one appointment.
///
/// `host_id` is the appointment's practitioner and `participant_id` its
/// patient; both are copied at creation and never change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRoom {
    pub id: Uuid,
    pub appointment_id: Uuid,
    /// Opaque identifier issued by the conferencing provider.
    pub room_token: String,
    pub host_id: Uuid,
    pub participant_id: Uuid,
    pub status: RoomStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRoom {
    pub fn is_live(&self) -> bool {
        self.status != RoomStatus::Ended
    }
}

impl Participants for SessionRoom {
    fn patient_id(&self) -> Uuid {
        self.participant_id
    }

    fn practitioner_id(&self) -> Uuid {
        self.host_id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    #[serde(alias = "CREATED")]
    Created,
    #[serde(alias = "ACTIVE")]
    Active,
    #[serde(alias = "ENDED")]
    Ended,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Created => "created",
            RoomStatus::Active => "active",
            RoomStatus::Ended => "ended",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoomEvent {
    Start,
    End,
}

impl RoomEvent {
    /// The event that moves a room into `target`. Nothing moves a room back
    /// to `Created`.
    pub fn for_target(target: RoomStatus) -> Option<Self> {
        match target {
            RoomStatus::Active => Some(RoomEvent::Start),
            RoomStatus::Ended => Some(RoomEvent::End),
            RoomStatus::Created => None,
        }
    }
}

impl fmt::Display for RoomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomEvent::Start => write!(f, "start"),
            RoomEvent::End => write!(f, "end"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub appointment_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub room_id: Uuid,
    pub room_token: String,
    pub room: SessionRoom,
}

impl From<SessionRoom> for JoinRoomResponse {
    fn from(room: SessionRoom) -> Self {
        Self {
            room_id: room.id,
            room_token: room.room_token.clone(),
            room,
        }
    }
}

/// `GET /sessions`: exactly one of the two ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomLookupQuery {
    pub appointment_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoomRequest {
    pub status: RoomStatus,
}

// ==============================================================================
// CLOUDFLARE REALTIME API MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudflareSessionRequest {
    #[serde(rename = "sessionDescription", skip_serializing_if = "Option::is_none")]
    pub session_description: Option<SessionDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "sessionDescription", skip_serializing_if = "Option::is_none")]
    pub session_description: Option<SessionDescription>,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(rename = "errorDescription", skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: String,
    pub sdp: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VideoConferencingError {
    #[error("Session room not found")]
    RoomNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Appointment is not eligible for a video room: {0}")]
    NotEligible(String),

    #[error("Cannot {event} a room that is {current}")]
    InvalidTransition { current: RoomStatus, event: RoomEvent },

    #[error("Room conflict: {0}")]
    Conflict(String),

    #[error("Conferencing provider error: {0}")]
    ProviderError(String),

    #[error("Video conferencing not configured")]
    NotConfigured,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl From<StoreError> for VideoConferencingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(detail) => VideoConferencingError::Conflict(detail),
            other => VideoConferencingError::StoreError(other.to_string()),
        }
    }
}

impl From<NotAParticipant> for VideoConferencingError {
    fn from(err: NotAParticipant) -> Self {
        VideoConferencingError::Unauthorized(err.to_string())
    }
}

impl From<AppointmentError> for VideoConferencingError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => VideoConferencingError::AppointmentNotFound,
            AppointmentError::Unauthorized(msg) => VideoConferencingError::Unauthorized(msg),
            AppointmentError::ValidationError(msg) => VideoConferencingError::ValidationError(msg),
            AppointmentError::Conflict(msg) => VideoConferencingError::Conflict(msg),
            AppointmentError::StoreError(msg) => VideoConferencingError::StoreError(msg),
            other @ AppointmentError::InvalidTransition { .. } => {
                VideoConferencingError::NotEligible(other.to_string())
            }
        }
    }
}

impl From<reqwest::Error> for VideoConferencingError {
    fn from(err: reqwest::Error) -> Self {
        VideoConferencingError::ProviderError(err.to_string())
    }
}

impl From<VideoConferencingError> for AppError {
    fn from(err: VideoConferencingError) -> Self {
        let message = err.to_string();
        match err {
            VideoConferencingError::RoomNotFound | VideoConferencingError::AppointmentNotFound => {
                AppError::NotFound(message)
            }
            VideoConferencingError::Unauthorized(_) => AppError::Forbidden(message),
            VideoConferencingError::NotEligible(_) | VideoConferencingError::Conflict(_) => {
                AppError::Conflict(message)
            }
            VideoConferencingError::InvalidTransition { .. } => AppError::InvalidTransition(message),
            VideoConferencingError::ProviderError(_) | VideoConferencingError::NotConfigured => {
                AppError::ExternalService(message)
            }
            VideoConferencingError::ValidationError(_) => AppError::ValidationError(message),
            VideoConferencingError::StoreError(_) => AppError::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_statuses_accept_upper_case_names() {
        let request: UpdateRoomRequest = serde_json::from_str(r#"{"status":"ENDED"}"#).unwrap();
        assert_eq!(request.status, RoomStatus::Ended);
        assert_eq!(RoomEvent::for_target(request.status), Some(RoomEvent::End));
        assert_eq!(RoomEvent::for_target(RoomStatus::Created), None);
    }

    #[test]
    fn provider_errors_are_bad_gateway() {
        let app: AppError = VideoConferencingError::ProviderError("timeout".into()).into();
        assert_eq!(app.status_code(), axum::http::StatusCode::BAD_GATEWAY);

        let app: AppError = VideoConferencingError::NotEligible("in-person".into()).into();
        assert_eq!(app.status_code(), axum::http::StatusCode::CONFLICT);
    }
}
