use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One tag per triggering transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    AppointmentRequested,
    AppointmentConfirmed,
    AppointmentCanceled,
    AppointmentRescheduled,
    SessionRoomReady,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationType::AppointmentRequested => write!(f, "appointment_requested"),
            NotificationType::AppointmentConfirmed => write!(f, "appointment_confirmed"),
            NotificationType::AppointmentCanceled => write!(f, "appointment_canceled"),
            NotificationType::AppointmentRescheduled => write!(f, "appointment_rescheduled"),
            NotificationType::SessionRoomReady => write!(f, "session_room_ready"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub recipient_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_entity_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        recipient_id: Uuid,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        related_entity_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            related_entity_id,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// `GET /notifications?limit=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationListQuery {
    pub limit: Option<usize>,
}

impl NotificationListQuery {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 200;

    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
    }
}
