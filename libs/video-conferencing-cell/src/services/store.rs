// libs/video-conferencing-cell/src/services/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::StoreError;

use crate::models::{RoomStatus, SessionRoom};

/// Persistence port for session rooms.
///
/// `insert` must fail with `StoreError::UniqueViolation` while another
/// non-ended room exists for the same appointment.
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn insert(&self, room: &SessionRoom) -> Result<SessionRoom, StoreError>;

    async fn get(&self, room_id: Uuid) -> Result<Option<SessionRoom>, StoreError>;

    async fn find_live_for_appointment(&self, appointment_id: Uuid) -> Result<Option<SessionRoom>, StoreError>;

    /// The live room if there is one, otherwise the most recently created.
    async fn latest_for_appointment(&self, appointment_id: Uuid) -> Result<Option<SessionRoom>, StoreError>;

    async fn update_if_status(
        &self,
        updated: &SessionRoom,
        expected: &[RoomStatus],
    ) -> Result<Option<SessionRoom>, StoreError>;
}

#[derive(Default)]
struct Tables {
    rooms: HashMap<Uuid, SessionRoom>,
    live_by_appointment: HashMap<Uuid, Uuid>,
}

#[derive(Default)]
pub struct InMemoryRoomStore {
    tables: RwLock<Tables>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn rooms_for_appointment(&self, appointment_id: Uuid) -> Vec<SessionRoom> {
        let tables = self.tables.read().await;
        let mut rooms: Vec<SessionRoom> = tables
            .rooms
            .values()
            .filter(|r| r.appointment_id == appointment_id)
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.created_at);
        rooms
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn insert(&self, room: &SessionRoom) -> Result<SessionRoom, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.rooms.contains_key(&room.id) {
            return Err(StoreError::UniqueViolation(format!("session_rooms_pkey ({})", room.id)));
        }
        if room.is_live() {
            if tables.live_by_appointment.contains_key(&room.appointment_id) {
                return Err(StoreError::UniqueViolation(
                    "session_rooms_live_appointment_key".to_string(),
                ));
            }
            tables.live_by_appointment.insert(room.appointment_id, room.id);
        }

        tables.rooms.insert(room.id, room.clone());
        Ok(room.clone())
    }

    async fn get(&self, room_id: Uuid) -> Result<Option<SessionRoom>, StoreError> {
        Ok(self.tables.read().await.rooms.get(&room_id).cloned())
    }

    async fn find_live_for_appointment(&self, appointment_id: Uuid) -> Result<Option<SessionRoom>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .live_by_appointment
            .get(&appointment_id)
            .and_then(|id| tables.rooms.get(id))
            .cloned())
    }

    async fn latest_for_appointment(&self, appointment_id: Uuid) -> Result<Option<SessionRoom>, StoreError> {
        if let Some(live) = self.find_live_for_appointment(appointment_id).await? {
            return Ok(Some(live));
        }
        Ok(self.rooms_for_appointment(appointment_id).await.pop())
    }

    async fn update_if_status(
        &self,
        updated: &SessionRoom,
        expected: &[RoomStatus],
    ) -> Result<Option<SessionRoom>, StoreError> {
        let mut tables = self.tables.write().await;

        match tables.rooms.get(&updated.id) {
            Some(current) if expected.contains(&current.status) => {}
            _ => return Ok(None),
        }

        if !updated.is_live() && tables.live_by_appointment.get(&updated.appointment_id) == Some(&updated.id) {
            tables.live_by_appointment.remove(&updated.appointment_id);
        }

        tables.rooms.insert(updated.id, updated.clone());
        Ok(Some(updated.clone()))
    }
}
