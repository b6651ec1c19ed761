// libs/video-conferencing-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};

use crate::models::{RoomStatus, SessionRoom};
use crate::services::store::RoomStore;

const TABLE: &str = "/rest/v1/session_rooms";
const RETURN_ROWS: &str = "return=representation";

/// PostgREST-backed room store; `session_rooms_live_appointment_key` rejects
/// a second live room for one appointment.
pub struct SupabaseRoomStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseRoomStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn select(&self, query: &str) -> Result<Option<SessionRoom>, StoreError> {
        let path = format!("{}?{}", TABLE, query);
        let rows: Vec<SessionRoom> = self
            .supabase
            .request(Method::GET, &path, Some(self.supabase.service_token()), None)
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl RoomStore for SupabaseRoomStore {
    async fn insert(&self, room: &SessionRoom) -> Result<SessionRoom, StoreError> {
        let body = serde_json::to_value(room).map_err(|e| StoreError::Decode(e.to_string()))?;

        let rows: Vec<SessionRoom> = self
            .supabase
            .request_with_prefer(Method::POST, TABLE, Some(self.supabase.service_token()), Some(body), Some(RETURN_ROWS))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))
    }

    async fn get(&self, room_id: Uuid) -> Result<Option<SessionRoom>, StoreError> {
        self.select(&format!("id=eq.{}", room_id)).await
    }

    async fn find_live_for_appointment(&self, appointment_id: Uuid) -> Result<Option<SessionRoom>, StoreError> {
        self.select(&format!("appointment_id=eq.{}&status=neq.ended&limit=1", appointment_id))
            .await
    }

    async fn latest_for_appointment(&self, appointment_id: Uuid) -> Result<Option<SessionRoom>, StoreError> {
        if let Some(live) = self.find_live_for_appointment(appointment_id).await? {
            return Ok(Some(live));
        }
        self.select(&format!(
            "appointment_id=eq.{}&order=created_at.desc&limit=1",
            appointment_id
        ))
        .await
    }

    async fn update_if_status(
        &self,
        updated: &SessionRoom,
        expected: &[RoomStatus],
    ) -> Result<Option<SessionRoom>, StoreError> {
        let statuses: Vec<&str> = expected.iter().map(RoomStatus::as_str).collect();
        let path = format!("{}?id=eq.{}&status=in.({})", TABLE, updated.id, statuses.join(","));

        let body = json!({
            "status": updated.status,
            "started_at": updated.started_at,
            "ended_at": updated.ended_at,
            "duration_seconds": updated.duration_seconds,
            "updated_at": updated.updated_at,
        });

        let rows: Vec<SessionRoom> = self
            .supabase
            .request_with_prefer(Method::PATCH, &path, Some(self.supabase.service_token()), Some(body), Some(RETURN_ROWS))
            .await?;

        Ok(rows.into_iter().next())
    }
}
