// libs/appointment-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};

use crate::models::{Appointment, AppointmentStatus};
use crate::services::authorization::ParticipantRole;
use crate::services::store::AppointmentStore;

const TABLE: &str = "/rest/v1/appointments";
const RETURN_ROWS: &str = "return=representation";

/// PostgREST-backed store. Relies on the `appointments_active_slot_key`
/// partial unique index; conditional updates filter on the expected status.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn status_filter(expected: &[AppointmentStatus]) -> String {
        let names: Vec<&str> = expected.iter().map(AppointmentStatus::as_str).collect();
        format!("in.({})", names.join(","))
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let body = serde_json::to_value(appointment).map_err(|e| StoreError::Decode(e.to_string()))?;

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_prefer(Method::POST, TABLE, Some(self.supabase.service_token()), Some(body), Some(RETURN_ROWS))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!("{}?id=eq.{}&select=*", TABLE, id);
        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(self.supabase.service_token()), None)
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn list_for_participant(
        &self,
        participant_id: Uuid,
        role: Option<ParticipantRole>,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut path = match role {
            Some(ParticipantRole::Patient) => format!("{}?patient_id=eq.{}", TABLE, participant_id),
            Some(ParticipantRole::Practitioner) => format!("{}?practitioner_id=eq.{}", TABLE, participant_id),
            None => format!(
                "{}?or=(patient_id.eq.{id},practitioner_id.eq.{id})",
                TABLE,
                id = participant_id
            ),
        };

        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        path.push_str("&order=scheduled_at.asc");

        debug!("Listing appointments for participant {}", participant_id);

        let rows: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(self.supabase.service_token()), None)
            .await?;

        Ok(rows)
    }

    async fn update_if_status(
        &self,
        updated: &Appointment,
        expected: &[AppointmentStatus],
    ) -> Result<Option<Appointment>, StoreError> {
        let path = format!(
            "{}?id=eq.{}&status={}",
            TABLE,
            updated.id,
            Self::status_filter(expected)
        );

        let body = json!({
            "scheduled_at": updated.scheduled_at,
            "duration_minutes": updated.duration_minutes,
            "status": updated.status,
            "updated_at": updated.updated_at,
        });

        let rows: Vec<Appointment> = self
            .supabase
            .request_with_prefer(Method::PATCH, &path, Some(self.supabase.service_token()), Some(body), Some(RETURN_ROWS))
            .await?;

        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_uses_postgrest_in_syntax() {
        assert_eq!(
            SupabaseAppointmentStore::status_filter(&[AppointmentStatus::Confirmed, AppointmentStatus::Rescheduled]),
            "in.(confirmed,rescheduled)"
        );
    }
}
