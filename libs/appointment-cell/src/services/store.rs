// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::StoreError;

use crate::models::{Appointment, AppointmentStatus};
use crate::services::authorization::ParticipantRole;

/// Persistence port for appointments.
///
/// Implementations must reject, with `StoreError::UniqueViolation`, any write
/// that would leave two active appointments on the same
/// `(practitioner_id, scheduled_at)`.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    async fn list_for_participant(
        &self,
        participant_id: Uuid,
        role: Option<ParticipantRole>,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Replace the row with `updated` only while its stored status is one of
    /// `expected`. Returns `Ok(None)` when the row has moved on.
    async fn update_if_status(
        &self,
        updated: &Appointment,
        expected: &[AppointmentStatus],
    ) -> Result<Option<Appointment>, StoreError>;
}

type SlotKey = (Uuid, DateTime<Utc>);

#[derive(Default)]
struct Tables {
    rows: HashMap<Uuid, Appointment>,
    active_slots: HashMap<SlotKey, Uuid>,
}

impl Tables {
    fn slot_holder(&self, key: &SlotKey, except: Uuid) -> Option<Uuid> {
        self.active_slots.get(key).copied().filter(|holder| *holder != except)
    }
}

/// Process-local store; the slot index is updated under the same write lock
/// as the rows, which gives the partial unique index semantics.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    tables: RwLock<Tables>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tables.read().await.rows.len()
    }

    /// Active appointments holding `(practitioner_id, scheduled_at)`.
    pub async fn active_at(&self, practitioner_id: Uuid, scheduled_at: DateTime<Utc>) -> Vec<Appointment> {
        let tables = self.tables.read().await;
        tables
            .rows
            .values()
            .filter(|a| a.practitioner_id == practitioner_id && a.scheduled_at == scheduled_at && a.status.is_active())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.rows.contains_key(&appointment.id) {
            return Err(StoreError::UniqueViolation(format!("appointments_pkey ({})", appointment.id)));
        }

        let key = (appointment.practitioner_id, appointment.scheduled_at);
        if appointment.status.is_active() {
            if let Some(holder) = tables.slot_holder(&key, appointment.id) {
                debug!("Slot {:?} already held by appointment {}", key, holder);
                return Err(StoreError::UniqueViolation("appointments_active_slot_key".to_string()));
            }
            tables.active_slots.insert(key, appointment.id);
        }

        tables.rows.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.read().await.rows.get(&id).cloned())
    }

    async fn list_for_participant(
        &self,
        participant_id: Uuid,
        role: Option<ParticipantRole>,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .rows
            .values()
            .filter(|a| match role {
                Some(ParticipantRole::Patient) => a.patient_id == participant_id,
                Some(ParticipantRole::Practitioner) => a.practitioner_id == participant_id,
                None => a.patient_id == participant_id || a.practitioner_id == participant_id,
            })
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();

        appointments.sort_by_key(|a| (a.scheduled_at, a.created_at));
        Ok(appointments)
    }

    async fn update_if_status(
        &self,
        updated: &Appointment,
        expected: &[AppointmentStatus],
    ) -> Result<Option<Appointment>, StoreError> {
        let mut tables = self.tables.write().await;

        let current = match tables.rows.get(&updated.id) {
            Some(current) if expected.contains(&current.status) => current.clone(),
            _ => return Ok(None),
        };

        let old_key = (current.practitioner_id, current.scheduled_at);
        let new_key = (updated.practitioner_id, updated.scheduled_at);

        if updated.status.is_active() {
            if let Some(holder) = tables.slot_holder(&new_key, updated.id) {
                debug!("Slot {:?} already held by appointment {}", new_key, holder);
                return Err(StoreError::UniqueViolation("appointments_active_slot_key".to_string()));
            }
        }

        if current.status.is_active() && tables.active_slots.get(&old_key) == Some(&current.id) {
            tables.active_slots.remove(&old_key);
        }
        if updated.status.is_active() {
            tables.active_slots.insert(new_key, updated.id);
        }

        tables.rows.insert(updated.id, updated.clone());
        Ok(Some(updated.clone()))
    }
}
