// libs/appointment-cell/src/services/reservation.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::store::AppointmentStore;

/// Slot acquisition on top of the store's partial unique index.
///
/// There is no availability pre-check: the write is the reservation, and a
/// unique violation is reported as `Conflict`.
pub struct SlotReservationService {
    store: Arc<dyn AppointmentStore>,
}

impl SlotReservationService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Insert a new active appointment, acquiring its slot.
    pub async fn reserve_new(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        debug!(
            "Reserving slot {} for practitioner {}",
            appointment.scheduled_at, appointment.practitioner_id
        );

        match self.store.insert(appointment).await {
            Ok(saved) => {
                info!("Slot {} reserved by appointment {}", saved.scheduled_at, saved.id);
                Ok(saved)
            }
            Err(e) if e.is_unique_violation() => {
                warn!(
                    "Slot {} for practitioner {} is already taken",
                    appointment.scheduled_at, appointment.practitioner_id
                );
                Err(AppointmentError::Conflict(format!(
                    "practitioner {} is already booked at {}",
                    appointment.practitioner_id, appointment.scheduled_at
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Move `appointment` to `new_time`, releasing its old slot in the same
    /// write. The appointment never conflicts with itself.
    ///
    /// Returns `Ok(None)` when the row left `expected` before the write landed.
    pub async fn reserve_moved(
        &self,
        appointment: &Appointment,
        new_time: DateTime<Utc>,
        next_status: AppointmentStatus,
        expected: &[AppointmentStatus],
    ) -> Result<Option<Appointment>, AppointmentError> {
        let mut moved = appointment.clone();
        moved.scheduled_at = new_time;
        moved.status = next_status;
        moved.updated_at = Utc::now();

        match self.store.update_if_status(&moved, expected).await {
            Ok(result) => Ok(result),
            Err(e) if e.is_unique_violation() => {
                warn!(
                    "Cannot move appointment {} to {}: slot taken",
                    appointment.id, new_time
                );
                Err(AppointmentError::Conflict(format!(
                    "practitioner {} is already booked at {}",
                    appointment.practitioner_id, new_time
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a status change that may drop the row out of the active scope.
    pub async fn release(
        &self,
        appointment: &Appointment,
        next_status: AppointmentStatus,
        expected: &[AppointmentStatus],
    ) -> Result<Option<Appointment>, AppointmentError> {
        let mut released = appointment.clone();
        released.status = next_status;
        released.updated_at = Utc::now();

        let result = self.store.update_if_status(&released, expected).await?;
        if result.is_some() && !next_status.is_active() {
            debug!("Slot {} released by appointment {}", appointment.scheduled_at, appointment.id);
        }
        Ok(result)
    }
}
