//! # Appointment Cell
//!
//! Booking and lifecycle of consultations between a patient and a
//! practitioner.
//!
//! - `services/authorization.rs`: resolves a caller to a `ParticipantRole`
//! - `services/reservation.rs`: slot acquisition on the store's unique index
//! - `services/lifecycle.rs`: legal transitions and which role may drive them
//! - `services/booking.rs`: `AppointmentService`, the entry point for handlers
//!   and for the video cell's room-end completion
//! - `services/store.rs`, `services/supabase_store.rs`: persistence

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentError, AppointmentEvent, AppointmentKind, AppointmentStatus,
    AppointmentValidationRules,
};
pub use router::appointment_routes;
pub use services::{
    AppointmentService, AppointmentStore, AuthorizationGuard, InMemoryAppointmentStore,
    ParticipantRole, Participants, SupabaseAppointmentStore,
};
