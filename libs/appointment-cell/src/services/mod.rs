pub mod authorization;
pub mod booking;
pub mod lifecycle;
pub mod reservation;
pub mod store;
pub mod supabase_store;

pub use authorization::{AuthorizationGuard, NotAParticipant, ParticipantRole, Participants};
pub use booking::AppointmentService;
pub use lifecycle::{Actor, AppointmentLifecycleService};
pub use reservation::SlotReservationService;
pub use store::{AppointmentStore, InMemoryAppointmentStore};
pub use supabase_store::SupabaseAppointmentStore;
