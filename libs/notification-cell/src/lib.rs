//! # Notification Cell
//!
//! Fan-out of appointment and session-room side effects to the two parties of
//! a consultation. Delivery is best-effort: the dispatcher runs after the
//! triggering write has committed and never reports failure to its caller.
//!
//! - `models.rs`: `NotificationEvent` and its type tags
//! - `services/broadcast.rs`: the `BroadcastChannel` port and the in-process
//!   per-recipient hub that backs the SSE stream
//! - `services/dispatcher.rs`: `NotificationDispatcher`
//! - `services/store.rs`, `services/supabase_store.rs`: recorded notifications
//! - `router.rs`: `GET /notifications` and `GET /notifications/stream`

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::NotificationError;
pub use models::{NotificationEvent, NotificationListQuery, NotificationType};
pub use router::{notification_routes, NotificationState};
pub use services::{
    BroadcastChannel, InMemoryNotificationStore, NoopBroadcastChannel, NotificationDispatcher,
    NotificationStore, RecipientBroadcastHub, RecordingBroadcastChannel, SupabaseNotificationStore,
};
