pub mod broadcast;
pub mod dispatcher;
pub mod store;
pub mod supabase_store;

pub use broadcast::*;
pub use dispatcher::*;
pub use store::{InMemoryNotificationStore, NotificationStore};
pub use supabase_store::SupabaseNotificationStore;
