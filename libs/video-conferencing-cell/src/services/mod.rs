// libs/video-conferencing-cell/src/services/mod.rs

pub mod cloudflare;
pub mod provider;
pub mod session;
pub mod store;
pub mod supabase_store;

pub use cloudflare::CloudflareRealtimeClient;
pub use provider::{ConferencingProvider, LocalTokenProvider};
pub use session::SessionRoomCoordinator;
pub use store::{InMemoryRoomStore, RoomStore};
pub use supabase_store::SupabaseRoomStore;
