// libs/video-conferencing-cell/src/lib.rs
//! # Video Conferencing Cell
//!
//! Lifecycle of the video room bound to a confirmed video appointment. The
//! coordinator only knows the provider's opaque room token and three room
//! states; media transport stays with the provider.
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                   Video Cell                        |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Rooms, requests, errors          |
//! |  services/      |                                   |
//! |    session.rs   |  SessionRoomCoordinator           |
//! |    provider.rs  |  Provider port, local HMAC tokens |
//! |    cloudflare.rs|  Cloudflare Realtime client       |
//! |    store.rs     |  Room store port, in-memory store |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /sessions` - Get or create the room for an appointment
//! - `GET /sessions?appointment_id=|room_id=` - Fetch a room
//! - `PATCH /sessions/{room_id}` - Start or end a room
//! - `GET /sessions/health` - Provider health
//!
//! ## Configuration
//!
//! Cloudflare is used when `CLOUDFLARE_REALTIME_APP_ID` and
//! `CLOUDFLARE_REALTIME_API_TOKEN` are set; otherwise room tokens are signed
//! locally with `ROOM_TOKEN_SECRET`.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    JoinRoomRequest, JoinRoomResponse, RoomEvent, RoomStatus, SessionRoom, VideoConferencingError,
};

pub use services::{
    CloudflareRealtimeClient, ConferencingProvider, InMemoryRoomStore, LocalTokenProvider, RoomStore,
    SessionRoomCoordinator, SupabaseRoomStore,
};

pub use router::session_routes;
