// libs/video-conferencing-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{JoinRoomRequest, JoinRoomResponse, RoomLookupQuery, UpdateRoomRequest};
use crate::services::SessionRoomCoordinator;

// ==============================================================================
// SESSION ROOM HANDLERS
// ==============================================================================

/// Join the appointment's room, creating it on first join.
#[axum::debug_handler]
pub async fn join_session_room(
    State(coordinator): State<Arc<SessionRoomCoordinator>>,
    Extension(user): Extension<User>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, AppError> {
    let caller_id = user.caller_id()?;
    let room = coordinator
        .get_or_create_room(request.appointment_id, caller_id)
        .await?;

    Ok(Json(JoinRoomResponse::from(room)))
}

pub async fn get_session_room(
    State(coordinator): State<Arc<SessionRoomCoordinator>>,
    Extension(user): Extension<User>,
    Query(query): Query<RoomLookupQuery>,
) -> Result<Json<Value>, AppError> {
    let caller_id = user.caller_id()?;
    let room = coordinator.get_room(caller_id, &query).await?;

    Ok(Json(json!(room)))
}

pub async fn update_session_room(
    State(coordinator): State<Arc<SessionRoomCoordinator>>,
    Path(room_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateRoomRequest>,
) -> Result<Json<Value>, AppError> {
    let caller_id = user.caller_id()?;
    let room = coordinator.update_room(room_id, caller_id, request.status).await?;

    Ok(Json(json!(room)))
}

// ==============================================================================
// HEALTH
// ==============================================================================

pub async fn session_health_check(
    State(coordinator): State<Arc<SessionRoomCoordinator>>,
) -> Json<Value> {
    let (provider, healthy) = coordinator.provider_health().await;

    Json(json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "provider": provider,
        "message": if healthy {
            "Video conferencing system is operational"
        } else {
            "Video conferencing system has connectivity issues"
        }
    }))
}
