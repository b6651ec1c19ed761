// libs/video-conferencing-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;
use crate::services::SessionRoomCoordinator;

pub fn session_routes(config: Arc<AppConfig>, coordinator: Arc<SessionRoomCoordinator>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new().route("/health", get(session_health_check));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/", post(join_session_room).get(get_session_room))
        .route("/{room_id}", patch(update_session_room))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(coordinator)
}
