use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{list_notifications, notification_stream};
use crate::services::{NotificationStore, RecipientBroadcastHub};

/// Shared by the notification handlers.
#[derive(Clone)]
pub struct NotificationState {
    pub hub: RecipientBroadcastHub,
    pub records: Arc<dyn NotificationStore>,
}

pub fn notification_routes(
    config: Arc<AppConfig>,
    hub: RecipientBroadcastHub,
    records: Arc<dyn NotificationStore>,
) -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/stream", get(notification_stream))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(NotificationState { hub, records })
}
