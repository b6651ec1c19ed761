use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};
use tracing::{info, warn};

use appointment_cell::models::AppointmentValidationRules;
use appointment_cell::router::appointment_routes;
use appointment_cell::services::{
    AppointmentService, AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore,
};
use notification_cell::router::notification_routes;
use notification_cell::{
    InMemoryNotificationStore, NotificationDispatcher, NotificationStore, RecipientBroadcastHub,
    SupabaseNotificationStore,
};
use shared_config::{AppConfig, StoreBackend};
use shared_database::SupabaseClient;
use video_conferencing_cell::router::session_routes;
use video_conferencing_cell::services::{
    CloudflareRealtimeClient, ConferencingProvider, InMemoryRoomStore, LocalTokenProvider, RoomStore,
    SessionRoomCoordinator, SupabaseRoomStore,
};

struct Stores {
    appointments: Arc<dyn AppointmentStore>,
    rooms: Arc<dyn RoomStore>,
    notifications: Arc<dyn NotificationStore>,
}

/// Must be called inside a Tokio runtime: it spawns the notification
/// channel cleanup task.
pub fn create_router(state: Arc<AppConfig>) -> anyhow::Result<Router> {
    let stores = stores_for(&state)?;

    let hub = RecipientBroadcastHub::new(state.notification_channel_capacity);
    let dispatcher = NotificationDispatcher::new(Arc::new(hub.clone()))
        .with_store(Arc::clone(&stores.notifications));

    let appointments = Arc::new(AppointmentService::new(
        stores.appointments,
        dispatcher.clone(),
        AppointmentValidationRules::from_config(&state),
    ));
    let coordinator = Arc::new(SessionRoomCoordinator::new(
        stores.rooms,
        Arc::clone(&appointments),
        conferencing_provider(&state)?,
        dispatcher,
    ));

    hub.spawn_cleanup(Duration::from_secs(state.notification_cleanup_interval_secs));

    Ok(Router::new()
        .route("/", get(|| async { "Clinic consultation API is running!" }))
        .nest("/appointments", appointment_routes(state.clone(), appointments))
        .nest("/sessions", session_routes(state.clone(), coordinator))
        .nest("/notifications", notification_routes(state, hub, stores.notifications)))
}

fn stores_for(state: &AppConfig) -> anyhow::Result<Stores> {
    match state.store_backend {
        StoreBackend::Memory => {
            warn!("Using in-memory stores; records are lost on restart");
            Ok(Stores {
                appointments: Arc::new(InMemoryAppointmentStore::new()),
                rooms: Arc::new(InMemoryRoomStore::new()),
                notifications: Arc::new(InMemoryNotificationStore::new()),
            })
        }
        StoreBackend::Supabase => {
            if !state.is_store_configured() {
                anyhow::bail!("STORE_BACKEND=supabase requires SUPABASE_URL, SUPABASE_ANON_PUBLIC_KEY and SUPABASE_SERVICE_ROLE_KEY");
            }
            info!("Using Supabase stores at {}", state.supabase_url);
            let supabase = Arc::new(SupabaseClient::new(state));
            Ok(Stores {
                appointments: Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase))),
                rooms: Arc::new(SupabaseRoomStore::new(Arc::clone(&supabase))),
                notifications: Arc::new(SupabaseNotificationStore::new(supabase)),
            })
        }
    }
}

fn conferencing_provider(state: &AppConfig) -> anyhow::Result<Arc<dyn ConferencingProvider>> {
    if state.is_video_conferencing_configured() {
        info!("Issuing room tokens through Cloudflare Realtime");
        return Ok(Arc::new(CloudflareRealtimeClient::new(state)?));
    }

    warn!("Cloudflare Realtime not configured, signing room tokens locally");
    let provider = LocalTokenProvider::new(state.room_token_secret.clone())
        .context("ROOM_TOKEN_SECRET or SUPABASE_JWT_SECRET must be set")?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_config() -> Arc<AppConfig> {
        Arc::new(AppConfig {
            supabase_jwt_secret: "router-test-secret".to_string(),
            room_token_secret: "router-test-secret".to_string(),
            ..AppConfig::default()
        })
    }

    #[tokio::test]
    async fn root_and_session_health_are_public() {
        let app = create_router(test_config()).unwrap();

        let root = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(root.status(), StatusCode::OK);

        let health = app
            .oneshot(Request::builder().uri("/sessions/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn appointments_require_a_token() {
        let app = create_router(test_config()).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/appointments").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn notifications_require_a_token() {
        let app = create_router(test_config()).unwrap();

        for uri in ["/notifications", "/notifications/stream"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn supabase_backend_without_credentials_fails_fast() {
        let config = AppConfig {
            store_backend: StoreBackend::Supabase,
            ..(*test_config()).clone()
        };
        assert!(create_router(Arc::new(config)).is_err());
    }
}
