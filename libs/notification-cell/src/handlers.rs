use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Extension, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{NotificationEvent, NotificationListQuery};
use crate::router::NotificationState;

/// The caller's recorded notifications, newest first.
#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<NotificationState>,
    Extension(user): Extension<User>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Vec<NotificationEvent>>, AppError> {
    let recipient_id = user.caller_id()?;

    let notifications = state
        .records
        .recent_for_recipient(recipient_id, query.effective_limit())
        .await
        .map_err(|e| {
            error!("Failed to load notifications for {}: {}", recipient_id, e);
            AppError::Database(e.to_string())
        })?;

    Ok(Json(notifications))
}

/// Stream the caller's notifications as server-sent events.
pub async fn notification_stream(
    State(state): State<NotificationState>,
    Extension(user): Extension<User>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let recipient_id = user.caller_id()?;
    let receiver = state.hub.subscribe(recipient_id).await;

    info!("Notification stream opened for recipient {}", recipient_id);

    let events = stream::unfold(receiver, move |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(payload) => {
                    let event = Event::default().event("notification").data(payload);
                    return Some((Ok(event), receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Recipient {} lagged, {} notification(s) skipped", recipient_id, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
