use std::sync::Arc;

use tracing::{debug, warn};

use crate::services::broadcast::{BroadcastChannel, NoopBroadcastChannel};
use crate::services::store::NotificationStore;
use crate::NotificationEvent;

/// Best-effort publisher for committed transitions. Never fails its caller.
///
/// With a store attached every event is recorded before it is pushed; a
/// failed record does not stop the push.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channel: Arc<dyn BroadcastChannel>,
    records: Option<Arc<dyn NotificationStore>>,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn BroadcastChannel>) -> Self {
        Self { channel, records: None }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopBroadcastChannel))
    }

    pub fn with_store(mut self, records: Arc<dyn NotificationStore>) -> Self {
        self.records = Some(records);
        self
    }

    pub async fn dispatch(&self, event: NotificationEvent) {
        if let Some(records) = &self.records {
            if let Err(e) = records.save(&event).await {
                warn!(
                    "Failed to record {} ({}) for recipient {}: {}",
                    event.notification_type, event.id, event.recipient_id, e
                );
            }
        }

        match self.channel.publish(&event).await {
            Ok(delivered) => debug!(
                "Dispatched {} ({}) to recipient {} via {} subscriber(s)",
                event.notification_type, event.id, event.recipient_id, delivered
            ),
            Err(e) => warn!(
                "Failed to deliver {} ({}) to recipient {}: {}",
                event.notification_type, event.id, event.recipient_id, e
            ),
        }
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::noop()
    }
}
