use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::StoreError;

use crate::NotificationEvent;

/// Persistence port for dispatched notifications, so a recipient who was not
/// connected when an event fired can still read it later.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn save(&self, event: &NotificationEvent) -> Result<(), StoreError>;

    /// Newest first.
    async fn recent_for_recipient(&self, recipient_id: Uuid, limit: usize) -> Result<Vec<NotificationEvent>, StoreError>;
}

#[derive(Default)]
pub struct InMemoryNotificationStore {
    rows: RwLock<Vec<NotificationEvent>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn save(&self, event: &NotificationEvent) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|row| row.id == event.id) {
            return Err(StoreError::UniqueViolation(format!("notification {} already stored", event.id)));
        }
        rows.push(event.clone());
        Ok(())
    }

    async fn recent_for_recipient(&self, recipient_id: Uuid, limit: usize) -> Result<Vec<NotificationEvent>, StoreError> {
        let rows = self.rows.read().await;
        let mut recent: Vec<NotificationEvent> = rows
            .iter()
            .filter(|row| row.recipient_id == recipient_id)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent.truncate(limit);
        Ok(recent)
    }
}
