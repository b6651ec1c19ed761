use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use uuid::Uuid;

use shared_database::{StoreError, SupabaseClient};

use crate::services::store::NotificationStore;
use crate::NotificationEvent;

const TABLE: &str = "/rest/v1/notifications";

pub struct SupabaseNotificationStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseNotificationStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl NotificationStore for SupabaseNotificationStore {
    async fn save(&self, event: &NotificationEvent) -> Result<(), StoreError> {
        let body = serde_json::to_value(event).map_err(|e| StoreError::Decode(e.to_string()))?;

        let _: Vec<NotificationEvent> = self
            .supabase
            .request_with_prefer(
                Method::POST,
                TABLE,
                Some(self.supabase.service_token()),
                Some(body),
                Some("return=representation"),
            )
            .await?;
        Ok(())
    }

    async fn recent_for_recipient(&self, recipient_id: Uuid, limit: usize) -> Result<Vec<NotificationEvent>, StoreError> {
        let path = format!(
            "{}?recipient_id=eq.{}&order=created_at.desc&limit={}",
            TABLE, recipient_id, limit
        );
        let rows: Vec<NotificationEvent> = self
            .supabase
            .request(Method::GET, &path, Some(self.supabase.service_token()), None)
            .await?;
        Ok(rows)
    }
}
