// libs/video-conferencing-cell/src/services/cloudflare.rs
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{CloudflareSessionRequest, CloudflareSessionResponse, VideoConferencingError};
use crate::services::provider::ConferencingProvider;

/// Cloudflare Realtime API client. Each room is backed by one Realtime
/// session; its `sessionId` is the room token handed to both parties.
/// Based on: https://developers.cloudflare.com/realtime/
pub struct CloudflareRealtimeClient {
    client: Client,
    app_id: String,
    api_token: String,
    base_url: String,
}

impl CloudflareRealtimeClient {
    pub fn new(config: &AppConfig) -> Result<Self, VideoConferencingError> {
        if !config.is_video_conferencing_configured() {
            return Err(VideoConferencingError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            app_id: config.cloudflare_realtime_app_id.clone(),
            api_token: config.cloudflare_realtime_api_token.clone(),
            base_url: config.cloudflare_realtime_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST /apps/{appId}/sessions/new
    pub async fn create_session(&self) -> Result<CloudflareSessionResponse, VideoConferencingError> {
        let url = format!("{}/apps/{}/sessions/new", self.base_url, self.app_id);
        debug!("Sending session creation request to: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&CloudflareSessionRequest::default())
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Cloudflare session creation failed: {} - {}", status, response_text);
            return Err(VideoConferencingError::ProviderError(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        let session: CloudflareSessionResponse = serde_json::from_str(&response_text).map_err(|e| {
            VideoConferencingError::ProviderError(format!("Failed to parse session response: {}", e))
        })?;

        if let Some(error_code) = &session.error_code {
            let message = session.error_description.as_deref().unwrap_or("Unknown error");
            error!("Cloudflare session error: {} - {}", error_code, message);
            return Err(VideoConferencingError::ProviderError(format!("{}: {}", error_code, message)));
        }

        Ok(session)
    }
}

#[async_trait]
impl ConferencingProvider for CloudflareRealtimeClient {
    fn name(&self) -> &'static str {
        "cloudflare_realtime"
    }

    async fn issue_room_token(&self, appointment_id: Uuid, room_id: Uuid) -> Result<String, VideoConferencingError> {
        let session = self.create_session().await?;
        info!(
            "Cloudflare session {} backs room {} (appointment {})",
            session.session_id, room_id, appointment_id
        );
        Ok(session.session_id)
    }

    async fn health_check(&self) -> Result<bool, VideoConferencingError> {
        let url = format!("{}/apps/{}", self.base_url, self.app_id);

        let response = self.client.get(&url).bearer_auth(&self.api_token).send().await?;

        // The app info endpoint answers 404 for a valid app without metadata.
        let is_healthy = response.status().is_success() || response.status() == 404;

        if is_healthy {
            debug!("Cloudflare Realtime API health check passed");
        } else {
            warn!("Cloudflare Realtime API health check failed: {}", response.status());
        }

        Ok(is_healthy)
    }
}
