use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Broadcast channel closed for recipient {0}")]
    ChannelClosed(uuid::Uuid),

    #[error("Notification provider error: {0}")]
    ProviderError(String),
}
