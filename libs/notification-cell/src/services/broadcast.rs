use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{NotificationError, NotificationEvent};

pub type RecipientSender = broadcast::Sender<String>;
pub type RecipientReceiver = broadcast::Receiver<String>;

/// Outbound push port. Implementations report how many live subscribers the
/// event reached; zero is not an error.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    async fn publish(&self, event: &NotificationEvent) -> Result<usize, NotificationError>;
}

/// In-process fan-out keyed by recipient id.
///
/// A channel is created when its recipient first subscribes and lives until
/// a cleanup pass finds no receiver left on it.
#[derive(Clone)]
pub struct RecipientBroadcastHub {
    channels: Arc<RwLock<HashMap<Uuid, RecipientSender>>>,
    capacity: usize,
}

impl RecipientBroadcastHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a recipient's channel, creating it on first use.
    pub async fn subscribe(&self, recipient_id: Uuid) -> RecipientReceiver {
        let mut channels = self.channels.write().await;
        let sender = channels.entry(recipient_id).or_insert_with(|| {
            debug!("Created notification channel for recipient {}", recipient_id);
            broadcast::channel(self.capacity).0
        });
        sender.subscribe()
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Drop channels nobody is listening on any more.
    pub async fn prune_idle_channels(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }

    /// Prune idle channels every `period` until the runtime shuts down.
    pub fn spawn_cleanup(&self, period: Duration) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let pruned = hub.prune_idle_channels().await;
                if pruned > 0 {
                    info!(
                        "Pruned {} idle notification channel(s), {} left",
                        pruned,
                        hub.channel_count().await
                    );
                }
            }
        })
    }
}

#[async_trait]
impl BroadcastChannel for RecipientBroadcastHub {
    async fn publish(&self, event: &NotificationEvent) -> Result<usize, NotificationError> {
        let message = serde_json::to_string(event)?;

        let channels = self.channels.read().await;
        let delivered = match channels.get(&event.recipient_id) {
            Some(sender) => match sender.send(message) {
                Ok(receivers) => receivers,
                Err(_) => {
                    warn!(
                        "No live subscriber for recipient {}, dropping {}",
                        event.recipient_id, event.notification_type
                    );
                    0
                }
            },
            None => 0,
        };

        debug!(
            "Published {} for recipient {} to {} subscriber(s)",
            event.notification_type, event.recipient_id, delivered
        );
        Ok(delivered)
    }
}

impl Default for RecipientBroadcastHub {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone)]
pub struct NoopBroadcastChannel;

#[async_trait]
impl BroadcastChannel for NoopBroadcastChannel {
    async fn publish(&self, _event: &NotificationEvent) -> Result<usize, NotificationError> {
        Ok(0)
    }
}

/// Keeps every published event in memory; can be switched to fail.
#[derive(Debug, Default, Clone)]
pub struct RecordingBroadcastChannel {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingBroadcastChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let channel = Self::default();
        channel.set_failing(true);
        channel
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn events_for(&self, recipient_id: Uuid) -> Vec<NotificationEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.recipient_id == recipient_id)
            .collect()
    }
}

#[async_trait]
impl BroadcastChannel for RecordingBroadcastChannel {
    async fn publish(&self, event: &NotificationEvent) -> Result<usize, NotificationError> {
        if self.failing.lock().map(|flag| *flag).unwrap_or(false) {
            return Err(NotificationError::ProviderError("recording channel set to fail".to_string()));
        }

        let mut events = self
            .events
            .lock()
            .map_err(|_| NotificationError::ProviderError("recording channel poisoned".to_string()))?;
        events.push(event.clone());
        Ok(1)
    }
}
