use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event name clients subscribe to for stylesheet swaps
pub const RELOAD_EVENT: &str = "twc:reload";

/// Message pushed to connected development clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LiveUpdateMessage {
    /// Custom event carrying a payload for a client-side listener
    Custom { event: String, data: ReloadPayload },
}

/// Payload of a stylesheet reload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadPayload {
    pub content: String,
}

impl LiveUpdateMessage {
    /// Reload message carrying freshly compiled CSS
    pub fn reload(content: impl Into<String>) -> Self {
        Self::Custom {
            event: RELOAD_EVENT.to_string(),
            data: ReloadPayload {
                content: content.into(),
            },
        }
    }

    pub fn event(&self) -> &str {
        match self {
            Self::Custom { event, .. } => event,
        }
    }
}

/// Broadcast channel to connected development clients
#[derive(Debug, Clone)]
pub struct LiveUpdateChannel {
    tx: broadcast::Sender<LiveUpdateMessage>,
}

impl LiveUpdateChannel {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Send a message to every subscriber. Returns how many received it.
    pub fn send(&self, message: LiveUpdateMessage) -> usize {
        match self.tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("No live-update clients connected");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveUpdateMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LiveUpdateChannel {
    fn default() -> Self {
        Self::new()
    }
}
