use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::GameEvent;

const SESSION_CHANNEL_CAPACITY: usize = 100;

/// Fan-out of published game events to live subscribers, one channel per session
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    /// session_id -> sender
    session_channels: Arc<RwLock<HashMap<String, broadcast::Sender<GameEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits an event to all subscribers of its session
    pub async fn emit(&self, event: GameEvent) {
        let channels = self.session_channels.read().await;
        let Some(sender) = channels.get(&event.session_id) else {
            debug!(session_id = %event.session_id, seq = event.seq, "No subscribers for session");
            return;
        };

        let session_id = event.session_id.clone();
        match sender.send(event) {
            Ok(receivers) => {
                debug!(session_id = %session_id, receivers, "Session event emitted");
            }
            Err(_) => {
                debug!(session_id = %session_id, "Session event emitted with no receivers");
            }
        }
    }

    /// Subscribe to events for a specific session
    pub async fn subscribe(&self, session_id: &str) -> broadcast::Receiver<GameEvent> {
        {
            let channels = self.session_channels.read().await;
            if let Some(sender) = channels.get(session_id) {
                return sender.subscribe();
            }
        }

        debug!(session_id = %session_id, "Creating new session channel for subscription");
        let mut channels = self.session_channels.write().await;
        channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(SESSION_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drops a session's channel. Open subscriptions see the channel close.
    pub async fn remove_session(&self, session_id: &str) -> bool {
        let removed = self
            .session_channels
            .write()
            .await
            .remove(session_id)
            .is_some();
        if removed {
            debug!(session_id = %session_id, "Session channel removed");
        }
        removed
    }
}
