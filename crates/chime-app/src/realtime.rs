//! In-process fan-out of real-time events to connected clients.

use tokio::sync::broadcast;

use chime_core::constants::{EVENT_OCCUR_BROADCAST, EVENT_OCCUR_WIRE_NAME, PLUGIN_ID};
use chime_core::model::UserId;
use chime_service::error::{ServiceError, ServiceResult};
use chime_service::notify::{Broadcaster, RealtimeEvent};

/// An event addressed to a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeMessage {
    /// Name the websocket client sees, namespaced by plugin.
    pub event: String,
    pub recipient: UserId,
    pub payload: serde_json::Value,
}

/// Broadcast channel websocket sessions subscribe to; each session keeps the
/// messages addressed to its user.
#[derive(Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<RealtimeMessage>,
}

impl RealtimeHub {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.sender.subscribe()
    }

    /// Namespaced event name as delivered to clients.
    #[must_use]
    pub fn wire_name(event_name: &str) -> String {
        match event_name {
            EVENT_OCCUR_BROADCAST => EVENT_OCCUR_WIRE_NAME.to_owned(),
            other => format!("custom_{PLUGIN_ID}_{other}"),
        }
    }
}

impl Broadcaster for RealtimeHub {
    fn publish(
        &self,
        event_name: &str,
        payload: &RealtimeEvent,
        recipient: &UserId,
    ) -> ServiceResult<()> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| ServiceError::HostError(format!("unserializable payload: {e}")))?;
        let message = RealtimeMessage {
            event: Self::wire_name(event_name),
            recipient: recipient.clone(),
            payload,
        };

        // No subscriber means no client is connected; nothing to deliver.
        match self.sender.send(message) {
            Ok(receivers) => tracing::trace!(user_id = %recipient, receivers, "Real-time event published"),
            Err(_) => tracing::trace!(user_id = %recipient, "No real-time subscribers"),
        }
        Ok(())
    }
}
