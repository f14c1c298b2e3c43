use tokio::sync::broadcast;
use tracing::debug;

use crate::dto::sse::ServerEvent;

/// Broadcast hub shared by every group stream; subscribers filter by group id.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a hub backed by a Tokio broadcast channel holding up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events of every group.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers; events without listeners are dropped.
    pub fn broadcast(&self, event: ServerEvent) {
        let group_id = event.group_id;
        match self.sender.send(event) {
            Ok(receivers) => debug!(%group_id, receivers, "dispatched SSE event"),
            Err(_) => debug!(%group_id, "no SSE subscribers; event dropped"),
        }
    }
}
