use async_trait::async_trait;

use studyhall_protocol::ServerEvent;

/// Realtime delivery seam between the durable send path and the gateway.
/// The gateway implements this; the chat service receives it at construction
/// instead of reaching for a process-global handle.
#[async_trait]
pub trait RoomFanout: Send + Sync {
    /// Deliver an event to every connection currently joined to `room`.
    async fn send_to_room(&self, room: &str, event: ServerEvent);
}
