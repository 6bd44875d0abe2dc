//! Real-time Event Broadcasting
//!
//! Events are fanned out with `tokio::sync::broadcast`, a multi-producer,
//! multi-consumer channel: every subscriber receives a copy of each event.
//! Delivery is at-least-once from the consumer's point of view (a session
//! that reconnects may see an event again after a history fetch), which is
//! why the client controller deduplicates by message id.

use tokio::sync::broadcast;

use crate::shared::event::RealtimeEvent;

/// Default capacity for the event channel. Slow consumers past this lag
/// are dropped by tokio and must resynchronize via a history fetch.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast sender for real-time chat events.
///
/// Clone freely; a clone can broadcast from anywhere in the application.
pub type RealtimeEventBroadcast = broadcast::Sender<RealtimeEvent>;

/// Create an event channel with the default capacity
pub fn event_channel() -> (RealtimeEventBroadcast, broadcast::Receiver<RealtimeEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}

/// Broadcast an event to all subscribers.
///
/// Returns the number of live subscribers that received the event; zero
/// subscribers is not an error.
pub fn broadcast_event(broadcast_tx: &RealtimeEventBroadcast, event: RealtimeEvent) -> usize {
    match broadcast_tx.send(event) {
        Ok(subscriber_count) => {
            tracing::debug!("[realtime] event broadcast to {} subscribers", subscriber_count);
            subscriber_count
        }
        Err(_) => {
            tracing::debug!("[realtime] no subscribers to receive event");
            0
        }
    }
}
