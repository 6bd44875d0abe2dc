//! Real-time Notifier Primitives
//!
//! Server half of the notifier contract: fan-out of typed chat events to
//! every live session of a conversation's participants.

pub mod broadcast;

pub use broadcast::{broadcast_event, event_channel, RealtimeEventBroadcast};
