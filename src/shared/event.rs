//! Real-time Event System
//!
//! Typed events delivered by the notifier to every live session of a
//! conversation's participants. Delivery is at-least-once; consumers must
//! deduplicate by message id. The controller consumes these through a single
//! dispatcher rather than scattered callbacks, so every mutation of the view
//! flows through one tagged union.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::chat::ChatMessage;

/// Real-time event pushed to chat participants
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RealtimeEvent {
    /// A message was committed to a conversation
    NewMessage(ChatMessage),
    /// A message's content was edited in place
    MessageUpdated(ChatMessage),
    /// A message was removed
    MessageDeleted { id: Uuid },
}

impl RealtimeEvent {
    /// The conversation the event concerns, when the payload carries one
    pub fn conversation_id(&self) -> Option<Uuid> {
        match self {
            RealtimeEvent::NewMessage(message) | RealtimeEvent::MessageUpdated(message) => {
                Some(message.conversation_id)
            }
            RealtimeEvent::MessageDeleted { .. } => None,
        }
    }

    /// The message id the event concerns
    pub fn message_id(&self) -> Uuid {
        match self {
            RealtimeEvent::NewMessage(message) | RealtimeEvent::MessageUpdated(message) => {
                message.id
            }
            RealtimeEvent::MessageDeleted { id } => *id,
        }
    }
}
