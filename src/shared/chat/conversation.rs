//! Conversation Data Structure
//!
//! Represents a two-party thread between a prospective student and an
//! ambassador. Conversations are created lazily on first send and their
//! participant set is immutable afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::{ChatMessage, Role, Sender, LAST_MESSAGE_PREVIEW_LEN};

/// Denormalized summary of the newest message, for conversation list views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    /// Preview of the message content
    pub content: String,
    /// Who sent it
    pub sender: Uuid,
    /// When it was sent
    pub timestamp: DateTime<Utc>,
}

/// Represents a conversation between exactly one user and one ambassador
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation ID
    pub id: Uuid,
    /// The prospective-student side
    pub user: Sender,
    /// The ambassador side
    pub ambassador: Sender,
    /// Newest message summary, if any message has been sent
    pub last_message: Option<LastMessage>,
    /// When the conversation was created
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation with explicit sides
    pub fn new(id: Uuid, user: Sender, ambassador: Sender) -> Self {
        Self {
            id,
            user,
            ambassador,
            last_message: None,
            created_at: Utc::now(),
        }
    }

    /// Create a conversation from an unordered pair, slotting by role.
    ///
    /// When both carry the same role the pair is kept in the given order;
    /// role assignment is the platform's concern, not the store's.
    pub fn between(id: Uuid, a: Sender, b: Sender) -> Self {
        if a.role == Role::Ambassador && b.role != Role::Ambassador {
            Self::new(id, b, a)
        } else {
            Self::new(id, a, b)
        }
    }

    /// Check whether an account is one of the two participants
    pub fn has_participant(&self, account_id: Uuid) -> bool {
        self.user.id == account_id || self.ambassador.id == account_id
    }

    /// Check whether this conversation is between the given pair
    pub fn is_between(&self, a: Uuid, b: Uuid) -> bool {
        self.has_participant(a) && self.has_participant(b) && a != b
    }

    /// The participant that is not `account_id`
    pub fn counterpart(&self, account_id: Uuid) -> Option<&Sender> {
        if self.user.id == account_id {
            Some(&self.ambassador)
        } else if self.ambassador.id == account_id {
            Some(&self.user)
        } else {
            None
        }
    }

    /// Refresh the denormalized summary from a newly committed message
    pub fn update_last_message(&mut self, message: &ChatMessage) {
        self.last_message = Some(LastMessage {
            content: message.preview(LAST_MESSAGE_PREVIEW_LEN),
            sender: message.sender.id,
            timestamp: message.created_at,
        });
    }
}
