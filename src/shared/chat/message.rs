//! Chat Message Data Structure
//!
//! Represents a message in a conversation between a prospective student and
//! an ambassador. The `sender` is always a resolved record; normalizing the
//! wire representation (bare id vs populated object) is the store-interface
//! boundary's job, so nothing above it branches on sender shape.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds after sending during which the author may still edit a message.
/// The store is the authority on this window; clients may only use it to
/// hide the edit control speculatively.
pub const EDIT_WINDOW_SECS: i64 = 5 * 60;

/// Characters kept in denormalized last-message previews.
pub const LAST_MESSAGE_PREVIEW_LEN: usize = 80;

/// The edit window as a time delta.
pub fn edit_window() -> TimeDelta {
    TimeDelta::seconds(EDIT_WINDOW_SECS)
}

/// Platform role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Prospective student
    User,
    /// Verified student mentor
    Ambassador,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Resolved sender identity attached to every message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sender {
    /// Account ID
    pub id: Uuid,
    /// Display name (may be empty when the wire only carried an id)
    pub name: String,
    /// Platform role
    pub role: Role,
}

impl Sender {
    /// Create a resolved sender record
    pub fn new(id: Uuid, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }

    /// Sender known only by id, as some wire payloads deliver it
    pub fn unresolved(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
            role: Role::default(),
        }
    }
}

/// Represents a chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique message ID (server-assigned)
    pub id: Uuid,
    /// Conversation this message belongs to
    pub conversation_id: Uuid,
    /// Who sent the message
    pub sender: Sender,
    /// Plain-text content, non-empty
    pub content: String,
    /// Server-assigned creation timestamp
    pub created_at: DateTime<Utc>,
    /// Whether the content has been edited in place
    #[serde(default)]
    pub edited: bool,
}

impl ChatMessage {
    /// Whether `viewer` may still edit this message at `now`.
    ///
    /// Sender-owned AND within the edit window. This mirrors the store's
    /// authoritative check so the UI can hide the edit control; the store
    /// still rejects expired edits regardless.
    pub fn editable_by(&self, viewer: Uuid, now: DateTime<Utc>) -> bool {
        self.sender.id == viewer && now - self.created_at <= edit_window()
    }

    /// Get a preview of the message (first N characters)
    pub fn preview(&self, max_len: usize) -> String {
        if self.content.chars().count() <= max_len {
            self.content.clone()
        } else {
            let mut preview: String = self.content.chars().take(max_len.saturating_sub(3)).collect();
            preview.push_str("...");
            preview
        }
    }
}

/// Body of `POST /chats/send`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: Uuid,
    pub content: String,
    pub receiver: Uuid,
}

/// Body of `PUT /chats/message/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}
