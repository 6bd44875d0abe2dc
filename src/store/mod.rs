//! Conversation Store Interface
//!
//! The store owns canonical conversation and message state. It is the sole
//! authority on the 5-minute edit window and on participant validation; the
//! client controller only ever holds a transient overlay on top of it.
//!
//! Two implementations ship with the crate: [`crate::client::api::ChatApiClient`]
//! speaks to the platform REST API, and [`memory::MemoryStore`] keeps
//! everything in process for tests and local development.

use uuid::Uuid;

use crate::shared::chat::{ChatMessage, Conversation};
use crate::shared::error::StoreError;

pub mod memory;

pub use memory::{MemorySession, MemoryStore};

/// Canonical conversation/message persistence consumed by the controller.
///
/// The caller's identity is bound when the store handle is constructed
/// (bearer credential for the REST client, explicit session for the memory
/// store), so every method operates on "my" data.
#[allow(async_fn_in_trait)]
pub trait ConversationStore: Send + Sync {
    /// List the caller's conversations with denormalized last-message
    /// summaries, most recently active first.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError>;

    /// Full message history of a conversation, ascending by `created_at`.
    /// No pagination: the complete list is returned.
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>, StoreError>;

    /// Commit a message. The conversation is created lazily on the first
    /// send between a pair. Returns the server-confirmed message.
    async fn send_message(
        &self,
        conversation_id: Uuid,
        content: &str,
        receiver: Uuid,
    ) -> Result<ChatMessage, StoreError>;

    /// Edit a message's content in place. Rejected with
    /// [`StoreError::EditWindowExpired`] outside the 5-minute window and
    /// with [`StoreError::Forbidden`] for non-authors.
    async fn edit_message(&self, message_id: Uuid, content: &str)
        -> Result<ChatMessage, StoreError>;

    /// Remove a message entirely. [`StoreError::NotFound`] if it vanished.
    async fn delete_message(&self, message_id: Uuid) -> Result<(), StoreError>;
}
