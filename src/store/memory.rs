//! In-Memory Conversation Store
//!
//! Reference implementation of [`ConversationStore`] used by tests and local
//! development. It enforces the same authority rules the platform store
//! does — participant validation, author-only mutation, the 5-minute edit
//! window — and broadcasts a [`RealtimeEvent`] for every committed mutation,
//! which makes it a complete in-process stand-in for the store plus the
//! notifier's server half.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::realtime::{broadcast_event, event_channel, RealtimeEventBroadcast};
use crate::shared::chat::{edit_window, ChatMessage, Conversation, Sender};
use crate::shared::error::StoreError;
use crate::shared::event::RealtimeEvent;
use crate::store::ConversationStore;

#[derive(Default)]
struct State {
    /// Known accounts, so lazily created conversations can resolve the
    /// receiver into a full sender record
    participants: HashMap<Uuid, Sender>,
    conversations: HashMap<Uuid, Conversation>,
    /// Messages per conversation, kept ascending by `created_at`
    messages: HashMap<Uuid, Vec<ChatMessage>>,
    /// Message id -> conversation id
    index: HashMap<Uuid, Uuid>,
}

/// Shared in-memory chat state. Cheap to clone; all clones see one store.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
    events: RealtimeEventBroadcast,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = event_channel();
        Self {
            state: Arc::new(RwLock::new(State::default())),
            events,
        }
    }

    /// Subscribe to the notifier side of the store
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.events.subscribe()
    }

    /// Make an account known to the store
    pub async fn register_participant(&self, who: Sender) {
        let mut state = self.state.write().await;
        state.participants.insert(who.id, who);
    }

    /// Open an authenticated handle bound to `identity`.
    ///
    /// Registers the identity as a participant as a side effect.
    pub async fn session(&self, identity: Sender) -> MemorySession {
        self.register_participant(identity.clone()).await;
        MemorySession {
            store: self.clone(),
            identity,
        }
    }

    /// Insert a message with an explicit timestamp, bypassing the send
    /// path. Creates the conversation if needed and refreshes its summary,
    /// but broadcasts nothing. Intended for seeding fixtures.
    pub async fn seed_message(
        &self,
        conversation_id: Uuid,
        sender: &Sender,
        receiver: &Sender,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> ChatMessage {
        let mut state = self.state.write().await;
        state.participants.entry(sender.id).or_insert_with(|| sender.clone());
        state
            .participants
            .entry(receiver.id)
            .or_insert_with(|| receiver.clone());
        state.conversations.entry(conversation_id).or_insert_with(|| {
            Conversation::between(conversation_id, sender.clone(), receiver.clone())
        });

        let message = ChatMessage {
            id: Uuid::new_v4(),
            conversation_id,
            sender: sender.clone(),
            content: content.to_string(),
            created_at,
            edited: false,
        };
        state.index.insert(message.id, conversation_id);
        let list = state.messages.entry(conversation_id).or_default();
        list.push(message.clone());
        list.sort_by_key(|m| m.created_at);
        if let Some(convo) = state.conversations.get_mut(&conversation_id) {
            convo.update_last_message(&message);
        }
        message
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Authenticated handle over a [`MemoryStore`]
#[derive(Clone)]
pub struct MemorySession {
    store: MemoryStore,
    identity: Sender,
}

impl MemorySession {
    pub fn identity(&self) -> &Sender {
        &self.identity
    }
}

impl ConversationStore for MemorySession {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let state = self.store.state.read().await;
        let mut conversations: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.has_participant(self.identity.id))
            .cloned()
            .collect();
        // Most recently active first; conversations without messages sink
        conversations.sort_by_key(|c| {
            std::cmp::Reverse(
                c.last_message
                    .as_ref()
                    .map(|m| m.timestamp)
                    .unwrap_or(c.created_at),
            )
        });
        Ok(conversations)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let state = self.store.state.read().await;
        let conversation = state
            .conversations
            .get(&conversation_id)
            .ok_or(StoreError::NotFound)?;
        if !conversation.has_participant(self.identity.id) {
            return Err(StoreError::Forbidden);
        }
        Ok(state
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        content: &str,
        receiver: Uuid,
    ) -> Result<ChatMessage, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::Http {
                status: 400,
                message: "message content cannot be empty".to_string(),
            });
        }

        let message = {
            let mut state = self.store.state.write().await;

            // Resolve the target conversation: by id, then by pair, then
            // create lazily on first send between the pair.
            let target = if state.conversations.contains_key(&conversation_id) {
                conversation_id
            } else if let Some(existing) = state
                .conversations
                .values()
                .find(|c| c.is_between(self.identity.id, receiver))
            {
                existing.id
            } else {
                let receiver_record = state
                    .participants
                    .get(&receiver)
                    .cloned()
                    .ok_or(StoreError::NotFound)?;
                let conversation = Conversation::between(
                    conversation_id,
                    self.identity.clone(),
                    receiver_record,
                );
                state.conversations.insert(conversation_id, conversation);
                conversation_id
            };

            let conversation = state
                .conversations
                .get(&target)
                .ok_or(StoreError::NotFound)?;
            if !conversation.has_participant(self.identity.id) {
                return Err(StoreError::Forbidden);
            }

            let message = ChatMessage {
                id: Uuid::new_v4(),
                conversation_id: target,
                sender: self.identity.clone(),
                content: content.to_string(),
                created_at: Utc::now(),
                edited: false,
            };
            state.index.insert(message.id, target);
            state.messages.entry(target).or_default().push(message.clone());
            if let Some(convo) = state.conversations.get_mut(&target) {
                convo.update_last_message(&message);
            }
            message
        };

        broadcast_event(&self.store.events, RealtimeEvent::NewMessage(message.clone()));
        Ok(message)
    }

    async fn edit_message(
        &self,
        message_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        let updated = {
            let mut state = self.store.state.write().await;
            let conversation_id = *state.index.get(&message_id).ok_or(StoreError::NotFound)?;
            let list = state
                .messages
                .get_mut(&conversation_id)
                .ok_or(StoreError::NotFound)?;
            let message = list
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or(StoreError::NotFound)?;

            if message.sender.id != self.identity.id {
                return Err(StoreError::Forbidden);
            }
            if Utc::now() - message.created_at > edit_window() {
                return Err(StoreError::EditWindowExpired);
            }

            message.content = content.to_string();
            message.edited = true;
            let updated = message.clone();

            // Keep the summary consistent when the newest message changes
            let is_last = list.last().map(|m| m.id) == Some(message_id);
            if is_last {
                if let Some(convo) = state.conversations.get_mut(&conversation_id) {
                    convo.update_last_message(&updated);
                }
            }
            updated
        };

        broadcast_event(
            &self.store.events,
            RealtimeEvent::MessageUpdated(updated.clone()),
        );
        Ok(updated)
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<(), StoreError> {
        {
            let mut state = self.store.state.write().await;
            let conversation_id = *state.index.get(&message_id).ok_or(StoreError::NotFound)?;
            let list = state
                .messages
                .get_mut(&conversation_id)
                .ok_or(StoreError::NotFound)?;
            let position = list
                .iter()
                .position(|m| m.id == message_id)
                .ok_or(StoreError::NotFound)?;
            if list[position].sender.id != self.identity.id {
                return Err(StoreError::Forbidden);
            }
            list.remove(position);
            let tail = list.last().cloned();
            state.index.remove(&message_id);

            if let Some(convo) = state.conversations.get_mut(&conversation_id) {
                match tail {
                    Some(message) => convo.update_last_message(&message),
                    None => convo.last_message = None,
                }
            }
        }

        broadcast_event(&self.store.events, RealtimeEvent::MessageDeleted { id: message_id });
        Ok(())
    }
}
