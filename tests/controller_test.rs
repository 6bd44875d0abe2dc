//! Behavioral tests of the chat controller against the in-memory store:
//! dedup, optimistic rollback, stale-fetch discard, ordering, and id-based
//! update/delete.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{TimeDelta, Utc};
use pretty_assertions::assert_eq;
use tokio::sync::Notify;
use uuid::Uuid;

use leadx_chat::client::controller::{ChatController, ViewState};
use leadx_chat::shared::chat::{ChatMessage, Conversation, Role, Sender};
use leadx_chat::shared::error::{ChatError, StoreError};
use leadx_chat::shared::event::RealtimeEvent;
use leadx_chat::store::{ConversationStore, MemorySession, MemoryStore};
use leadx_chat::Session;

fn user() -> Sender {
    Sender::new(Uuid::new_v4(), "Priya", Role::User)
}

fn ambassador() -> Sender {
    Sender::new(Uuid::new_v4(), "Tom", Role::Ambassador)
}

fn session_for(sender: &Sender) -> Session {
    Session::new(sender.id, sender.name.clone(), sender.role)
}

/// Capture controller tracing in test output; honors `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn controller_for(
    store: &MemoryStore,
    identity: &Sender,
) -> ChatController<MemorySession> {
    init_tracing();
    let session = store.session(identity.clone()).await;
    ChatController::new(Arc::new(session), session_for(identity))
}

fn pushed_message(conversation_id: Uuid, sender: &Sender, content: &str, at_offset: i64) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4(),
        conversation_id,
        sender: sender.clone(),
        content: content.to_string(),
        created_at: Utc::now() + TimeDelta::seconds(at_offset),
        edited: false,
    }
}

#[tokio::test]
async fn fetched_and_pushed_copies_of_a_message_appear_once() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    let seeded = store
        .seed_message(conversation_id, &priya, &tom, "hello", Utc::now())
        .await;

    let controller = controller_for(&store, &priya).await;
    controller.open_conversation(conversation_id).await.unwrap();

    // At-least-once delivery: the same message arrives twice more via push
    controller
        .on_realtime_event(RealtimeEvent::NewMessage(seeded.clone()))
        .await;
    controller
        .on_realtime_event(RealtimeEvent::NewMessage(seeded.clone()))
        .await;

    let messages = controller.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].confirmed().unwrap().id, seeded.id);
}

/// Store wrapper whose sends always fail at the transport layer.
struct FailingSends {
    inner: MemorySession,
}

impl ConversationStore for FailingSends {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        self.inner.list_conversations().await
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        self.inner.list_messages(conversation_id).await
    }

    async fn send_message(
        &self,
        _conversation_id: Uuid,
        _content: &str,
        _receiver: Uuid,
    ) -> Result<ChatMessage, StoreError> {
        Err(StoreError::Network("connection reset".to_string()))
    }

    async fn edit_message(
        &self,
        message_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        self.inner.edit_message(message_id, content).await
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<(), StoreError> {
        self.inner.delete_message(message_id).await
    }
}

#[tokio::test]
async fn failed_send_rolls_back_and_restores_composer_text() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    store
        .seed_message(conversation_id, &tom, &priya, "welcome!", Utc::now())
        .await;

    let inner = store.session(priya.clone()).await;
    let controller = ChatController::new(
        Arc::new(FailingSends { inner }),
        session_for(&priya),
    );
    controller.open_conversation(conversation_id).await.unwrap();

    let result = controller
        .send_message(conversation_id, tom.id, "hello")
        .await;
    assert_matches!(result, Err(ChatError::Send { .. }));

    let messages = controller.messages().await;
    assert!(messages.iter().all(|e| e.content() != "hello"));
    assert!(!messages.iter().any(|e| e.is_pending()));
    assert_eq!(controller.take_restored_input().await.as_deref(), Some("hello"));
    // The stash is consumed once
    assert_eq!(controller.take_restored_input().await, None);
}

#[tokio::test]
async fn every_failed_send_keeps_its_own_composer_text() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    store
        .seed_message(conversation_id, &tom, &priya, "welcome!", Utc::now())
        .await;

    let inner = store.session(priya.clone()).await;
    let controller = ChatController::new(
        Arc::new(FailingSends { inner }),
        session_for(&priya),
    );
    controller.open_conversation(conversation_id).await.unwrap();

    for draft in ["first draft", "second draft"] {
        let result = controller.send_message(conversation_id, tom.id, draft).await;
        assert_matches!(result, Err(ChatError::Send { .. }));
    }

    // Neither failure's text is lost; restoration follows failure order.
    assert_eq!(
        controller.take_restored_input().await.as_deref(),
        Some("first draft")
    );
    assert_eq!(
        controller.take_restored_input().await.as_deref(),
        Some("second draft")
    );
    assert_eq!(controller.take_restored_input().await, None);
}

#[tokio::test]
async fn successful_send_replaces_the_pending_entry() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    store
        .seed_message(conversation_id, &tom, &priya, "welcome!", Utc::now() - TimeDelta::minutes(1))
        .await;

    let controller = controller_for(&store, &priya).await;
    controller.open_conversation(conversation_id).await.unwrap();

    let sent = controller
        .send_message(conversation_id, tom.id, "  hello  ")
        .await
        .unwrap();
    assert_eq!(sent.content, "hello");

    let messages = controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|e| !e.is_pending()));
    assert_eq!(messages[1].confirmed().unwrap().id, sent.id);
}

#[tokio::test]
async fn empty_send_is_rejected_before_any_request() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let controller = controller_for(&store, &priya).await;

    let result = controller
        .send_message(Uuid::new_v4(), tom.id, "   ")
        .await;
    assert_matches!(result, Err(ChatError::Validation { .. }));
    assert!(controller.messages().await.is_empty());
}

#[tokio::test]
async fn send_requires_the_target_conversation_to_be_open() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_a = Uuid::new_v4();
    let conversation_b = Uuid::new_v4();
    store
        .seed_message(conversation_a, &tom, &priya, "in A", Utc::now())
        .await;
    store
        .seed_message(conversation_b, &tom, &priya, "in B", Utc::now())
        .await;

    let controller = controller_for(&store, &priya).await;

    // No conversation open at all.
    let result = controller.send_message(conversation_a, tom.id, "hello").await;
    assert_matches!(result, Err(ChatError::Validation { .. }));

    // A different conversation open.
    controller.open_conversation(conversation_a).await.unwrap();
    let result = controller.send_message(conversation_b, tom.id, "hello").await;
    assert_matches!(result, Err(ChatError::Validation { .. }));

    // Nothing was committed to the store by the rejected sends.
    let session = store.session(priya.clone()).await;
    assert_eq!(session.list_messages(conversation_a).await.unwrap().len(), 1);
    assert_eq!(session.list_messages(conversation_b).await.unwrap().len(), 1);

    // The open conversation still accepts sends.
    controller
        .send_message(conversation_a, tom.id, "hello")
        .await
        .unwrap();
    assert_eq!(controller.messages().await.len(), 2);
}

/// Store wrapper that parks `list_messages` for one conversation until
/// released, to stage overlapping fetches.
struct GatedHistory {
    inner: MemorySession,
    gated: Uuid,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl ConversationStore for GatedHistory {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        self.inner.list_conversations().await
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        if conversation_id == self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.list_messages(conversation_id).await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        content: &str,
        receiver: Uuid,
    ) -> Result<ChatMessage, StoreError> {
        self.inner.send_message(conversation_id, content, receiver).await
    }

    async fn edit_message(
        &self,
        message_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        self.inner.edit_message(message_id, content).await
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<(), StoreError> {
        self.inner.delete_message(message_id).await
    }
}

#[tokio::test]
async fn stale_fetch_result_never_lands_in_the_new_view() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_a = Uuid::new_v4();
    let conversation_b = Uuid::new_v4();
    store
        .seed_message(conversation_a, &priya, &tom, "from A", Utc::now())
        .await;
    store
        .seed_message(conversation_b, &priya, &tom, "from B", Utc::now())
        .await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gated = GatedHistory {
        inner: store.session(priya.clone()).await,
        gated: conversation_a,
        entered: entered.clone(),
        release: release.clone(),
    };
    let controller = Arc::new(ChatController::new(Arc::new(gated), session_for(&priya)));

    // Open A; its fetch parks inside the store.
    let open_a = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.open_conversation(conversation_a).await })
    };
    entered.notified().await;

    // Switch to B before A's fetch resolves.
    controller.open_conversation(conversation_b).await.unwrap();

    // Now let A's stale fetch complete.
    release.notify_one();
    open_a.await.unwrap().unwrap();

    assert_eq!(controller.open_conversation_id().await, Some(conversation_b));
    assert_eq!(controller.view_state().await, Some(ViewState::Ready));
    let contents: Vec<_> = controller
        .messages()
        .await
        .iter()
        .map(|e| e.content().to_string())
        .collect();
    assert_eq!(contents, vec!["from B".to_string()]);
}

#[tokio::test]
async fn pushed_messages_render_sorted_regardless_of_arrival_order() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    store
        .seed_message(conversation_id, &tom, &priya, "start", Utc::now() - TimeDelta::minutes(1))
        .await;

    let controller = controller_for(&store, &priya).await;
    controller.open_conversation(conversation_id).await.unwrap();

    // Arrival order 1s, 3s, 2s
    for offset in [1, 3, 2] {
        controller
            .on_realtime_event(RealtimeEvent::NewMessage(pushed_message(
                conversation_id,
                &tom,
                &format!("t+{}", offset),
                offset,
            )))
            .await;
    }

    let stamps: Vec<_> = controller
        .messages()
        .await
        .iter()
        .map(|e| e.created_at())
        .collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);
    assert_eq!(
        controller
            .messages()
            .await
            .iter()
            .map(|e| e.content().to_string())
            .collect::<Vec<_>>(),
        vec!["start", "t+1", "t+2", "t+3"]
    );
}

#[tokio::test]
async fn update_and_delete_match_by_id_and_ignore_unknowns() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    let first = store
        .seed_message(conversation_id, &tom, &priya, "original", Utc::now() - TimeDelta::seconds(10))
        .await;
    let second = store
        .seed_message(conversation_id, &tom, &priya, "untouched", Utc::now())
        .await;

    let controller = controller_for(&store, &priya).await;
    controller.open_conversation(conversation_id).await.unwrap();

    let mut edited = first.clone();
    edited.content = "edited".to_string();
    edited.edited = true;
    controller
        .on_realtime_event(RealtimeEvent::MessageUpdated(edited))
        .await;

    let messages = controller.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].confirmed().unwrap().id, first.id);
    assert_eq!(messages[0].content(), "edited");
    assert_eq!(messages[1].confirmed().unwrap().id, second.id);
    assert_eq!(messages[1].content(), "untouched");

    // Unknown ids are silently ignored for both updates and deletes
    let ghost = pushed_message(conversation_id, &tom, "ghost", 5);
    controller
        .on_realtime_event(RealtimeEvent::MessageUpdated(ghost.clone()))
        .await;
    controller
        .on_realtime_event(RealtimeEvent::MessageDeleted { id: ghost.id })
        .await;
    assert_eq!(controller.messages().await.len(), 2);

    controller
        .on_realtime_event(RealtimeEvent::MessageDeleted { id: first.id })
        .await;
    let messages = controller.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].confirmed().unwrap().id, second.id);
}

#[tokio::test]
async fn new_message_event_refreshes_conversation_summaries() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    store
        .seed_message(conversation_id, &priya, &tom, "first", Utc::now() - TimeDelta::minutes(2))
        .await;

    let controller = controller_for(&store, &priya).await;
    controller.refresh_conversations().await.unwrap();
    assert!(!controller.conversations_stale());

    // A push for a different (unopened) conversation still marks the list
    // stale and updates the local summary when the conversation is known.
    let pushed = pushed_message(conversation_id, &tom, "latest news", 0);
    controller
        .on_realtime_event(RealtimeEvent::NewMessage(pushed.clone()))
        .await;

    assert!(controller.conversations_stale());
    let conversations = controller.conversations().await;
    let summary = conversations[0].last_message.as_ref().unwrap();
    assert_eq!(summary.content, "latest news");
    assert_eq!(summary.sender, tom.id);
}

#[tokio::test]
async fn edit_flows_through_the_store_authority() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    let fresh = store
        .seed_message(conversation_id, &priya, &tom, "helo", Utc::now() - TimeDelta::minutes(1))
        .await;
    let expired = store
        .seed_message(conversation_id, &priya, &tom, "old", Utc::now() - TimeDelta::minutes(6))
        .await;

    let controller = controller_for(&store, &priya).await;
    controller.open_conversation(conversation_id).await.unwrap();

    // While an edit is in progress, sends are rejected.
    controller.begin_edit(fresh.id).await;
    let blocked = controller
        .send_message(conversation_id, tom.id, "another")
        .await;
    assert_matches!(blocked, Err(ChatError::Validation { .. }));

    controller.edit_message(fresh.id, "hello").await.unwrap();
    assert_eq!(controller.editing().await, None);
    let messages = controller.messages().await;
    let edited = messages
        .iter()
        .find(|e| e.confirmed().map(|m| m.id) == Some(fresh.id))
        .unwrap();
    assert_eq!(edited.content(), "hello");
    // Edits keep position and timestamp.
    assert_eq!(edited.created_at(), fresh.created_at);

    // The store rejects the expired edit even though the client asked;
    // this surfaces as a notice, not a crash, and the view is unchanged.
    let result = controller.edit_message(expired.id, "rewrite").await;
    assert_matches!(result, Err(ChatError::EditWindowExpired));
    let messages = controller.messages().await;
    let untouched = messages
        .iter()
        .find(|e| e.confirmed().map(|m| m.id) == Some(expired.id))
        .unwrap();
    assert_eq!(untouched.content(), "old");
}

#[tokio::test]
async fn delete_waits_for_store_confirmation() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    let message = store
        .seed_message(conversation_id, &priya, &tom, "remove me", Utc::now())
        .await;

    let controller = controller_for(&store, &priya).await;
    controller.open_conversation(conversation_id).await.unwrap();

    controller.delete_message(message.id).await.unwrap();
    assert!(controller.messages().await.is_empty());

    // Deleting an already-vanished message is a quiet no-op.
    controller.delete_message(message.id).await.unwrap();
}

#[tokio::test]
async fn fetch_failure_leaves_a_retryable_view() {
    let store = MemoryStore::new();
    let (priya, tom) = (user(), ambassador());
    let conversation_id = Uuid::new_v4();
    store
        .seed_message(conversation_id, &priya, &tom, "hello", Utc::now())
        .await;

    // Outsiders are rejected by the store's participant validation.
    let mallory = user();
    let controller = controller_for(&store, &mallory).await;
    let result = controller.open_conversation(conversation_id).await;
    assert_matches!(result, Err(ChatError::Fetch { .. }));
    assert_eq!(controller.view_state().await, Some(ViewState::Failed));

    // Retrying as a participant works and holds exactly one copy.
    let controller = controller_for(&store, &priya).await;
    controller.open_conversation(conversation_id).await.unwrap();
    controller.open_conversation(conversation_id).await.unwrap();
    assert_eq!(controller.messages().await.len(), 1);
}
