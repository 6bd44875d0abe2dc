//! Chat Client Controller
//!
//! Per-open-conversation state machine reconciling three message sources —
//! the initial history fetch, optimistic local inserts, and realtime push —
//! into one merged, deduplicated, time-ordered view.
//!
//! # Optimistic sends
//!
//! `send_message` inserts a pending entry immediately so the sender sees
//! their message with zero perceived latency, then issues the store call.
//! On success the pending entry is replaced (matched by its own id, never a
//! positional index) with the server-confirmed message; on failure it is
//! removed and the typed text is stashed for the composer to restore.
//! Several sends may be in flight at once; each carries its own pending id.
//!
//! # Stale fetches
//!
//! Opening a conversation bumps a fetch epoch. A history response whose
//! epoch is no longer current is discarded, so switching from conversation
//! A to B while A's fetch is in flight can never leak A's messages into
//! B's view.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::client::session::Session;
use crate::shared::chat::{ChatMessage, Conversation, Sender};
use crate::shared::error::{ChatError, StoreError};
use crate::shared::event::RealtimeEvent;
use crate::store::ConversationStore;

/// Client-local identifier for an in-flight send.
///
/// A distinct type from server-assigned message ids, so the two can never
/// collide or be confused during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingId(Uuid);

impl PendingId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A not-yet-confirmed optimistic insert. Never persisted; exists only in
/// the controller's view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub id: PendingId,
    pub conversation_id: Uuid,
    pub sender: Sender,
    pub content: String,
    /// Provisional client-clock timestamp, superseded by the server's on
    /// confirmation
    pub queued_at: DateTime<Utc>,
}

/// One entry of the merged message view
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEntry {
    /// Server-confirmed message
    Confirmed(ChatMessage),
    /// Optimistic insert awaiting confirmation
    Pending(PendingMessage),
}

impl ViewEntry {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ViewEntry::Confirmed(message) => message.created_at,
            ViewEntry::Pending(pending) => pending.queued_at,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            ViewEntry::Confirmed(message) => &message.content,
            ViewEntry::Pending(pending) => &pending.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ViewEntry::Pending(_))
    }

    pub fn confirmed(&self) -> Option<&ChatMessage> {
        match self {
            ViewEntry::Confirmed(message) => Some(message),
            ViewEntry::Pending(_) => None,
        }
    }
}

/// Lifecycle of an open conversation's view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// History fetch in flight
    Loading,
    /// History loaded; sends may overlap freely
    Ready,
    /// History fetch failed; retry by opening again
    Failed,
}

#[derive(Debug)]
struct ConversationView {
    conversation_id: Uuid,
    state: ViewState,
    entries: Vec<ViewEntry>,
    epoch: u64,
}

impl ConversationView {
    fn loading(conversation_id: Uuid, epoch: u64) -> Self {
        Self {
            conversation_id,
            state: ViewState::Loading,
            entries: Vec::new(),
            epoch,
        }
    }

    fn contains_confirmed(&self, id: Uuid) -> bool {
        self.entries
            .iter()
            .any(|e| e.confirmed().map(|m| m.id) == Some(id))
    }

    /// Insert keeping ascending `created_at`; ties land after their equals,
    /// preserving arrival order.
    fn insert_sorted(&mut self, entry: ViewEntry) {
        let at = entry.created_at();
        let position = self.entries.partition_point(|e| e.created_at() <= at);
        self.entries.insert(position, entry);
    }

    /// Merge fetched history into the view, deduplicating by id against
    /// anything realtime push already delivered. Pending entries survive.
    fn apply_history(&mut self, messages: Vec<ChatMessage>) {
        for message in messages {
            if !self.contains_confirmed(message.id) {
                self.insert_sorted(ViewEntry::Confirmed(message));
            }
        }
        self.state = ViewState::Ready;
    }

    /// Swap a pending entry for its server-confirmed message, preserving
    /// its position. If realtime push already delivered the confirmed
    /// message, the pending entry is simply dropped so the send is never
    /// shown twice.
    fn resolve_pending(&mut self, pending_id: PendingId, message: ChatMessage) {
        if self.contains_confirmed(message.id) {
            self.remove_pending(pending_id);
            return;
        }
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| matches!(e, ViewEntry::Pending(p) if p.id == pending_id))
        {
            *entry = ViewEntry::Confirmed(message);
        }
    }

    fn remove_pending(&mut self, pending_id: PendingId) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !matches!(e, ViewEntry::Pending(p) if p.id == pending_id));
        self.entries.len() != before
    }

    /// Replace a confirmed message in place by id; position untouched
    fn replace_confirmed(&mut self, message: ChatMessage) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.confirmed().map(|m| m.id) == Some(message.id))
        {
            Some(entry) => {
                *entry = ViewEntry::Confirmed(message);
                true
            }
            None => false,
        }
    }

    fn remove_confirmed(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| e.confirmed().map(|m| m.id) != Some(id));
        self.entries.len() != before
    }
}

/// The chat client controller for one authenticated session.
///
/// All methods take `&self`; internal state sits behind async locks that
/// are never held across a network await, so fetches, sends, and event
/// dispatch may overlap freely. No state is shared across conversations
/// beyond the single open view.
pub struct ChatController<S> {
    store: Arc<S>,
    session: Session,
    view: RwLock<Option<ConversationView>>,
    conversations: RwLock<Vec<Conversation>>,
    conversations_stale: AtomicBool,
    /// Composer text of failed sends, oldest first
    restored_input: Mutex<Vec<String>>,
    editing: Mutex<Option<Uuid>>,
    epoch: AtomicU64,
}

impl<S: ConversationStore> ChatController<S> {
    pub fn new(store: Arc<S>, session: Session) -> Self {
        Self {
            store,
            session,
            view: RwLock::new(None),
            conversations: RwLock::new(Vec::new()),
            conversations_stale: AtomicBool::new(true),
            restored_input: Mutex::new(Vec::new()),
            editing: Mutex::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Open a conversation, replacing the current view with its full
    /// history. A fetch that resolves after another conversation was opened
    /// is discarded. On failure the view is left in [`ViewState::Failed`]
    /// and may be retried by calling this again; the dedup-by-id merge
    /// guarantees a retry never duplicates messages.
    pub async fn open_conversation(&self, conversation_id: Uuid) -> Result<(), ChatError> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut view = self.view.write().await;
            *view = Some(ConversationView::loading(conversation_id, epoch));
        }

        let result = self.store.list_messages(conversation_id).await;

        let mut view = self.view.write().await;
        let current = match view.as_mut() {
            Some(v) if v.epoch == epoch => v,
            _ => {
                tracing::debug!(
                    "[chat] discarding stale history fetch for conversation {}",
                    conversation_id
                );
                return Ok(());
            }
        };
        match result {
            Ok(messages) => {
                current.apply_history(messages);
                Ok(())
            }
            Err(source) => {
                current.state = ViewState::Failed;
                tracing::error!(
                    "[chat] history load failed for conversation {}: {}",
                    conversation_id,
                    source
                );
                Err(ChatError::Fetch { source })
            }
        }
    }

    /// Close the current conversation. Any in-flight history fetch for it
    /// becomes stale and will be discarded.
    pub async fn close_conversation(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.view.write().await = None;
    }

    /// Send a message, optimistically inserting it into the view first.
    ///
    /// The target conversation must be the open one; sends into a closed or
    /// different conversation are rejected before any request, like empty
    /// content. On failure the pending entry is rolled back and the typed
    /// text is available from
    /// [`take_restored_input`](Self::take_restored_input) so nothing the
    /// user wrote is lost.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        receiver: Uuid,
        content: &str,
    ) -> Result<ChatMessage, ChatError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::validation(
                "content",
                "message content cannot be empty",
            ));
        }
        if self.editing.lock().await.is_some() {
            return Err(ChatError::validation(
                "composer",
                "finish or cancel the edit in progress first",
            ));
        }

        let pending = PendingMessage {
            id: PendingId::new(),
            conversation_id,
            sender: self.session.as_sender(),
            content: trimmed.to_string(),
            queued_at: Utc::now(),
        };
        let pending_id = pending.id;
        {
            let mut view = self.view.write().await;
            match view.as_mut() {
                Some(v) if v.conversation_id == conversation_id => {
                    v.insert_sorted(ViewEntry::Pending(pending));
                }
                _ => {
                    return Err(ChatError::validation(
                        "conversation",
                        "conversation is not open",
                    ));
                }
            }
        }

        match self
            .store
            .send_message(conversation_id, trimmed, receiver)
            .await
        {
            Ok(message) => {
                {
                    let mut view = self.view.write().await;
                    if let Some(v) = view.as_mut() {
                        v.resolve_pending(pending_id, message.clone());
                    }
                }
                self.note_last_message(&message).await;
                Ok(message)
            }
            Err(source) => {
                {
                    let mut view = self.view.write().await;
                    if let Some(v) = view.as_mut() {
                        v.remove_pending(pending_id);
                    }
                }
                self.restored_input.lock().await.push(content.to_string());
                tracing::warn!("[chat] send failed, pending message rolled back: {}", source);
                Err(ChatError::Send { source })
            }
        }
    }

    /// Take the composer text of the oldest failed send still stashed.
    /// Concurrent sends may fail independently; each failure keeps its own
    /// text, returned here in failure order.
    pub async fn take_restored_input(&self) -> Option<String> {
        let mut stash = self.restored_input.lock().await;
        if stash.is_empty() {
            None
        } else {
            Some(stash.remove(0))
        }
    }

    /// Whether the edit control should be offered for a message. Purely
    /// speculative; the store still decides.
    pub fn can_edit(&self, message: &ChatMessage) -> bool {
        message.editable_by(self.session.id, Utc::now())
    }

    /// Mark a message as being edited in the composer. While an edit is in
    /// progress new sends are rejected.
    pub async fn begin_edit(&self, message_id: Uuid) {
        *self.editing.lock().await = Some(message_id);
    }

    /// Abandon the edit in progress
    pub async fn cancel_edit(&self) {
        *self.editing.lock().await = None;
    }

    /// The message currently being edited, if any
    pub async fn editing(&self) -> Option<Uuid> {
        *self.editing.lock().await
    }

    /// Edit a message's content in place. The store is the authority on
    /// the edit window; [`ChatError::EditWindowExpired`] is a non-fatal
    /// notice, not a crash. Position and timestamp are unchanged.
    pub async fn edit_message(&self, message_id: Uuid, content: &str) -> Result<(), ChatError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::validation(
                "content",
                "message content cannot be empty",
            ));
        }

        let result = match self.store.edit_message(message_id, trimmed).await {
            Ok(updated) => {
                let mut view = self.view.write().await;
                if let Some(v) = view.as_mut() {
                    v.replace_confirmed(updated);
                }
                self.conversations_stale.store(true, Ordering::Relaxed);
                Ok(())
            }
            Err(source) => Err(ChatError::from_mutation(source)),
        };

        // The edit attempt is over either way; unblock the composer.
        let mut editing = self.editing.lock().await;
        if *editing == Some(message_id) {
            *editing = None;
        }
        result
    }

    /// Delete a message. No optimistic pre-removal: the entry leaves the
    /// view only on store confirmation. A store `NotFound` means the
    /// message already vanished and is treated as confirmation.
    pub async fn delete_message(&self, message_id: Uuid) -> Result<(), ChatError> {
        match self.store.delete_message(message_id).await {
            Ok(()) | Err(StoreError::NotFound) => {
                let mut view = self.view.write().await;
                if let Some(v) = view.as_mut() {
                    v.remove_confirmed(message_id);
                }
                self.conversations_stale.store(true, Ordering::Relaxed);
                Ok(())
            }
            Err(source) => Err(ChatError::from_mutation(source)),
        }
    }

    /// Single dispatcher for notifier events. Tolerates at-least-once and
    /// out-of-order delivery: new messages are deduplicated by id, and
    /// updates or deletes for ids not in the view are silently ignored.
    pub async fn on_realtime_event(&self, event: RealtimeEvent) {
        match event {
            RealtimeEvent::NewMessage(message) => {
                {
                    let mut view = self.view.write().await;
                    if let Some(v) = view.as_mut() {
                        if v.conversation_id == message.conversation_id
                            && !v.contains_confirmed(message.id)
                        {
                            v.insert_sorted(ViewEntry::Confirmed(message.clone()));
                        } else {
                            tracing::debug!(
                                "[chat] ignoring duplicate or out-of-view message {}",
                                message.id
                            );
                        }
                    }
                }
                // Whether or not the open view matched, the conversation
                // list's last-message summaries are stale now.
                self.note_last_message(&message).await;
                self.conversations_stale.store(true, Ordering::Relaxed);
            }
            RealtimeEvent::MessageUpdated(message) => {
                let mut view = self.view.write().await;
                if let Some(v) = view.as_mut() {
                    if !v.replace_confirmed(message) {
                        tracing::debug!("[chat] update for unknown message ignored");
                    }
                }
            }
            RealtimeEvent::MessageDeleted { id } => {
                let mut view = self.view.write().await;
                if let Some(v) = view.as_mut() {
                    v.remove_confirmed(id);
                }
            }
        }
    }

    /// Refetch the conversation list with its last-message summaries
    pub async fn refresh_conversations(&self) -> Result<(), ChatError> {
        let list = self
            .store
            .list_conversations()
            .await
            .map_err(|source| ChatError::Fetch { source })?;
        *self.conversations.write().await = list;
        self.conversations_stale.store(false, Ordering::Relaxed);
        Ok(())
    }

    /// Snapshot of the conversation list
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.conversations.read().await.clone()
    }

    /// Whether the conversation list should be refetched
    pub fn conversations_stale(&self) -> bool {
        self.conversations_stale.load(Ordering::Relaxed)
    }

    /// Snapshot of the merged message view for rendering
    pub async fn messages(&self) -> Vec<ViewEntry> {
        self.view
            .read()
            .await
            .as_ref()
            .map(|v| v.entries.clone())
            .unwrap_or_default()
    }

    /// Lifecycle state of the open view, if any
    pub async fn view_state(&self) -> Option<ViewState> {
        self.view.read().await.as_ref().map(|v| v.state)
    }

    /// The currently open conversation, if any
    pub async fn open_conversation_id(&self) -> Option<Uuid> {
        self.view.read().await.as_ref().map(|v| v.conversation_id)
    }

    /// Update the local last-message summary for a committed message
    async fn note_last_message(&self, message: &ChatMessage) {
        let mut conversations = self.conversations.write().await;
        if let Some(conversation) = conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
        {
            conversation.update_last_message(message);
        }
    }
}
