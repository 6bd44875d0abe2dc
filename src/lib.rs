//! LeadX Chat - Realtime Chat Core
//!
//! This library implements the realtime chat delivery core of the LeadX
//! platform, which connects prospective students with university ambassadors.
//!
//! # Overview
//!
//! The crate provides three cooperating pieces:
//!
//! - **`client`** - The chat client controller and platform API client
//!   - Per-conversation view state machine with optimistic sends
//!   - Merge/dedup of fetched, pushed, and pending messages
//!   - Async REST client over the platform chat endpoints
//!   - Notifier subscription consumer with transparent reconnection
//!
//! - **`store`** - The conversation store interface
//!   - `ConversationStore` trait consumed by the controller
//!   - In-memory reference store with lazy conversation creation,
//!     server-side edit-window enforcement, and event broadcasting
//!
//! - **`realtime`** - The notifier broadcast primitive
//!   - `tokio::sync::broadcast` fan-out of typed chat events
//!
//! - **`shared`** - Types shared across the above
//!   - Message and conversation structures, realtime event union,
//!     error taxonomy, configuration
//!
//! # Delivery model
//!
//! Realtime push is a notification channel with at-least-once semantics, not
//! the delivery path: sends always go over the request/response store call,
//! and the controller deduplicates pushed messages by id. The sender sees
//! their message immediately via an optimistic pending insert that is
//! reconciled with the server-confirmed message on completion, or rolled back
//! (with the composer text restored) on failure.
//!
//! # Thread safety
//!
//! Controller and store state live behind `tokio::sync::RwLock`; locks are
//! never held across network awaits, so overlapping fetches, sends, and event
//! dispatch remain safe.

/// Shared types and data structures
pub mod shared;

/// Conversation store interface and reference implementation
pub mod store;

/// Chat client controller, API client, and notifier subscription
pub mod client;

/// Realtime event broadcasting
pub mod realtime;

pub use client::controller::ChatController;
pub use client::session::Session;
pub use shared::chat::{ChatMessage, Conversation, Role, Sender};
pub use shared::error::{ChatError, StoreError};
pub use shared::event::RealtimeEvent;
pub use store::ConversationStore;
