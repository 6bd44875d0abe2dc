//! Shared Types
//!
//! Types used by both the client controller and store implementations:
//! chat data structures, the realtime event union, error taxonomy, and
//! application configuration.

pub mod chat;
pub mod config;
pub mod error;
pub mod event;

pub use chat::{ChatMessage, Conversation, LastMessage, Role, Sender};
pub use error::{ChatError, StoreError};
pub use event::RealtimeEvent;
