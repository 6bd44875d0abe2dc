//! Chat Data Structures
//!
//! Message and conversation types plus the wire request payloads.

pub mod conversation;
pub mod message;

pub use conversation::{Conversation, LastMessage};
pub use message::{
    edit_window, ChatMessage, EditMessageRequest, Role, SendMessageRequest, Sender,
    EDIT_WINDOW_SECS, LAST_MESSAGE_PREVIEW_LEN,
};
