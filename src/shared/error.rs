//! Shared Error Types
//!
//! Two layers of failure: `StoreError` describes what went wrong talking to
//! the conversation store (transport, status mapping, authority decisions),
//! and `ChatError` is the controller-level taxonomy surfaced to the
//! application. Every variant is local-recoverable; none is fatal to the
//! session.

use thiserror::Error;

/// Failures from a conversation store implementation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport-level failure (connection refused, timeout, DNS)
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status without a more specific meaning
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// Caller is not a participant of the target conversation
    #[error("not a participant of this conversation")]
    Forbidden,

    /// Edit rejected by the store's authoritative 5-minute window
    #[error("edit window has expired")]
    EditWindowExpired,

    /// Target message or conversation does not exist
    #[error("message or conversation not found")]
    NotFound,

    /// Response body could not be decoded
    #[error("failed to decode response: {0}")]
    Serialization(String),
}

/// Controller-level errors surfaced to the application
#[derive(Debug, Error)]
pub enum ChatError {
    /// History load failed; the existing view is untouched and the
    /// operation may be retried without duplicating messages.
    #[error("failed to load messages: {source}")]
    Fetch {
        #[source]
        source: StoreError,
    },

    /// A mutating request (send/edit/delete) failed. For sends the pending
    /// message has been rolled back and the composer text restored.
    #[error("request failed: {source}")]
    Send {
        #[source]
        source: StoreError,
    },

    /// Edit rejected by the store authority; surface as a transient notice
    #[error("edit window has expired")]
    EditWindowExpired,

    /// Target vanished; callers usually treat this as a no-op
    #[error("message or conversation not found")]
    NotFound,

    /// Precondition failed before any request was issued
    #[error("validation error in field '{field}': {message}")]
    Validation { field: String, message: String },
}

impl ChatError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Map a store failure from a mutating call, preserving the variants
    /// the store is authoritative about.
    pub fn from_mutation(source: StoreError) -> Self {
        match source {
            StoreError::EditWindowExpired => Self::EditWindowExpired,
            StoreError::NotFound => Self::NotFound,
            other => Self::Send { source: other },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let error = ChatError::validation("content", "message content cannot be empty");
        let display = format!("{}", error);
        assert!(display.contains("content"));
        assert!(display.contains("cannot be empty"));
    }

    #[test]
    fn test_fetch_preserves_source() {
        let error = ChatError::Fetch {
            source: StoreError::Network("connection refused".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("failed to load messages"));
    }

    #[test]
    fn test_from_mutation_passes_through_authority_variants() {
        assert!(matches!(
            ChatError::from_mutation(StoreError::EditWindowExpired),
            ChatError::EditWindowExpired
        ));
        assert!(matches!(
            ChatError::from_mutation(StoreError::NotFound),
            ChatError::NotFound
        ));
    }

    #[test]
    fn test_from_mutation_wraps_transport() {
        let error = ChatError::from_mutation(StoreError::Network("timeout".to_string()));
        match error {
            ChatError::Send { source } => {
                assert_eq!(source, StoreError::Network("timeout".to_string()));
            }
            other => panic!("expected Send, got {:?}", other),
        }
    }

    #[test]
    fn test_store_error_display() {
        let error = StoreError::Http {
            status: 500,
            message: "internal".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "request failed with status 500: internal"
        );
    }
}
