//! Session Identity
//!
//! The authenticated identity a controller acts as. Passed in explicitly at
//! construction instead of being read from ambient global state, so every
//! consumer of the controller can see exactly whose view it is.

use uuid::Uuid;

use crate::shared::chat::{Role, Sender};

/// Authenticated identity context for one client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Account ID
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Platform role
    pub role: Role,
}

impl Session {
    pub fn new(id: Uuid, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }

    /// This identity as a message sender record
    pub fn as_sender(&self) -> Sender {
        Sender::new(self.id, self.name.clone(), self.role)
    }
}
