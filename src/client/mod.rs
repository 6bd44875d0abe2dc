//! Chat Client
//!
//! Everything a LeadX client session needs: the explicit identity context,
//! configuration, the REST store client, the conversation controller, and
//! the notifier subscription consumer.

pub mod api;
pub mod config;
pub mod controller;
pub mod session;
pub mod subscription;

pub use api::ChatApiClient;
pub use config::Config;
pub use controller::{ChatController, PendingId, ViewEntry, ViewState};
pub use session::Session;
pub use subscription::{NotifierClient, Subscription};
