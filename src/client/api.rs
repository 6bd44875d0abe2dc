//! Chat API Client
//!
//! Async REST client over the platform chat endpoints, implementing
//! [`ConversationStore`]. The caller's identity is the bearer token; the
//! platform resolves it server-side.
//!
//! This is also where wire shapes are normalized: some payloads deliver
//! `sender` as a bare account id, others as a populated object. Both decode
//! into a resolved [`Sender`] here so nothing above this boundary branches
//! on shape.

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::client::config::Config;
use crate::shared::chat::{
    ChatMessage, Conversation, EditMessageRequest, LastMessage, Role, SendMessageRequest, Sender,
};
use crate::shared::error::StoreError;
use crate::store::ConversationStore;

/// REST client for the platform chat API
#[derive(Debug, Clone)]
pub struct ChatApiClient {
    config: Config,
    client: Client,
}

/// Wire shape of a message sender: either a bare id or a populated object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireSender {
    Resolved {
        #[serde(alias = "_id")]
        id: Uuid,
        #[serde(default)]
        name: String,
        #[serde(default)]
        role: Role,
    },
    Bare(Uuid),
}

impl WireSender {
    fn normalize(self) -> Sender {
        match self {
            WireSender::Resolved { id, name, role } => Sender::new(id, name, role),
            WireSender::Bare(id) => Sender::unresolved(id),
        }
    }

    fn id(&self) -> Uuid {
        match self {
            WireSender::Resolved { id, .. } => *id,
            WireSender::Bare(id) => *id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessage {
    #[serde(alias = "_id")]
    id: Uuid,
    #[serde(alias = "chat")]
    conversation_id: Uuid,
    sender: WireSender,
    content: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    edited: bool,
}

impl WireMessage {
    fn normalize(self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            conversation_id: self.conversation_id,
            sender: self.sender.normalize(),
            content: self.content,
            created_at: self.created_at,
            edited: self.edited,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLastMessage {
    content: String,
    sender: WireSender,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireConversation {
    #[serde(alias = "_id")]
    id: Uuid,
    user: WireSender,
    ambassador: WireSender,
    last_message: Option<WireLastMessage>,
    created_at: DateTime<Utc>,
}

impl WireConversation {
    fn normalize(self) -> Conversation {
        Conversation {
            id: self.id,
            user: self.user.normalize(),
            ambassador: self.ambassador.normalize(),
            last_message: self.last_message.map(|m| LastMessage {
                content: m.content,
                sender: m.sender.id(),
                timestamp: m.timestamp,
            }),
            created_at: self.created_at,
        }
    }
}

impl ChatApiClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let token = self.config.token().ok_or_else(|| StoreError::Http {
            status: 401,
            message: "not authenticated".to_string(),
        })?;
        Ok(request.header("Authorization", format!("Bearer {}", token)))
    }

    /// Map a non-success response to a store error, with per-status
    /// refinement where the platform gives a status a specific meaning.
    async fn status_error(response: Response) -> StoreError {
        let status = response.status();
        let message = response.text().await.unwrap_or_else(|_| status.to_string());
        match status.as_u16() {
            403 => StoreError::Forbidden,
            404 => StoreError::NotFound,
            _ => StoreError::Http {
                status: status.as_u16(),
                message,
            },
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl ConversationStore for ChatApiClient {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let url = self.config.api_url("/chats/mine");
        let response = self
            .authorized(self.client.get(&url))?
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        let wire: Vec<WireConversation> = Self::decode(response).await?;
        Ok(wire.into_iter().map(WireConversation::normalize).collect())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>, StoreError> {
        let url = self.config.api_url(&format!("/chats/{}", conversation_id));
        let response = self
            .authorized(self.client.get(&url))?
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        let wire: Vec<WireMessage> = Self::decode(response).await?;
        Ok(wire.into_iter().map(WireMessage::normalize).collect())
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        content: &str,
        receiver: Uuid,
    ) -> Result<ChatMessage, StoreError> {
        let url = self.config.api_url("/chats/send");
        let body = SendMessageRequest {
            chat_id: conversation_id,
            content: content.to_string(),
            receiver,
        };
        let response = self
            .authorized(self.client.post(&url))?
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        Ok(Self::decode::<WireMessage>(response).await?.normalize())
    }

    async fn edit_message(
        &self,
        message_id: Uuid,
        content: &str,
    ) -> Result<ChatMessage, StoreError> {
        let url = self.config.api_url(&format!("/chats/message/{}", message_id));
        let body = EditMessageRequest {
            content: content.to_string(),
        };
        let response = self
            .authorized(self.client.put(&url))?
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !response.status().is_success() {
            // The platform answers 403 here specifically when the 5-minute
            // window has passed; the store is the authority on that.
            if response.status().as_u16() == 403 {
                return Err(StoreError::EditWindowExpired);
            }
            return Err(Self::status_error(response).await);
        }
        Ok(Self::decode::<WireMessage>(response).await?.normalize())
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<(), StoreError> {
        let url = self.config.api_url(&format!("/chats/message/{}", message_id));
        let response = self
            .authorized(self.client.delete(&url))?
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        Ok(())
    }
}
