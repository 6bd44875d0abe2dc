//! Notifier Subscription Client
//!
//! Client half of the realtime notifier: one connection per session,
//! authenticated with the bearer credential, implicitly subscribed to the
//! caller's own identity. Events arrive as newline-delimited JSON and are
//! forwarded into a channel the application drains into
//! [`ChatController::on_realtime_event`](crate::client::controller::ChatController::on_realtime_event).
//!
//! Reconnection is handled here, transparently to the controller. The push
//! channel is a notification path only: sends travel the ordinary
//! request/response store call, and a history fetch resynchronizes whatever
//! a disconnected session missed.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::client::config::Config;
use crate::shared::event::RealtimeEvent;

/// Path of the event stream endpoint
const EVENTS_PATH: &str = "/chats/events";

/// Initial reconnect delay; doubles up to [`MAX_BACKOFF`]
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Connects to the notifier and keeps the connection alive
#[derive(Debug, Clone)]
pub struct NotifierClient {
    config: Config,
    client: Client,
}

/// A live subscription; drop or [`shutdown`](Subscription::shutdown) to
/// disconnect
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::UnboundedReceiver<RealtimeEvent>,
    handle: tokio::task::JoinHandle<()>,
}

impl Subscription {
    /// Wait for the next event. `None` once the subscription has shut down.
    pub async fn recv(&mut self) -> Option<RealtimeEvent> {
        self.events.recv().await
    }

    /// Non-blocking poll, for frame-driven consumers
    pub fn try_recv(&mut self) -> Option<RealtimeEvent> {
        self.events.try_recv().ok()
    }

    /// Consume the subscription as an async stream
    pub fn into_stream(self) -> UnboundedReceiverStream<RealtimeEvent> {
        // The task keeps running detached until the receiver closes.
        UnboundedReceiverStream::new(self.events)
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl NotifierClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Open the session's event subscription. The background task
    /// reconnects with capped exponential backoff until the subscription
    /// is dropped.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = self.config.clone();
        let client = self.client.clone();

        let handle = tokio::spawn(async move {
            let mut backoff = INITIAL_BACKOFF;
            loop {
                match stream_events(&client, &config, &tx).await {
                    Ok(()) => {
                        // Receiver dropped; the session is over.
                        return;
                    }
                    Err(reason) => {
                        tracing::warn!(
                            "[notifier] connection lost ({}), reconnecting in {:?}",
                            reason,
                            backoff
                        );
                    }
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        });

        Subscription { events: rx, handle }
    }
}

/// Read one connection's worth of events into `tx`.
///
/// Returns `Ok(())` only when the receiver side is gone; every other exit
/// is a reconnectable error described by the returned string.
async fn stream_events(
    client: &Client,
    config: &Config,
    tx: &mpsc::UnboundedSender<RealtimeEvent>,
) -> Result<(), String> {
    let url = config.api_url(EVENTS_PATH);
    let token = config.token().ok_or("not authenticated")?.to_string();

    let response = client
        .get(&url)
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .map_err(|e| format!("connect failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("subscription rejected: {}", response.status()));
    }
    tracing::info!("[notifier] subscribed to {}", url);

    let mut body = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| format!("stream error: {}", e))?;
        buffer.extend_from_slice(&chunk);

        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RealtimeEvent>(line) {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        return Ok(());
                    }
                }
                Err(e) => {
                    tracing::warn!("[notifier] skipping undecodable event: {}", e);
                }
            }
        }
    }

    Err("stream ended".to_string())
}
