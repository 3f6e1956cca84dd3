//! WebSocket streaming API.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;

use accord_common::{AppResult, MessageEvent};
use accord_core::MessageEventPublisher;
use async_trait::async_trait;
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::middleware::AppState;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Access token for authentication.
    #[serde(rename = "i")]
    pub token: Option<String>,
}

/// Client-to-server message.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Open a topic subscription under a connection id.
    Connect { id: String, topic: String },
    /// Close a topic subscription.
    Disconnect { id: String },
}

/// Server-to-client message.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Subscription acknowledged.
    Connected { id: String },
    /// Event delivered on a subscription.
    Channel { id: String, event: MessageEvent },
}

/// In-process fan-out hub for message events.
///
/// All events share one broadcast channel; each WebSocket session filters
/// by the topics it has open. A send with no live receivers is not an
/// error, it just means nobody is watching.
#[derive(Clone)]
pub struct TopicHub {
    tx: Arc<broadcast::Sender<MessageEvent>>,
}

impl TopicHub {
    /// Create a new hub.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.tx.subscribe()
    }

    /// Fan an event out to all live sessions.
    pub fn send(&self, event: MessageEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for TopicHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageEventPublisher for TopicHub {
    async fn publish(&self, event: MessageEvent) -> AppResult<()> {
        self.send(event);
        Ok(())
    }
}

/// WebSocket handler for streaming.
pub async fn streaming_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("New streaming connection");

    ws.on_upgrade(move |socket| handle_socket(socket, query, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, query: StreamQuery, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Authenticate if token provided
    let profile = if let Some(token) = &query.token {
        match state.identity.authenticate(token).await {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Streaming auth failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    let member_id = profile.map(|p| p.id);

    info!(member_id = ?member_id, "Streaming connection established");

    let mut events = state.hub.subscribe();

    // Connection id -> topic id for this session
    let mut open_topics: HashMap<String, String> = HashMap::new();

    loop {
        tokio::select! {
            // Handle incoming messages from client
            Some(msg) = receiver.next() => {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) = handle_client_message(client_msg, &mut open_topics) {
                                    let json = serde_json::to_string(&response).unwrap_or_default();
                                    if sender.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse client message: {}", e);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Client closed connection");
                        break;
                    }
                    Ok(Message::Ping(data)) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }

            // Fan events out to every subscription whose topic matches
            Ok(event) = events.recv() => {
                let topic_id = event.topic_id().to_string();
                let conn_ids: Vec<String> = open_topics
                    .iter()
                    .filter(|(_, topic)| **topic == topic_id)
                    .map(|(id, _)| id.clone())
                    .collect();

                let mut closed = false;
                for id in conn_ids {
                    let msg = ServerMessage::Channel {
                        id,
                        event: event.clone(),
                    };
                    let json = serde_json::to_string(&msg).unwrap_or_default();
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        closed = true;
                        break;
                    }
                }
                if closed {
                    break;
                }
            }
        }
    }

    info!("Streaming connection closed");
}

/// Handle a client message.
fn handle_client_message(
    msg: ClientMessage,
    open_topics: &mut HashMap<String, String>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Connect { id, topic } => {
            if topic.is_empty() {
                warn!(id = %id, "Connect without topic");
                return None;
            }
            info!(topic = %topic, id = %id, "Topic connected");
            open_topics.insert(id.clone(), topic);

            Some(ServerMessage::Connected { id })
        }
        ClientMessage::Disconnect { id } => {
            open_topics.remove(&id);
            info!(id = %id, "Topic disconnected");
            None
        }
    }
}
