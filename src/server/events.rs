//! WebSocket event broadcaster for live turn updates
//!
//! The coordinator publishes routing decisions, recorded interactions and
//! turn outcomes here; every connected `/ws/events` client receives them.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::ServerAppState;

/// A server event that can be broadcast to WebSocket clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
    /// Event type (e.g. "routing:decided", "routing:turn_completed")
    pub event: String,
    pub payload: serde_json::Value,
}

pub struct EventBroadcaster {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBroadcaster {
    /// Broadcaster with room for 1000 undelivered events
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx }
    }

    pub fn broadcast(&self, event_type: &str, payload: impl Serialize) {
        let event = ServerEvent {
            event: event_type.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        };

        // No receivers is not an error
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerAppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: ServerAppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.broadcaster.subscribe();

    log::info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("Failed to serialize event: {}", e),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("WebSocket client lagged, {} event(s) dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                log::info!("WebSocket client disconnected");
                break;
            }
            Ok(Message::Text(text)) => {
                log::debug!("Ignoring client message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("WebSocket error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    log::debug!("WebSocket connection closed");
}
