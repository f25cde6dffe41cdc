//! WebSocket hub — per-game subscriber sets and the single-connection
//! read/write loop, generalized from the teacher's room-based `Hub`.
//!
//! The hub is the only process-local mutable state in the system (spec §9);
//! every cross-request fact lives in the store instead. Mutation of the
//! subscriber sets is serialized internally by holding `state.hub` behind a
//! `tokio::sync::RwLock`.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::AppState;

/// Idle connections are closed after this long without client traffic
/// (spec §4.6 keep-alive).
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// WebSocket writes time out after this long (spec §5).
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// A client → server control message (spec §6 WebSocket surface).
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { game_id: String },
    Unsubscribe { game_id: String },
    Ping,
}

/// A server → client push, serialized verbatim to every subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl ServerEvent {
    fn simple(event: &str, game_id: Option<&str>, data: Value) -> Self {
        Self {
            event: event.to_string(),
            game_id: game_id.map(str::to_string),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Per-game subscriber sets plus the connection registry they index into.
/// `subscribe`/`unsubscribe` and delivery are all synchronous — callers hold
/// the hub's lock for the duration of the call.
#[derive(Default)]
pub struct Hub {
    subscribers: HashMap<String, HashSet<Uuid>>,
    connections: HashMap<Uuid, mpsc::UnboundedSender<ServerEvent>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, conn_id: Uuid, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.connections.insert(conn_id, tx);
    }

    pub fn subscribe(&mut self, conn_id: Uuid, game_id: &str) {
        self.subscribers
            .entry(game_id.to_string())
            .or_default()
            .insert(conn_id);
    }

    pub fn unsubscribe(&mut self, conn_id: Uuid, game_id: &str) {
        if let Some(set) = self.subscribers.get_mut(game_id) {
            set.remove(&conn_id);
            if set.is_empty() {
                self.subscribers.remove(game_id);
            }
        }
    }

    /// Remove a connection from every set it belongs to (spec §4.6 "On
    /// disconnect, remove connection from every set").
    pub fn remove_connection(&mut self, conn_id: Uuid) {
        self.connections.remove(&conn_id);
        for set in self.subscribers.values_mut() {
            set.remove(&conn_id);
        }
        self.subscribers.retain(|_, set| !set.is_empty());
    }

    /// Deliver `event` to every subscriber of `game_id`, in the order this
    /// method is called (spec §4.6/§5 ordering guarantee) — the caller
    /// serializes calls for one game by publishing through a single bridge
    /// listener task.
    pub fn deliver(&self, game_id: &str, event: ServerEvent) {
        let Some(conn_ids) = self.subscribers.get(game_id) else {
            return;
        };
        for conn_id in conn_ids {
            if let Some(tx) = self.connections.get(conn_id) {
                let _ = tx.send(event.clone());
            }
        }
    }

    fn send_to(&self, conn_id: Uuid, event: ServerEvent) {
        if let Some(tx) = self.connections.get(&conn_id) {
            let _ = tx.send(event);
        }
    }
}

/// Drive a single WebSocket connection: register it, forward outbound
/// events, and process inbound `subscribe`/`unsubscribe`/`ping` messages
/// until the socket closes or goes idle past the keep-alive window.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    {
        let mut hub = state.hub.write().await;
        hub.register(conn_id, tx);
    }

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if tokio::time::timeout(WRITE_TIMEOUT, sender.send(Message::Text(text.into())))
                .await
                .is_err()
            {
                break;
            }
            if sender.flush().await.is_err() {
                break;
            }
        }
    });

    {
        let hub = state.hub.read().await;
        hub.send_to(conn_id, ServerEvent::simple("connected", None, Value::Null));
    }

    loop {
        let next = tokio::time::timeout(IDLE_TIMEOUT, receiver.next()).await;
        let msg = match next {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(_))) | Ok(None) => break,
            Err(_) => {
                tracing::debug!(%conn_id, "connection idle past keep-alive window, closing");
                break;
            }
        };

        let Message::Text(text) = msg else {
            if matches!(msg, Message::Close(_)) {
                break;
            }
            continue;
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Subscribe { game_id }) => {
                let mut hub = state.hub.write().await;
                hub.subscribe(conn_id, &game_id);
                hub.send_to(
                    conn_id,
                    ServerEvent::simple("subscribed", Some(&game_id), Value::Null),
                );
            }
            Ok(ClientMessage::Unsubscribe { game_id }) => {
                let mut hub = state.hub.write().await;
                hub.unsubscribe(conn_id, &game_id);
                hub.send_to(
                    conn_id,
                    ServerEvent::simple("unsubscribed", Some(&game_id), Value::Null),
                );
            }
            Ok(ClientMessage::Ping) => {
                let hub = state.hub.read().await;
                hub.send_to(conn_id, ServerEvent::simple("pong", None, Value::Null));
            }
            Err(e) => {
                tracing::debug!(%conn_id, "ignoring malformed client message: {e}");
            }
        }
    }

    send_task.abort();
    let mut hub = state.hub.write().await;
    hub.remove_connection(conn_id);
    tracing::debug!(%conn_id, "connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribe_drops_empty_game_entry() {
        let mut hub = Hub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        hub.register(conn_id, tx);
        hub.subscribe(conn_id, "G1");
        assert!(hub.subscribers.contains_key("G1"));
        hub.unsubscribe(conn_id, "G1");
        assert!(!hub.subscribers.contains_key("G1"));
    }

    #[test]
    fn remove_connection_clears_every_subscription() {
        let mut hub = Hub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        hub.register(conn_id, tx);
        hub.subscribe(conn_id, "G1");
        hub.subscribe(conn_id, "G2");
        hub.remove_connection(conn_id);
        assert!(hub.subscribers.is_empty());
        assert!(hub.connections.is_empty());
    }
}
