//! WebSocket module — upgrade endpoint for the broadcast bridge's
//! per-connection duplex channel (spec §4.6).

pub mod hub;

pub use hub::{Hub, ServerEvent};

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::api::AppState;

/// Upgrade an HTTP request to a WebSocket connection. Clients subscribe to
/// specific games by sending `{"action":"subscribe","game_id":"..."}` after
/// connecting — there is no per-game path segment.
pub async fn handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| hub::handle_socket(socket, state))
}
