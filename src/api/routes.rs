//! Route definitions — the HTTP/JSON and WebSocket surface of spec §6.

use axum::{
    routing::{get, post},
    Router,
};

use super::{handlers, AppState};
use crate::ws;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/games", post(handlers::create_game).get(handlers::list_games))
        .route(
            "/games/:id",
            get(handlers::get_game).delete(handlers::delete_game),
        )
        .route("/games/:id/players", post(handlers::join_game))
        .route("/games/:id/start", post(handlers::start_game))
        .route("/games/:id/roll", post(handlers::roll))
        .route("/games/:id/end", post(handlers::end_game))
        .route("/games/:id/board", get(handlers::get_board))
        .route("/ws", get(ws::handler))
}
