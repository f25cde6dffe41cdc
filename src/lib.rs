//! Monopoly Engine Server
//!
//! An authoritative turn-based board-game server built with:
//! - Axum for HTTP/WebSocket
//! - Redis for game snapshot storage and pub/sub fan-out
//!
//! Architecture:
//! - `api/` - HTTP handlers, routes, and shared application state
//! - `game/` - Board catalog, tile behaviors, card decks, entities, turn engine
//! - `store/` - Snapshot persistence (TTL + index set) over the key-value store
//! - `bridge` - Publishes mutations to pub/sub and fans them out locally
//! - `ws/` - WebSocket hub for the broadcast bridge's per-game subscriber sets

pub mod api;
pub mod game;
pub mod store;
pub mod ws;

pub mod bridge;
pub mod config;
pub mod error;
