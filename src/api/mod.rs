//! API module — HTTP handlers, routes, and the shared application state.

mod handlers;
mod routes;

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::bridge::Bridge;
use crate::config::Config;
use crate::store::Store;
use crate::ws::Hub;

pub use routes::routes;

/// Shared application state. The store is the sole cross-process authority
/// (spec §9); `hub` is the only process-local mutable state, and is
/// internally serialized by its own lock.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub bridge: Arc<Bridge>,
    pub hub: Arc<RwLock<Hub>>,
    pub config: Config,
}
