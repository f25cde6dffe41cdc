use std::sync::Arc;

use axum::Router;
use redis::aio::ConnectionManager;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monopoly_server::{
    api::{self, AppState},
    bridge::Bridge,
    config::Config,
    store::Store,
    ws::Hub,
};

const STORE_KEY_PREFIX: &str = "monopoly";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "monopoly_server=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let redis_client = redis::Client::open(config.redis_url())?;
    let redis_conn = ConnectionManager::new(redis_client.clone()).await?;

    let store = Store::new(redis_conn.clone(), STORE_KEY_PREFIX);
    let hub = Arc::new(RwLock::new(Hub::new()));
    let bridge = Arc::new(Bridge::new(redis_conn.clone()));

    // One bridge listener fans published events out to local WebSocket
    // subscribers (spec §4.6).
    Bridge::spawn_listener(redis_client, hub.clone());

    spawn_cleanup_task(store.clone());

    let app_state = AppState {
        store,
        bridge,
        hub,
        config: config.clone(),
    };

    let app = Router::new()
        .merge(api::routes())
        .layer(cors_layer(&config.cors_origin_pattern))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr: std::net::SocketAddr = format!("{}:{}", config.ws_host, config.ws_port).parse()?;
    tracing::info!("monopoly server starting on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Build the CORS layer from `CORS_ORIGIN_PATTERN`. `"*"` allows any origin;
/// otherwise the pattern is matched literally, with a single leading `*`
/// treated as a suffix wildcard (e.g. `"*.example.com"`).
fn cors_layer(pattern: &str) -> CorsLayer {
    if pattern == "*" {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let pattern = pattern.to_string();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _| {
            let origin = origin.to_str().unwrap_or("");
            match pattern.strip_prefix('*') {
                Some(suffix) => origin.ends_with(suffix),
                None => origin == pattern,
            }
        }))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Periodically sweep the index for games whose snapshot expired or that
/// went quiet past the 7200s TTL window (spec §4.5 `cleanup_inactive`).
/// Redis's own key TTLs already expire snapshots; this task is the backstop
/// that keeps the index set from accumulating ids whose TTL hasn't yet
/// elapsed but whose `last_activity` already has.
fn spawn_cleanup_task(store: monopoly_server::store::Store) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            ticker.tick().await;
            match store.cleanup_inactive().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("cleanup_inactive removed {n} stale game(s)"),
                Err(e) => tracing::warn!("cleanup_inactive failed: {e}"),
            }
        }
    });
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
