//! Broadcast Bridge — publishes authoritative mutations to a pub/sub
//! channel on the shared key-value store and fans them out to the
//! in-process `Hub`'s per-game subscriber sets (spec §4.6).
//!
//! Handlers call [`Bridge::publish`] after a successful save; a single
//! listener task (spawned once from `main`) subscribes to the `game_events`
//! channel and delivers to local WebSocket connections through the `Hub`.
//! This mirrors the teacher's in-process `Hub::broadcast`, generalized with
//! the Redis pub/sub hop spec §4.6 requires so that delivery works even
//! across multiple bridge processes sharing one store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::ws::hub::{Hub, ServerEvent};

const CHANNEL: &str = "game_events";
const QUEUE: &str = "game_events_queue";
/// Bound on the durability backstop list so it cannot grow unboundedly when
/// nothing drains it.
const QUEUE_MAX_LEN: isize = 1_000;

pub struct Bridge {
    redis: ConnectionManager,
}

impl Bridge {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Publish one event for `game_id`. Delivers through Redis pub/sub; if
    /// nothing is currently subscribed (e.g. the bridge task briefly
    /// restarting) the envelope is also pushed onto the durability backstop
    /// list, per spec §4.6/§6. Broadcast failure here is logged but never
    /// rolls back the save that already committed (spec §7).
    pub async fn publish(&self, game_id: &str, event: &str, data: Value) -> AppResult<()> {
        let envelope = json!({
            "type": "game_event",
            "game_id": game_id,
            "event": event,
            "data": data,
            "timestamp": Utc::now(),
        });
        let payload =
            serde_json::to_string(&envelope).map_err(|e| crate::error::AppError::Internal(e.into()))?;

        let mut conn = self.redis.clone();
        let receivers: i64 = match conn.publish(CHANNEL, &payload).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(game_id, event, "redis publish failed: {e}");
                0
            }
        };
        if receivers == 0 {
            let pushed: redis::RedisResult<()> = conn.lpush(QUEUE, &payload).await;
            if let Err(e) = pushed {
                tracing::warn!(game_id, event, "failed to queue event to {QUEUE}: {e}");
            }
            let trimmed: redis::RedisResult<()> = conn.ltrim(QUEUE, 0, QUEUE_MAX_LEN - 1).await;
            if let Err(e) = trimmed {
                tracing::warn!(game_id, event, "failed to trim {QUEUE}: {e}");
            }
        }
        Ok(())
    }

    /// Spawn the background task that subscribes to `game_events` and
    /// delivers to `hub`. Reconnects with a short backoff if the pub/sub
    /// connection drops.
    pub fn spawn_listener(client: redis::Client, hub: Arc<RwLock<Hub>>) {
        tokio::spawn(async move {
            loop {
                if let Err(e) = run_listener(&client, &hub).await {
                    tracing::error!("bridge listener lost connection: {e}, retrying");
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });
    }
}

async fn run_listener(client: &redis::Client, hub: &Arc<RwLock<Hub>>) -> anyhow::Result<()> {
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.subscribe(CHANNEL).await?;
    let mut stream = pubsub.on_message();

    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("bridge: unreadable pub/sub payload: {e}");
                continue;
            }
        };

        let Ok(envelope) = serde_json::from_str::<Value>(&payload) else {
            tracing::warn!("bridge: malformed event envelope, dropping");
            continue;
        };

        let Some(game_id) = envelope.get("game_id").and_then(Value::as_str) else {
            continue;
        };
        let event = envelope
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let data = envelope.get("data").cloned().unwrap_or(Value::Null);

        let server_event = ServerEvent {
            event,
            game_id: Some(game_id.to_string()),
            data,
            timestamp: Utc::now(),
        };

        hub.read().await.deliver(game_id, server_event);
    }

    Ok(())
}
