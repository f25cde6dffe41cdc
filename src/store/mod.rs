//! Store — serialize/deserialize game snapshots in a key-value store with
//! TTL + index-set membership, per spec §4.5 / SPEC_FULL §A.2.
//!
//! Backed by Redis, mirroring the teacher's `GameEngine::get_game`/
//! `save_game` (`ConnectionManager` cloned per operation, `set_ex`), but
//! generalized to the full contract: `save`, `load`, `delete`, `exists`,
//! `all_ids`, `cleanup_inactive`, plus a per-game lock used by handlers to
//! serialize concurrent mutation (spec §4.7/§5).

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::game::Game;

/// TTL applied to a game snapshot and refreshed on every save (spec §4.5).
const SNAPSHOT_TTL_SECS: u64 = 7200;

/// Store operations time out after this long (spec §5 "Timeouts").
const STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Lease held by `acquire_lock` before it is assumed abandoned.
const LOCK_LEASE_MS: usize = 5_000;

async fn with_timeout<T>(fut: impl std::future::Future<Output = AppResult<T>>) -> AppResult<T> {
    match tokio::time::timeout(STORE_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Transient("store operation timed out".into())),
    }
}

#[derive(Clone)]
pub struct Store {
    redis: ConnectionManager,
    prefix: String,
}

impl Store {
    pub fn new(redis: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn game_key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    fn index_key(&self) -> String {
        format!("{}:index", self.prefix)
    }

    fn lock_key(&self, id: &str) -> String {
        format!("{}:lock:{}", self.prefix, id)
    }

    /// Persist `game`, refreshing both the per-game TTL and the index set's
    /// TTL (spec §4.5).
    pub async fn save(&self, game: &Game) -> AppResult<()> {
        let mut conn = self.redis.clone();
        let key = self.game_key(&game.id);
        let index_key = self.index_key();
        let json = serde_json::to_string(game).map_err(|e| AppError::Internal(e.into()))?;

        with_timeout(async move {
            let _: () = conn.set_ex(&key, json, SNAPSHOT_TTL_SECS).await?;
            let _: () = conn.sadd(&index_key, &game.id).await?;
            let _: () = conn.expire(&index_key, SNAPSHOT_TTL_SECS as i64).await?;
            Ok(())
        })
        .await
    }

    /// Load a game by id. A snapshot that fails to deserialize is a fatal
    /// error (spec §7): it is logged, dropped from the index so it cannot
    /// poison future reads, and surfaced as `AppError::Fatal` — which
    /// `IntoResponse` renders as `not_found`, so the caller sees a plain 404
    /// on the next request.
    pub async fn load(&self, id: &str) -> AppResult<Option<Game>> {
        let mut conn = self.redis.clone();
        let key = self.game_key(id);

        let data: Option<String> = with_timeout({
            let mut conn = conn.clone();
            let key = key.clone();
            async move { Ok(conn.get(&key).await?) }
        })
        .await?;

        let Some(json) = data else {
            return Ok(None);
        };

        match serde_json::from_str::<Game>(&json) {
            Ok(game) => Ok(Some(game)),
            Err(e) => {
                tracing::error!(game_id = %id, "snapshot corrupt, dropping from index: {e}");
                let index_key = self.index_key();
                let _: () = conn.srem(&index_key, id).await.unwrap_or(());
                let _: () = conn.del(&key).await.unwrap_or(());
                Err(AppError::Fatal(format!("snapshot corrupt for game {id}: {e}")))
            }
        }
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let mut conn = self.redis.clone();
        let key = self.game_key(id);
        let index_key = self.index_key();
        with_timeout(async move {
            let _: () = conn.del(&key).await?;
            let _: () = conn.srem(&index_key, id).await?;
            Ok(())
        })
        .await
    }

    pub async fn exists(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.redis.clone();
        let key = self.game_key(id);
        with_timeout(async move { Ok(conn.exists(&key).await?) }).await
    }

    pub async fn all_ids(&self) -> AppResult<HashSet<String>> {
        let mut conn = self.redis.clone();
        let index_key = self.index_key();
        with_timeout(async move { Ok(conn.smembers(&index_key).await?) }).await
    }

    /// Iterate the index, removing identifiers whose snapshots have expired
    /// or whose `last_activity` is older than the TTL window. Returns the
    /// number removed.
    pub async fn cleanup_inactive(&self) -> AppResult<usize> {
        let ids = self.all_ids().await?;
        let mut removed = 0usize;

        for id in ids {
            match self.load(&id).await {
                Ok(None) | Err(AppError::Fatal(_)) => {
                    // Already gone, or just dropped for corruption by `load`
                    // itself; make sure the index agrees and keep sweeping.
                    let mut conn = self.redis.clone();
                    let index_key = self.index_key();
                    let _: () = conn.srem(&index_key, &id).await.unwrap_or(());
                    removed += 1;
                }
                Ok(Some(game)) => {
                    let age = Utc::now().signed_duration_since(game.last_activity);
                    if age.num_seconds() > SNAPSHOT_TTL_SECS as i64 {
                        self.delete(&id).await?;
                        removed += 1;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }

    /// Acquire a per-game mutual-exclusion lock (`SET key NX PX <lease>`).
    /// Two concurrent mutating requests on the same game id race here: the
    /// loser gets `AppError::Conflict` rather than blocking (spec §4.7).
    pub async fn acquire_lock(&self, id: &str) -> AppResult<GameLock> {
        let mut conn = self.redis.clone();
        let key = self.lock_key(id);
        let token = Uuid::new_v4().to_string();

        let acquired: Option<String> = with_timeout({
            let mut conn = conn.clone();
            let key = key.clone();
            let token = token.clone();
            async move {
                Ok(redis::cmd("SET")
                    .arg(&key)
                    .arg(&token)
                    .arg("NX")
                    .arg("PX")
                    .arg(LOCK_LEASE_MS)
                    .query_async(&mut conn)
                    .await?)
            }
        })
        .await?;

        if acquired.is_none() {
            return Err(AppError::Conflict);
        }

        let _ = &mut conn;
        Ok(GameLock {
            redis: self.redis.clone(),
            key,
            token,
        })
    }
}

/// A held lock. Release compares the stored token before deleting, so a
/// lease that already expired and was re-acquired by someone else is never
/// torn down out from under them.
pub struct GameLock {
    redis: ConnectionManager,
    key: String,
    token: String,
}

impl GameLock {
    pub async fn release(self) {
        let script = redis::Script::new(
            r#"
            if redis.call("get", KEYS[1]) == ARGV[1] then
                return redis.call("del", KEYS[1])
            else
                return 0
            end
            "#,
        );
        let mut conn = self.redis.clone();
        let _: redis::RedisResult<i32> = script
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(&mut conn)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{GameStatus, Player, Token};
    use chrono::Utc;

    #[test]
    fn snapshot_ttl_matches_spec_window() {
        assert_eq!(SNAPSHOT_TTL_SECS, 7200);
    }

    /// Spec §8 invariant 6 / Laws: `load(save(g)) == g` in every
    /// behavior-affecting field. No live Redis needed — this exercises the
    /// same `serde_json` encode/decode the store performs around the wire.
    #[test]
    fn serialization_round_trip_preserves_every_behavior_affecting_field() {
        let mut game = Game::new("ROUNDTRIP".into(), Utc::now());

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut p1 = Player::new(alice, "Alice".into(), Token::Car);
        p1.balance = 730;
        p1.position = 18;
        p1.in_jail = true;
        p1.jail_turns = 2;
        p1.properties = vec![1, 3];
        let mut p2 = Player::new(bob, "Bob".into(), Token::Hat);
        p2.balance = 2200;
        p2.position = 5;
        game.players.push(p1);
        game.players.push(p2);

        game.current_player_index = 1;
        game.status = GameStatus::InProgress;
        game.last_dice_sum = 9;
        game.bank.balance -= 5000;
        game.side_pot.balance = 175;
        game.tiles[1].owner = Some(alice);
        game.tiles[1].house_count = 3;
        game.tiles[3].owner = Some(alice);
        game.tiles[3].house_count = 2;

        // Draw a few cards from each deck so the surviving draw order no
        // longer matches the deck's freshly-shuffled order.
        let _ = game.chance_deck.draw();
        let _ = game.chance_deck.draw();
        let _ = game.community_chest_deck.draw();

        // Ground truth for deck ordering: clone before serializing so the
        // *next* draws from the clone are what the round-tripped game must
        // also produce, in the same order.
        let mut expected = game.clone();

        let json = serde_json::to_string(&game).expect("serialize game snapshot");
        let mut restored: Game = serde_json::from_str(&json).expect("deserialize game snapshot");

        assert_eq!(restored.id, game.id);
        assert_eq!(restored.status, game.status);
        assert_eq!(restored.current_player_index, game.current_player_index);
        assert_eq!(restored.last_dice_sum, game.last_dice_sum);
        assert_eq!(restored.bank.balance, game.bank.balance);
        assert_eq!(restored.side_pot.balance, game.side_pot.balance);
        assert_eq!(restored.winner, game.winner);

        assert_eq!(restored.players.len(), game.players.len());
        for (r, o) in restored.players.iter().zip(game.players.iter()) {
            assert_eq!(r.id, o.id);
            assert_eq!(r.name, o.name);
            assert_eq!(r.token, o.token);
            assert_eq!(r.balance, o.balance);
            assert_eq!(r.position, o.position);
            assert_eq!(r.in_jail, o.in_jail);
            assert_eq!(r.jail_turns, o.jail_turns);
            assert_eq!(r.properties, o.properties);
        }

        assert_eq!(restored.tiles.len(), game.tiles.len());
        for (r, o) in restored.tiles.iter().zip(game.tiles.iter()) {
            assert_eq!(r.owner, o.owner);
            assert_eq!(r.house_count, o.house_count);
        }

        let expected_chance: Vec<_> = (0..3).map(|_| expected.chance_deck.draw()).collect();
        let restored_chance: Vec<_> = (0..3).map(|_| restored.chance_deck.draw()).collect();
        assert_eq!(restored_chance, expected_chance);

        let expected_chest: Vec<_> = (0..3).map(|_| expected.community_chest_deck.draw()).collect();
        let restored_chest: Vec<_> = (0..3).map(|_| restored.community_chest_deck.draw()).collect();
        assert_eq!(restored_chest, expected_chest);
    }
}
