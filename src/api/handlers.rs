//! HTTP handlers — parse input, load the game, invoke the engine, save,
//! publish (spec §4.7). Every handler that mutates a game acquires the
//! per-game store lock first and releases it after the publish, so a
//! canceled or failed request never leaves a partially-applied turn behind
//! (spec §5 "Cancellation").

use axum::{
    extract::{Path, State},
    Json,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::error::{ok, ok_with_message, AppError, AppResult};
use crate::game::board::BOARD;
use crate::game::engine::{self, EngineError};
use crate::game::entities::{Game, GameStatus, Player, Token};

/// Generate a short, human-typeable game identifier (spec §3 "opaque
/// string"), in the same style as the teacher's room codes.
fn generate_game_id() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn is_valid_name(name: &str) -> bool {
    let len = name.chars().count();
    (2..=20).contains(&len)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
}

fn parse_token(raw: &str) -> Option<Token> {
    match raw {
        "boot" => Some(Token::Boot),
        "car" => Some(Token::Car),
        "ship" => Some(Token::Ship),
        "thimble" => Some(Token::Thimble),
        "hat" => Some(Token::Hat),
        "dog" => Some(Token::Dog),
        "wheelbarrow" => Some(Token::Wheelbarrow),
        "iron" => Some(Token::Iron),
        _ => None,
    }
}

async fn load_or_not_found(state: &AppState, id: &str) -> AppResult<Game> {
    state.store.load(id).await?.ok_or(AppError::NotFound)
}

// === GET /health ===

pub async fn health() -> &'static str {
    "OK"
}

// === POST /games ===

pub async fn create_game(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let id = loop {
        let candidate = generate_game_id();
        if !state.store.exists(&candidate).await? {
            break candidate;
        }
    };

    let game = Game::new(id, chrono::Utc::now());
    state.store.save(&game).await?;

    Ok(ok(game))
}

// === GET /games ===

#[derive(Debug, Serialize)]
struct GameSummary {
    id: String,
    status: GameStatus,
    player_count: usize,
    created_at: chrono::DateTime<chrono::Utc>,
}

pub async fn list_games(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let ids = state.store.all_ids().await?;
    let mut games = Vec::with_capacity(ids.len());

    for id in ids {
        match state.store.load(&id).await {
            Ok(Some(game)) => games.push(GameSummary {
                id: game.id,
                status: game.status,
                player_count: game.players.len(),
                created_at: game.created_at,
            }),
            Ok(None) => {}
            Err(e) => {
                // A single corrupt/unreadable snapshot shouldn't fail the
                // whole listing; `Store::load` already logged and pruned it.
                tracing::warn!(game_id = %id, "skipping unreadable game in listing: {e}");
            }
        }
    }

    games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = games.len();

    Ok(ok(json!({ "games": games, "total": total })))
}

// === GET /games/:id ===

pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let game = load_or_not_found(&state, &id).await?;
    Ok(ok(game))
}

// === DELETE /games/:id ===

pub async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if !state.store.exists(&id).await? {
        return Err(AppError::NotFound);
    }
    state.store.delete(&id).await?;
    state
        .bridge
        .publish(&id, "game:updated", json!({ "deleted": true }))
        .await?;
    Ok(ok(json!({})))
}

// === POST /games/:id/players ===

#[derive(Debug, Deserialize)]
pub struct JoinGameRequest {
    pub name: String,
    pub token: String,
}

pub async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<JoinGameRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if !is_valid_name(&req.name) {
        return Err(AppError::precondition("invalid_name", "name must be 2-20 letters, digits, spaces or hyphens"));
    }
    let token = parse_token(&req.token)
        .ok_or_else(|| AppError::precondition("invalid_token", "unknown token"))?;

    let lock = state.store.acquire_lock(&id).await?;
    let result = async {
        let mut game = load_or_not_found(&state, &id).await?;

        if game.status != GameStatus::Waiting {
            return Err(AppError::precondition("started", "game has already started"));
        }
        if game.players.len() >= 4 {
            return Err(AppError::precondition("full", "game already has 4 players"));
        }
        if game.name_taken(&req.name) {
            return Err(AppError::precondition("duplicate_name", "name already taken in this game"));
        }
        if game.token_taken(token) {
            return Err(AppError::precondition("duplicate_token", "token already taken in this game"));
        }

        let player_id = uuid::Uuid::new_v4();
        let player = Player::new(player_id, req.name.clone(), token);
        game.log(format!("{} joined the game", player.name));
        game.players.push(player.clone());
        game.last_activity = chrono::Utc::now();

        state.store.save(&game).await?;
        state
            .bridge
            .publish(&id, "player:joined", json!({ "player": player }))
            .await?;

        Ok(json!({ "player": player, "game": game }))
    }
    .await;

    lock.release().await;
    result.map(ok)
}

// === POST /games/:id/start ===

pub async fn start_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let lock = state.store.acquire_lock(&id).await?;
    let result = async {
        let mut game = load_or_not_found(&state, &id).await?;

        if game.status != GameStatus::Waiting {
            return Err(AppError::precondition("already_started", "game has already started"));
        }
        if game.players.len() < 2 {
            return Err(AppError::precondition("not_enough_players", "need at least 2 players"));
        }

        game.status = GameStatus::InProgress;
        game.current_player_index = 0;
        game.log("game started".to_string());
        game.last_activity = chrono::Utc::now();

        state.store.save(&game).await?;
        state
            .bridge
            .publish(&id, "game:started", json!(game))
            .await?;

        Ok(game)
    }
    .await;

    lock.release().await;
    result.map(ok)
}

// === POST /games/:id/roll ===

pub async fn roll(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let lock = state.store.acquire_lock(&id).await?;
    let result = async {
        let mut game = load_or_not_found(&state, &id).await?;

        if game.status != GameStatus::InProgress {
            return Err(AppError::precondition("not_started", "game is not in progress"));
        }

        let turn_result = engine::execute_turn(&mut game, chrono::Utc::now()).map_err(|e| match e {
            EngineError::NotReady => AppError::precondition("not_started", "game is not in progress"),
        })?;

        state.store.save(&game).await?;
        state
            .bridge
            .publish(&id, "turn:ended", json!({ "turn": turn_result, "game": game }))
            .await?;
        if turn_result.game_finished {
            state
                .bridge
                .publish(&id, "game:ended", json!({ "winner": game.winner }))
                .await?;
        }

        Ok(turn_result)
    }
    .await;

    lock.release().await;
    result.map(ok)
}

// === POST /games/:id/end ===

pub async fn end_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let lock = state.store.acquire_lock(&id).await?;
    let result = async {
        let mut game = load_or_not_found(&state, &id).await?;

        game.status = GameStatus::Finished;
        game.log("game ended by explicit request".to_string());
        game.last_activity = chrono::Utc::now();

        state.store.save(&game).await?;
        state.bridge.publish(&id, "game:ended", json!(game)).await?;

        Ok(game)
    }
    .await;

    lock.release().await;
    result.map(|game| ok_with_message("game ended", game))
}

// === GET /games/:id/board ===

#[derive(Debug, Serialize)]
struct TileView {
    index: u8,
    name: &'static str,
    kind: crate::game::board::TileKind,
    group: Option<crate::game::board::ColorGroup>,
    price: u32,
    base_rent: u32,
    build_cost: u32,
    tax_amount: u32,
    owner: Option<uuid::Uuid>,
    house_count: u8,
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let game = load_or_not_found(&state, &id).await?;

    let tiles: Vec<TileView> = BOARD
        .iter()
        .map(|def| {
            let tile_state = game.tiles[def.index as usize];
            TileView {
                index: def.index,
                name: def.name,
                kind: def.kind,
                group: def.group,
                price: def.price,
                base_rent: def.base_rent,
                build_cost: def.build_cost,
                tax_amount: def.tax_amount,
                owner: tile_state.owner,
                house_count: tile_state.house_count,
            }
        })
        .collect();

    Ok(ok(tiles))
}
