//! Turn Engine — orchestrates dice, movement, tile resolution, bankruptcy
//! and turn advancement. Single public operation: `execute_turn`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Game, GameStatus, PlayerId};
use super::tiles::{self, TileInteraction};

/// Why `execute_turn` could not run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("game is not in progress")]
    NotReady,
}

/// What happened to the jailed current player during step 3, if anything.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JailOutcome {
    StillInJail,
    EscapedByDoubles,
    ForcedRelease { fee: i64 },
}

/// Movement performed in step 4. Absent when the player stayed in jail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Movement {
    pub from: u8,
    pub to: u8,
    pub passed_go: bool,
}

/// Recorded when the bankruptcy check in step 7 takes a player out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankruptcyOutcome {
    pub player: PlayerId,
}

/// The full record of one `execute_turn` call, returned to the caller and
/// broadcast verbatim to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub player: PlayerId,
    pub dice: (u8, u8),
    pub jail: Option<JailOutcome>,
    pub movement: Option<Movement>,
    pub tile_interaction: Option<TileInteraction>,
    pub bankruptcy: Option<BankruptcyOutcome>,
    pub next_player: Option<PlayerId>,
    pub game_finished: bool,
}

const JAIL_FEE: i64 = 50;
const GO_PASS_BONUS: i64 = 200;
const MAX_JAIL_TURNS: u8 = 3;

/// Advance the game by exactly one turn per the sequence:
/// select player → roll → jail handling → move → resolve tile →
/// bankruptcy check → advance turn.
pub fn execute_turn(game: &mut Game, now: DateTime<Utc>) -> Result<TurnResult, EngineError> {
    if game.status != GameStatus::InProgress {
        return Err(EngineError::NotReady);
    }

    let player_id = game
        .current_player_id()
        .expect("in_progress game always has a current player");

    let (d1, d2) = roll_dice();
    let dice_sum = d1 + d2;
    let is_doubles = d1 == d2;
    game.last_dice_sum = dice_sum;

    let idx = game
        .player_index(player_id)
        .expect("current player belongs to this game");

    let mut jail = None;
    if game.players[idx].in_jail {
        game.players[idx].jail_turns += 1;

        if is_doubles {
            game.players[idx].in_jail = false;
            let name = game.players[idx].name.clone();
            game.log(format!("{name} rolled doubles and escaped jail"));
            jail = Some(JailOutcome::EscapedByDoubles);
        } else if game.players[idx].jail_turns >= MAX_JAIL_TURNS {
            game.players[idx].in_jail = false;
            game.players[idx].jail_turns = 0;
            game.bank.collect(&mut game.players[idx], JAIL_FEE);
            let name = game.players[idx].name.clone();
            game.log(format!("{name} paid {JAIL_FEE} to be forcibly released from jail"));
            jail = Some(JailOutcome::ForcedRelease { fee: JAIL_FEE });
        } else {
            let name = game.players[idx].name.clone();
            game.log(format!("{name} failed to roll doubles in jail"));
            // Steps 4-6 are skipped; proceed straight to bankruptcy check.
            let bankruptcy = check_bankruptcy(game, player_id);
            let game_finished = game.status == GameStatus::Finished;
            let next_player = if game_finished {
                None
            } else {
                Some(advance_turn(game))
            };
            game.last_activity = now;

            return Ok(TurnResult {
                player: player_id,
                dice: (d1, d2),
                jail: Some(JailOutcome::StillInJail),
                movement: None,
                tile_interaction: None,
                bankruptcy,
                next_player,
                game_finished,
            });
        }
    }

    let old_pos = game.players[idx].position;
    let new_pos = ((old_pos as u16 + dice_sum as u16) % 40) as u8;
    let passed_go = new_pos < old_pos && new_pos != 0;

    game.players[idx].position = new_pos;
    if passed_go {
        game.bank.pay(&mut game.players[idx], GO_PASS_BONUS);
        let name = game.players[idx].name.clone();
        game.log(format!("{name} passed Go and collected {GO_PASS_BONUS}"));
    }

    let movement = Some(Movement {
        from: old_pos,
        to: new_pos,
        passed_go,
    });

    let tile_interaction = Some(tiles::on_land(game, player_id));

    let bankruptcy = check_bankruptcy(game, player_id);
    let game_finished = game.status == GameStatus::Finished;
    let next_player = if game_finished {
        None
    } else {
        Some(advance_turn(game))
    };

    game.last_activity = now;

    Ok(TurnResult {
        player: player_id,
        dice: (d1, d2),
        jail,
        movement,
        tile_interaction,
        bankruptcy,
        next_player,
        game_finished,
    })
}

fn roll_dice() -> (u8, u8) {
    let mut rng = rand::thread_rng();
    (rng.gen_range(1..=6), rng.gen_range(1..=6))
}

/// Step 7: if `player_id`'s balance is negative, bankrupt them and settle
/// the game status. Returns the bankruptcy record when it fired.
fn check_bankruptcy(game: &mut Game, player_id: PlayerId) -> Option<BankruptcyOutcome> {
    let idx = game.player_index(player_id).expect("player in game");
    if game.players[idx].balance >= 0 {
        return None;
    }

    game.players[idx].active = false;
    for &tile_idx in &game.players[idx].properties.clone() {
        game.tiles[tile_idx as usize].owner = None;
        game.tiles[tile_idx as usize].house_count = 0;
    }
    game.players[idx].properties.clear();

    let name = game.players[idx].name.clone();
    game.log(format!("{name} went bankrupt"));

    match game.active_player_count() {
        1 => {
            game.status = GameStatus::Finished;
            game.winner = game.players.iter().find(|p| p.active).map(|p| p.id);
            if let Some(winner) = game.winner {
                let winner_name = game.player(winner).map(|p| p.name.clone()).unwrap_or_default();
                game.log(format!("{winner_name} wins the game"));
            }
        }
        0 => {
            game.status = GameStatus::Finished;
            game.winner = None;
            game.log("game ended with no active players".to_string());
        }
        _ => {}
    }

    Some(BankruptcyOutcome { player: player_id })
}

/// Step 8: set `current_player_index` to the next active player, bounded
/// linear scan so a fully-bankrupt board never loops forever.
fn advance_turn(game: &mut Game) -> PlayerId {
    let n = game.players.len();
    let mut next = (game.current_player_index + 1) % n;
    for _ in 0..n {
        if game.players[next].active {
            break;
        }
        next = (next + 1) % n;
    }
    game.current_player_index = next;
    game.players[next].id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{Player, Token};
    use uuid::Uuid;

    fn fresh_game(n: usize) -> Game {
        let mut game = Game::new("T".into(), Utc::now());
        for i in 0..n {
            let mut p = Player::new(Uuid::new_v4(), format!("P{i}"), Token::ALL[i]);
            p.active = true;
            game.players.push(p);
        }
        game.status = GameStatus::InProgress;
        game
    }

    #[test]
    fn not_in_progress_is_rejected() {
        let mut game = fresh_game(2);
        game.status = GameStatus::Waiting;
        assert!(matches!(execute_turn(&mut game, Utc::now()), Err(EngineError::NotReady)));
    }

    #[test]
    fn landing_exactly_on_go_is_not_a_pass() {
        let old_pos: u8 = 34; // needs a 6 to land exactly on 0
        let new_pos = ((old_pos as u16 + 6) % 40) as u8;
        let passed_go = new_pos < old_pos && new_pos != 0;
        assert_eq!(new_pos, 0);
        assert!(!passed_go);
    }

    #[test]
    fn wrap_to_nonzero_position_pays_go_pass() {
        let old_pos: u8 = 38;
        let new_pos = ((old_pos as u16 + 5) % 40) as u8;
        let passed_go = new_pos < old_pos && new_pos != 0;
        assert_eq!(new_pos, 3);
        assert!(passed_go);
    }

    #[test]
    fn bankruptcy_reverts_properties_and_finishes_game_with_winner() {
        let mut game = fresh_game(2);
        let alice = game.players[0].id;
        let bob = game.players[1].id;
        game.players[0].balance = -290;
        game.players[0].properties.push(5);
        game.tiles[5].owner = Some(alice);

        let outcome = check_bankruptcy(&mut game, alice).expect("alice is bankrupt");
        assert_eq!(outcome.player, alice);
        assert!(!game.players[0].active);
        assert!(game.players[0].properties.is_empty());
        assert_eq!(game.tiles[5].owner, None);
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.winner, Some(bob));
    }

    #[test]
    fn advance_turn_skips_inactive_players() {
        let mut game = fresh_game(3);
        game.players[1].active = false;
        game.current_player_index = 0;
        let next = advance_turn(&mut game);
        assert_eq!(next, game.players[2].id);
        assert_eq!(game.current_player_index, 2);
    }

    #[test]
    fn still_in_jail_skips_movement_and_tile_resolution() {
        let mut game = fresh_game(2);
        game.players[0].in_jail = true;
        game.players[0].jail_turns = 0;
        let before_pos = game.players[0].position;

        // Dice are random; retry a bounded number of times until we
        // observe the still-in-jail branch (non-doubles, counter < max).
        for _ in 0..50 {
            let mut trial = game.clone();
            let result = execute_turn(&mut trial, Utc::now()).unwrap();
            if matches!(result.jail, Some(JailOutcome::StillInJail)) {
                assert!(result.movement.is_none());
                assert!(result.tile_interaction.is_none());
                assert_eq!(trial.players[0].position, before_pos);
                return;
            }
        }
    }

    #[test]
    fn jail_forced_release_after_three_turns_charges_fee() {
        let mut game = fresh_game(2);
        game.players[0].in_jail = true;
        game.players[0].jail_turns = MAX_JAIL_TURNS - 1;
        let bank_before = game.bank.balance;

        for _ in 0..200 {
            let mut trial = game.clone();
            let result = execute_turn(&mut trial, Utc::now()).unwrap();
            if let Some(JailOutcome::ForcedRelease { fee }) = result.jail {
                assert_eq!(fee, JAIL_FEE);
                assert!(!trial.players[0].in_jail);
                assert_eq!(trial.bank.balance, bank_before + JAIL_FEE);
                return;
            }
        }
    }
}
