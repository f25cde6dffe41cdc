//! Game, Player, Bank and SidePot aggregates, and the game lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::board::BOARD;
use super::cards::CardDeck;

/// Player identifier. An opaque UUID; never exposed to authentication —
/// this system has no player-authenticated sessions (see spec Non-goals).
pub type PlayerId = Uuid;

/// The 8-value token enumeration. Unique per player within a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    Boot,
    Car,
    Ship,
    Thimble,
    Hat,
    Dog,
    Wheelbarrow,
    Iron,
}

impl Token {
    pub const ALL: [Token; 8] = [
        Token::Boot,
        Token::Car,
        Token::Ship,
        Token::Thimble,
        Token::Hat,
        Token::Dog,
        Token::Wheelbarrow,
        Token::Iron,
    ];
}

/// A player seated at the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub token: Token,
    pub balance: i64,
    pub position: u8,
    pub active: bool,
    pub in_jail: bool,
    pub jail_turns: u8,
    pub properties: Vec<u8>,
}

impl Player {
    pub const STARTING_BALANCE: i64 = 1500;

    pub fn new(id: PlayerId, name: String, token: Token) -> Self {
        Self {
            id,
            name,
            token,
            balance: Self::STARTING_BALANCE,
            position: 0,
            active: true,
            in_jail: false,
            jail_turns: 0,
            properties: Vec::new(),
        }
    }
}

/// Per-game dynamic state of a single board tile. Only meaningful for
/// ownable tiles (Property/Railroad/Utility); every other tile carries it
/// as a permanently-unowned, zero-house placeholder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct TileState {
    pub owner: Option<PlayerId>,
    pub house_count: u8,
}

/// The bank. Balance is signed and may go negative without error — it
/// exists purely for observability of the money flow invariant (spec §8,
/// invariant 4), never for a "cannot pay" rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bank {
    pub balance: i64,
}

impl Bank {
    /// Effectively unbounded for the lifetime of one game.
    const STARTING_BALANCE: i64 = 1_000_000_000;

    pub fn new() -> Self {
        Self {
            balance: Self::STARTING_BALANCE,
        }
    }

    pub fn pay(&mut self, player: &mut Player, amount: i64) {
        self.balance -= amount;
        player.balance += amount;
    }

    pub fn collect(&mut self, player: &mut Player, amount: i64) {
        self.balance += amount;
        player.balance -= amount;
    }
}

impl Default for Bank {
    fn default() -> Self {
        Self::new()
    }
}

/// The side pot: accumulates tax payments, paid out whole on a Free
/// Parking landing. Non-negative by construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct SidePot {
    pub balance: u32,
}

impl SidePot {
    pub fn deposit(&mut self, amount: u32) {
        self.balance += amount;
    }

    /// Empty the pot, returning what it held.
    pub fn drain(&mut self) -> u32 {
        std::mem::take(&mut self.balance)
    }
}

/// Overall game lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Waiting,
    InProgress,
    Finished,
}

/// The schema version of the persisted snapshot. Bumped whenever a
/// behavior-affecting field is added, removed or reinterpreted.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// The aggregate root: one Monopoly game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub schema_version: u32,
    pub id: String,
    pub players: Vec<Player>,
    pub current_player_index: usize,
    pub tiles: Vec<TileState>,
    pub bank: Bank,
    pub side_pot: SidePot,
    pub chance_deck: CardDeck,
    pub community_chest_deck: CardDeck,
    pub status: GameStatus,
    pub last_dice_sum: u8,
    pub winner: Option<PlayerId>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Human-readable activity trail, bounded to the most recent entries.
    /// Purely observational — never read by game logic.
    pub logs: Vec<String>,
}

/// Activity log retains at most this many entries; older lines drop off.
const MAX_LOG_ENTRIES: usize = 200;

impl Game {
    pub fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            id,
            players: Vec::new(),
            current_player_index: 0,
            tiles: vec![TileState::default(); BOARD.len()],
            bank: Bank::new(),
            side_pot: SidePot::default(),
            chance_deck: CardDeck::chance(),
            community_chest_deck: CardDeck::community_chest(),
            status: GameStatus::Waiting,
            last_dice_sum: 0,
            winner: None,
            created_at: now,
            last_activity: now,
            logs: Vec::new(),
        }
    }

    /// Append a line to the activity trail, also emitted at debug level,
    /// trimming the oldest entry once the cap is exceeded.
    pub fn log(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(game_id = %self.id, "{}", line);
        self.logs.push(line);
        if self.logs.len() > MAX_LOG_ENTRIES {
            self.logs.remove(0);
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Index of a player within `players`, used by callers that need to
    /// borrow disjoint fields (e.g. `bank` and `players[idx]`) at once.
    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    pub fn current_player_id(&self) -> Option<PlayerId> {
        self.current_player().map(|p| p.id)
    }

    pub fn active_player_count(&self) -> usize {
        self.players.iter().filter(|p| p.active).count()
    }

    pub fn name_taken(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name)
    }

    pub fn token_taken(&self, token: Token) -> bool {
        self.players.iter().any(|p| p.token == token)
    }

    /// Whether `owner` holds every property of `group`.
    pub fn has_monopoly(&self, owner: PlayerId, group: super::board::ColorGroup) -> bool {
        super::board::group_tiles(group)
            .iter()
            .all(|idx| self.tiles[*idx as usize].owner == Some(owner))
    }

    /// Number of railroads owned by `owner`.
    pub fn railroad_count(&self, owner: PlayerId) -> usize {
        BOARD
            .iter()
            .filter(|t| t.kind == super::board::TileKind::Railroad)
            .filter(|t| self.tiles[t.index as usize].owner == Some(owner))
            .count()
    }

    /// Number of utilities owned by `owner`.
    pub fn utility_count(&self, owner: PlayerId) -> usize {
        BOARD
            .iter()
            .filter(|t| t.kind == super::board::TileKind::Utility)
            .filter(|t| self.tiles[t.index as usize].owner == Some(owner))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_has_unowned_board_and_full_bank() {
        let game = Game::new("TEST01".into(), Utc::now());
        assert_eq!(game.tiles.len(), 40);
        assert!(game.tiles.iter().all(|t| t.owner.is_none()));
        assert_eq!(game.status, GameStatus::Waiting);
        assert!(game.bank.balance > 0);
        assert_eq!(game.side_pot.balance, 0);
    }

    #[test]
    fn new_player_has_starting_balance_and_position() {
        let p = Player::new(Uuid::new_v4(), "Alice".into(), Token::Car);
        assert_eq!(p.balance, 1500);
        assert_eq!(p.position, 0);
        assert!(p.active);
        assert!(!p.in_jail);
    }

    #[test]
    fn bank_pay_and_collect_are_symmetric() {
        let mut bank = Bank::new();
        let mut p = Player::new(Uuid::new_v4(), "Alice".into(), Token::Car);
        let start = bank.balance;
        bank.pay(&mut p, 200);
        assert_eq!(p.balance, 1700);
        assert_eq!(bank.balance, start - 200);
        bank.collect(&mut p, 200);
        assert_eq!(p.balance, 1500);
        assert_eq!(bank.balance, start);
    }
}
