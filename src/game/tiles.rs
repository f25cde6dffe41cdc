//! Tile behaviors — polymorphic `on_land` dispatch.
//!
//! The source board games in this genre model tile behavior with an
//! abstract base class and one subclass per tile kind. Here that becomes a
//! closed sum type (`TileKind`) plus a single dispatch function, which
//! keeps the match exhaustive and removes virtual-call bookkeeping. The
//! tile set is fixed — extensibility was never a requirement.

use serde::{Deserialize, Serialize};

use super::board::{get_tile, ColorGroup, TileKind};
use super::cards::{CardAction, DeckKind};
use super::entities::{Game, PlayerId};

/// The structured result of landing on (or being moved onto, via a card)
/// a tile. Serialized with an `action_tag` discriminant per spec §4.2.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action_tag", rename_all = "snake_case")]
pub enum TileInteraction {
    GoLanding {
        amount: i64,
    },
    PropertyAvailable {
        tile: u8,
        price: u32,
        can_afford: bool,
    },
    PropertyPurchased {
        tile: u8,
        price: u32,
        owner: PlayerId,
    },
    OwnProperty {
        tile: u8,
    },
    RentPaid {
        tile: u8,
        amount: i64,
        payer: PlayerId,
        owner: PlayerId,
    },
    TaxPaid {
        tile: u8,
        amount: u32,
    },
    CardDrawn {
        deck: DeckKind,
        description: String,
        action: CardAction,
    },
    JailVisit,
    FreeParkingCollected {
        amount: u32,
    },
    SentToJail,
}

/// Rent multiplier table, keyed by house count, per spec §4.2. A monopoly
/// with zero houses doubles the base rent; each house/hotel tier has a
/// fixed multiplier regardless of color group.
fn rent_multiplier(house_count: u8, monopoly: bool) -> i64 {
    match house_count {
        0 if monopoly => 2,
        0 => 1,
        1 => 5,
        2 => 10,
        3 => 15,
        4 => 20,
        5 => 25,
        _ => unreachable!("house_count is clamped to [0, 5]"),
    }
}

/// Compute the rent owed for landing on `tile_idx`, currently owned by
/// `owner`. Callers must ensure the tile is ownable and owned.
fn rent_for(game: &Game, tile_idx: u8, owner: PlayerId) -> i64 {
    let tile = get_tile(tile_idx).expect("valid board position");
    match tile.kind {
        TileKind::Property => {
            let house_count = game.tiles[tile_idx as usize].house_count;
            let group = tile.group.expect("property tile has a color group");
            let monopoly = game.has_monopoly(owner, group);
            tile.base_rent as i64 * rent_multiplier(house_count, monopoly)
        }
        TileKind::Railroad => {
            let n = game.railroad_count(owner) as u32;
            25 * 2i64.pow(n.saturating_sub(1))
        }
        TileKind::Utility => {
            let n = game.utility_count(owner);
            let multiplier = if n >= 2 { 10 } else { 4 };
            game.last_dice_sum as i64 * multiplier
        }
        _ => 0,
    }
}

fn player_index(game: &Game, id: PlayerId) -> usize {
    game.player_index(id).expect("player belongs to this game")
}

/// Move money directly between two players (rent). No bank involvement.
fn transfer_between_players(game: &mut Game, from: PlayerId, to: PlayerId, amount: i64) {
    let from_idx = player_index(game, from);
    let to_idx = player_index(game, to);
    game.players[from_idx].balance -= amount;
    game.players[to_idx].balance += amount;
}

/// Relocate a player to Jail (position 10), without paying Go regardless
/// of any logical wraparound, and reset the jail-turn counter for the new
/// stay.
pub fn send_to_jail(game: &mut Game, player_id: PlayerId) {
    let idx = player_index(game, player_id);
    game.players[idx].position = 10;
    game.players[idx].in_jail = true;
    game.players[idx].jail_turns = 0;
}

fn resolve_ownable(game: &mut Game, player_id: PlayerId, tile_idx: u8) -> TileInteraction {
    let tile = get_tile(tile_idx).expect("valid board position");
    let owner = game.tiles[tile_idx as usize].owner;

    match owner {
        None => {
            let price = tile.price as i64;
            let idx = player_index(game, player_id);
            let can_afford = game.players[idx].balance >= price;
            if can_afford {
                game.players[idx].balance -= price;
                game.players[idx].properties.push(tile_idx);
                game.bank.balance += price;
                game.tiles[tile_idx as usize].owner = Some(player_id);
                TileInteraction::PropertyPurchased {
                    tile: tile_idx,
                    price: tile.price,
                    owner: player_id,
                }
            } else {
                TileInteraction::PropertyAvailable {
                    tile: tile_idx,
                    price: tile.price,
                    can_afford: false,
                }
            }
        }
        Some(owner_id) if owner_id == player_id => TileInteraction::OwnProperty { tile: tile_idx },
        Some(owner_id) => {
            let rent = rent_for(game, tile_idx, owner_id);
            transfer_between_players(game, player_id, owner_id, rent);
            TileInteraction::RentPaid {
                tile: tile_idx,
                amount: rent,
                payer: player_id,
                owner: owner_id,
            }
        }
    }
}

/// Apply the effect of a drawn card. Movement actions update position
/// directly and do NOT re-resolve the landed-on tile — the card's own
/// interaction record is the sole tile interaction for the turn (spec
/// §4.4 point 6).
fn apply_card_action(game: &mut Game, player_id: PlayerId, action: CardAction) {
    match action {
        CardAction::Collect(amount) => {
            let idx = player_index(game, player_id);
            game.bank.pay(&mut game.players[idx], amount);
        }
        CardAction::Pay(amount) => {
            let idx = player_index(game, player_id);
            game.bank.collect(&mut game.players[idx], amount);
        }
        CardAction::PayToPot(amount) => {
            let idx = player_index(game, player_id);
            game.players[idx].balance -= amount;
            game.side_pot.deposit(amount as u32);
        }
        CardAction::Move(spaces) => {
            let idx = player_index(game, player_id);
            let old = game.players[idx].position as i32;
            if spaces >= 0 {
                let new_pos = (old + spaces).rem_euclid(40) as u8;
                if new_pos < game.players[idx].position {
                    game.bank.pay(&mut game.players[idx], 200);
                }
                game.players[idx].position = new_pos;
            } else {
                let new_pos = (old + spaces).rem_euclid(40) as u8;
                game.players[idx].position = new_pos;
            }
        }
        CardAction::MoveTo(position) => {
            let idx = player_index(game, player_id);
            let old = game.players[idx].position;
            if position < old {
                game.bank.pay(&mut game.players[idx], 200);
            }
            game.players[idx].position = position;
        }
        CardAction::GoToJail => send_to_jail(game, player_id),
        CardAction::GetOutOfJailFree => {
            // Player inventory for held cards is out of scope for this
            // ruleset (spec §3 Player has no card-holding field); the
            // effect applies immediately: release from jail if currently
            // jailed, otherwise the card is a no-op.
            let idx = player_index(game, player_id);
            if game.players[idx].in_jail {
                game.players[idx].in_jail = false;
                game.players[idx].jail_turns = 0;
            }
        }
    }
}

/// Dispatch landing behavior for the tile at the player's current
/// position. This is the single entry point the turn engine calls.
pub fn on_land(game: &mut Game, player_id: PlayerId) -> TileInteraction {
    let tile_idx = game.player(player_id).expect("player in game").position;
    let tile = get_tile(tile_idx).expect("valid board position");

    match tile.kind {
        TileKind::Go => {
            let idx = player_index(game, player_id);
            game.bank.pay(&mut game.players[idx], 400);
            TileInteraction::GoLanding { amount: 400 }
        }
        TileKind::Property | TileKind::Railroad | TileKind::Utility => {
            resolve_ownable(game, player_id, tile_idx)
        }
        TileKind::Tax => {
            let idx = player_index(game, player_id);
            game.players[idx].balance -= tile.tax_amount as i64;
            game.side_pot.deposit(tile.tax_amount);
            TileInteraction::TaxPaid {
                tile: tile_idx,
                amount: tile.tax_amount,
            }
        }
        TileKind::Chance => {
            let card = game.chance_deck.draw();
            let description = card.description;
            let action = card.action;
            apply_card_action(game, player_id, action);
            TileInteraction::CardDrawn {
                deck: DeckKind::Chance,
                description,
                action,
            }
        }
        TileKind::CommunityChest => {
            let card = game.community_chest_deck.draw();
            let description = card.description;
            let action = card.action;
            apply_card_action(game, player_id, action);
            TileInteraction::CardDrawn {
                deck: DeckKind::CommunityChest,
                description,
                action,
            }
        }
        TileKind::Jail => TileInteraction::JailVisit,
        TileKind::FreeParking => {
            let amount = game.side_pot.drain();
            let idx = player_index(game, player_id);
            game.players[idx].balance += amount as i64;
            TileInteraction::FreeParkingCollected { amount }
        }
        TileKind::GoToJail => {
            send_to_jail(game, player_id);
            TileInteraction::SentToJail
        }
    }
}

/// Whether `group` at `owner` is complete — exposed for the engine and
/// for tests; thin wrapper documenting the monopoly law from spec §8.
pub fn has_monopoly(game: &Game, owner: PlayerId, group: ColorGroup) -> bool {
    game.has_monopoly(owner, group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::ColorGroup;
    use crate::game::entities::{Player, Token};
    use chrono::Utc;
    use uuid::Uuid;

    fn fresh_game() -> Game {
        Game::new("T".into(), Utc::now())
    }

    #[test]
    fn landing_on_go_credits_four_hundred() {
        let mut game = fresh_game();
        let p1 = Uuid::new_v4();
        game.players.push(Player::new(p1, "A".into(), Token::Car));
        game.players[0].position = 0;
        let interaction = on_land(&mut game, p1);
        assert!(matches!(interaction, TileInteraction::GoLanding { amount: 400 }));
        assert_eq!(game.players[0].balance, 1500 + 400);
    }

    #[test]
    fn unowned_affordable_property_is_auto_purchased() {
        let mut game = fresh_game();
        let p1 = Uuid::new_v4();
        game.players.push(Player::new(p1, "A".into(), Token::Car));
        game.players[0].position = 1; // Salvador, price 60
        let interaction = on_land(&mut game, p1);
        assert!(matches!(interaction, TileInteraction::PropertyPurchased { tile: 1, price: 60, .. }));
        assert_eq!(game.tiles[1].owner, Some(p1));
        assert_eq!(game.players[0].balance, 1500 - 60);
    }

    #[test]
    fn rent_with_monopoly_doubles_base_rent() {
        let mut game = fresh_game();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        game.players.push(Player::new(alice, "Alice".into(), Token::Car));
        game.players.push(Player::new(bob, "Bob".into(), Token::Hat));
        // Bob owns both brown tiles (1 and 3), no houses.
        game.tiles[1].owner = Some(bob);
        game.tiles[3].owner = Some(bob);
        game.players[0].position = 3; // Rio, base rent 4
        let interaction = on_land(&mut game, alice);
        match interaction {
            TileInteraction::RentPaid { amount, payer, owner, .. } => {
                assert_eq!(amount, 8);
                assert_eq!(payer, alice);
                assert_eq!(owner, bob);
            }
            other => panic!("unexpected interaction: {other:?}"),
        }
        assert_eq!(game.players[0].balance, 1500 - 8);
        assert_eq!(game.players[1].balance, 1500 + 8);
    }

    #[test]
    fn rent_with_hotel_is_twenty_five_times_base() {
        let mut game = fresh_game();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        game.players.push(Player::new(alice, "Alice".into(), Token::Car));
        game.players.push(Player::new(bob, "Bob".into(), Token::Hat));
        game.tiles[37].owner = Some(bob);
        game.tiles[39].owner = Some(bob);
        game.tiles[39].house_count = 5;
        game.players[0].position = 39; // Tokyo, base rent 50
        let interaction = on_land(&mut game, alice);
        match interaction {
            TileInteraction::RentPaid { amount, .. } => assert_eq!(amount, 1250),
            other => panic!("unexpected interaction: {other:?}"),
        }
    }

    #[test]
    fn free_parking_pays_out_entire_pot() {
        let mut game = fresh_game();
        let alice = Uuid::new_v4();
        game.players.push(Player::new(alice, "Alice".into(), Token::Car));
        game.side_pot.deposit(300);
        game.players[0].position = 20;
        let interaction = on_land(&mut game, alice);
        assert!(matches!(interaction, TileInteraction::FreeParkingCollected { amount: 300 }));
        assert_eq!(game.side_pot.balance, 0);
        assert_eq!(game.players[0].balance, 1500 + 300);
    }

    #[test]
    fn go_to_jail_tile_does_not_pay_go() {
        let mut game = fresh_game();
        let alice = Uuid::new_v4();
        game.players.push(Player::new(alice, "Alice".into(), Token::Car));
        game.players[0].position = 30;
        let balance_before = game.players[0].balance;
        let interaction = on_land(&mut game, alice);
        assert!(matches!(interaction, TileInteraction::SentToJail));
        assert_eq!(game.players[0].position, 10);
        assert!(game.players[0].in_jail);
        assert_eq!(game.players[0].balance, balance_before);
    }

    #[test]
    fn monopoly_law_matches_ownership_of_every_tile_in_group() {
        let mut game = fresh_game();
        let owner = Uuid::new_v4();
        game.players.push(Player::new(owner, "A".into(), Token::Car));
        assert!(!has_monopoly(&game, owner, ColorGroup::Brown));
        game.tiles[1].owner = Some(owner);
        assert!(!has_monopoly(&game, owner, ColorGroup::Brown));
        game.tiles[3].owner = Some(owner);
        assert!(has_monopoly(&game, owner, ColorGroup::Brown));
    }
}
