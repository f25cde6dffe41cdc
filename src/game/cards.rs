//! Chance and Community Chest decks.
//!
//! Each deck is a fixed set of cards shuffled at construction. `draw()`
//! removes the top card; when the draw pile is empty it is repopulated
//! from the full fixed set and reshuffled before the draw completes. This
//! loses the "used pile" discipline of the real game (a drawn
//! Get-Out-Of-Jail-Free card can come right back up on the next reshuffle)
//! — accepted per spec §9, since this ruleset never needs a card to stay
//! out of circulation.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// The effect a drawn card has on the game. A closed sum type with
/// per-variant parameters, kept declarative and trivially testable rather
/// than dispatched on a string tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardAction {
    Collect(i64),
    Pay(i64),
    PayToPot(i64),
    /// Relative movement, positive or negative, wrapping over 40.
    Move(i32),
    /// Absolute movement to a board position.
    MoveTo(u8),
    GoToJail,
    GetOutOfJailFree,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub description: String,
    pub action: CardAction,
}

/// Which of the two decks a card was drawn from — carried on the
/// interaction record so clients can render the right deck art.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckKind {
    Chance,
    CommunityChest,
}

fn chance_cards() -> Vec<Card> {
    vec![
        Card { description: "Advance to Go.".to_string(), action: CardAction::MoveTo(0) },
        Card { description: "Advance to Tel Aviv Airport.".to_string(), action: CardAction::MoveTo(5) },
        Card {
            description: "Advance to New York. If you pass Go, collect $200.".to_string(),
            action: CardAction::MoveTo(37),
        },
        Card {
            description: "Advance to the nearest Utility.".to_string(),
            action: CardAction::MoveTo(12),
        },
        Card {
            description: "Bank pays you a dividend of $50.".to_string(),
            action: CardAction::Collect(50),
        },
        Card {
            description: "Get out of Jail Free.".to_string(),
            action: CardAction::GetOutOfJailFree,
        },
        Card { description: "Go back three spaces.".to_string(), action: CardAction::Move(-3) },
        Card {
            description: "Go directly to Jail. Do not pass Go.".to_string(),
            action: CardAction::GoToJail,
        },
        Card {
            description: "Make general repairs on all your property: pay $25.".to_string(),
            action: CardAction::Pay(25),
        },
        Card {
            description: "Pay a speeding fine of $15.".to_string(),
            action: CardAction::Pay(15),
        },
        Card {
            description: "Take a trip to Tokyo.".to_string(),
            action: CardAction::MoveTo(39),
        },
        Card {
            description: "You have been elected chairman of the board: pay $25 to the pot.".to_string(),
            action: CardAction::PayToPot(25),
        },
        Card {
            description: "Your building loan matures: collect $150.".to_string(),
            action: CardAction::Collect(150),
        },
        Card {
            description: "You've won a crossword competition: collect $100.".to_string(),
            action: CardAction::Collect(100),
        },
        Card {
            description: "Advance to Jerusalem.".to_string(),
            action: CardAction::MoveTo(9),
        },
        Card {
            description: "Advance to Munich Airport.".to_string(),
            action: CardAction::MoveTo(15),
        },
    ]
}

fn community_chest_cards() -> Vec<Card> {
    vec![
        Card { description: "Advance to Go.".to_string(), action: CardAction::MoveTo(0) },
        Card {
            description: "Bank error in your favor: collect $200.".to_string(),
            action: CardAction::Collect(200),
        },
        Card { description: "Doctor's fee: pay $50.".to_string(), action: CardAction::Pay(50) },
        Card {
            description: "From sale of stock you get $45.".to_string(),
            action: CardAction::Collect(45),
        },
        Card {
            description: "Get out of Jail Free.".to_string(),
            action: CardAction::GetOutOfJailFree,
        },
        Card { description: "Go to Jail.".to_string(), action: CardAction::GoToJail },
        Card {
            description: "Holiday fund matures: collect $100.".to_string(),
            action: CardAction::Collect(100),
        },
        Card {
            description: "Income tax refund: collect $20.".to_string(),
            action: CardAction::Collect(20),
        },
        Card {
            description: "Life insurance matures: collect $100.".to_string(),
            action: CardAction::Collect(100),
        },
        Card { description: "Pay hospital fees of $100.".to_string(), action: CardAction::Pay(100) },
        Card { description: "Pay school fees of $150.".to_string(), action: CardAction::Pay(150) },
        Card {
            description: "Receive $25 consultancy fee.".to_string(),
            action: CardAction::Collect(25),
        },
        Card {
            description: "You are assessed for street repairs: pay $40 to the pot.".to_string(),
            action: CardAction::PayToPot(40),
        },
        Card {
            description: "You have won second prize in a beauty contest: collect $10.".to_string(),
            action: CardAction::Collect(10),
        },
        Card { description: "You inherit $100.".to_string(), action: CardAction::Collect(100) },
        Card {
            description: "Your income tax has been recalculated: pay $30 to the pot.".to_string(),
            action: CardAction::PayToPot(30),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDeck {
    kind: DeckKind,
    draw_pile: VecDeque<Card>,
}

impl CardDeck {
    pub fn chance() -> Self {
        Self::new(DeckKind::Chance, chance_cards())
    }

    pub fn community_chest() -> Self {
        Self::new(DeckKind::CommunityChest, community_chest_cards())
    }

    fn new(kind: DeckKind, mut cards: Vec<Card>) -> Self {
        cards.shuffle(&mut rand::thread_rng());
        Self {
            kind,
            draw_pile: cards.into(),
        }
    }

    pub fn kind(&self) -> DeckKind {
        self.kind
    }

    fn full_set(kind: DeckKind) -> Vec<Card> {
        match kind {
            DeckKind::Chance => chance_cards(),
            DeckKind::CommunityChest => community_chest_cards(),
        }
    }

    /// Draw the top card, reshuffling a fresh full set in first if empty.
    pub fn draw(&mut self) -> Card {
        if self.draw_pile.is_empty() {
            let mut fresh = Self::full_set(self.kind);
            fresh.shuffle(&mut rand::thread_rng());
            self.draw_pile = fresh.into();
        }
        self.draw_pile
            .pop_front()
            .expect("deck was just repopulated")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_from_empty_deck_reshuffles_and_succeeds() {
        let mut deck = CardDeck::chance();
        let total = chance_cards().len();
        for _ in 0..total {
            deck.draw();
        }
        assert!(deck.draw_pile.is_empty());
        // Next draw must succeed by repopulating.
        let _card = deck.draw();
        assert_eq!(deck.draw_pile.len(), total - 1);
    }

    #[test]
    fn decks_contain_every_action_tag() {
        let chance = chance_cards();
        assert!(chance.iter().any(|c| matches!(c.action, CardAction::Collect(_))));
        assert!(chance.iter().any(|c| matches!(c.action, CardAction::Pay(_))));
        assert!(chance.iter().any(|c| matches!(c.action, CardAction::PayToPot(_))));
        assert!(chance.iter().any(|c| matches!(c.action, CardAction::Move(_))));
        assert!(chance.iter().any(|c| matches!(c.action, CardAction::MoveTo(_))));
        assert!(chance.iter().any(|c| matches!(c.action, CardAction::GoToJail)));
        assert!(chance
            .iter()
            .any(|c| matches!(c.action, CardAction::GetOutOfJailFree)));
    }
}
