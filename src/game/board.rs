//! Board catalog — static definition of the 40-tile board.
//!
//! Prices, base rents, and build costs are the canonical values; an
//! implementer loads them from this table rather than hardcoding them at
//! call sites that need them.

use serde::{Deserialize, Serialize};

/// Discriminant for the closed sum type a tile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Go,
    Property,
    Railroad,
    Utility,
    Tax,
    Chance,
    CommunityChest,
    Jail,
    FreeParking,
    GoToJail,
}

/// Color group a property belongs to; also the basis for monopoly
/// detection and per-group build cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
}

impl ColorGroup {
    /// Number of properties that make up a full set of this color.
    pub fn set_size(&self) -> usize {
        match self {
            ColorGroup::Brown | ColorGroup::DarkBlue => 2,
            _ => 3,
        }
    }

    /// Cost to build a single house on a property of this group.
    pub fn build_cost(&self) -> u32 {
        match self {
            ColorGroup::Brown | ColorGroup::LightBlue => 50,
            ColorGroup::Pink | ColorGroup::Orange => 100,
            ColorGroup::Red | ColorGroup::Yellow => 150,
            ColorGroup::Green | ColorGroup::DarkBlue => 200,
        }
    }
}

/// Static (board-catalog) definition of a single tile. Ownership and house
/// counts are NOT part of this type — they are per-game and live in
/// `Game::tiles` (see `entities::TileState`), keeping this catalog
/// immutable and shared across every game.
#[derive(Debug, Clone, Serialize)]
pub struct TileDef {
    pub index: u8,
    pub name: &'static str,
    pub kind: TileKind,
    pub group: Option<ColorGroup>,
    pub price: u32,
    pub base_rent: u32,
    pub build_cost: u32,
    pub tax_amount: u32,
}

impl TileDef {
    const fn blank(index: u8, name: &'static str, kind: TileKind) -> Self {
        Self {
            index,
            name,
            kind,
            group: None,
            price: 0,
            base_rent: 0,
            build_cost: 0,
            tax_amount: 0,
        }
    }

    const fn property(
        index: u8,
        name: &'static str,
        group: ColorGroup,
        price: u32,
        base_rent: u32,
    ) -> Self {
        Self {
            index,
            name,
            kind: TileKind::Property,
            group: Some(group),
            price,
            base_rent,
            build_cost: 0, // filled in below via group.build_cost()
            tax_amount: 0,
        }
    }

    const fn railroad(index: u8, name: &'static str) -> Self {
        Self {
            index,
            name,
            kind: TileKind::Railroad,
            group: None,
            price: 200,
            base_rent: 25,
            build_cost: 0,
            tax_amount: 0,
        }
    }

    const fn utility(index: u8, name: &'static str) -> Self {
        Self {
            index,
            name,
            kind: TileKind::Utility,
            group: None,
            price: 150,
            base_rent: 0,
            build_cost: 0,
            tax_amount: 0,
        }
    }

    const fn tax(index: u8, name: &'static str, amount: u32) -> Self {
        Self {
            index,
            name,
            kind: TileKind::Tax,
            group: None,
            price: 0,
            base_rent: 0,
            build_cost: 0,
            tax_amount: amount,
        }
    }
}

/// The complete 40-tile board, in canonical position order.
pub static BOARD: once_cell::sync::Lazy<Vec<TileDef>> = once_cell::sync::Lazy::new(|| {
    use ColorGroup::*;

    let mut tiles = vec![
        TileDef::blank(0, "Go", TileKind::Go),
        TileDef::property(1, "Salvador", Brown, 60, 2),
        TileDef::blank(2, "Community Chest", TileKind::CommunityChest),
        TileDef::property(3, "Rio", Brown, 60, 4),
        TileDef::tax(4, "Income Tax", 200),
        TileDef::railroad(5, "Tel Aviv Airport"),
        TileDef::property(6, "Tel Aviv", LightBlue, 100, 6),
        TileDef::blank(7, "Chance", TileKind::Chance),
        TileDef::property(8, "Haifa", LightBlue, 100, 6),
        TileDef::property(9, "Jerusalem", LightBlue, 120, 8),
        TileDef::blank(10, "Jail", TileKind::Jail),
        TileDef::property(11, "Venice", Pink, 140, 10),
        TileDef::utility(12, "Electric Company"),
        TileDef::property(13, "Milan", Pink, 140, 10),
        TileDef::property(14, "Rome", Pink, 160, 12),
        TileDef::railroad(15, "Munich Airport"),
        TileDef::property(16, "Frankfurt", Orange, 180, 14),
        TileDef::blank(17, "Community Chest", TileKind::CommunityChest),
        TileDef::property(18, "Hamburg", Orange, 180, 14),
        TileDef::property(19, "Munich", Orange, 200, 16),
        TileDef::blank(20, "Free Parking", TileKind::FreeParking),
        TileDef::property(21, "Berlin", Red, 220, 18),
        TileDef::blank(22, "Chance", TileKind::Chance),
        TileDef::property(23, "Manchester", Red, 220, 18),
        TileDef::property(24, "Liverpool", Red, 240, 20),
        TileDef::railroad(25, "JFK Airport"),
        TileDef::property(26, "Paris", Yellow, 260, 22),
        TileDef::property(27, "Toulouse", Yellow, 260, 22),
        TileDef::utility(28, "Water Company"),
        TileDef::property(29, "Lyon", Yellow, 280, 24),
        TileDef::blank(30, "Go To Jail", TileKind::GoToJail),
        TileDef::property(31, "Charles de Gaulle Airport", Green, 300, 26),
        TileDef::property(32, "Shanghai", Green, 300, 26),
        TileDef::blank(33, "Community Chest", TileKind::CommunityChest),
        TileDef::property(34, "Beijing", Green, 320, 28),
        TileDef::railroad(35, "Shenzhen Airport"),
        TileDef::blank(36, "Chance", TileKind::Chance),
        TileDef::property(37, "New York", DarkBlue, 350, 35),
        TileDef::tax(38, "Luxury Tax", 100),
        TileDef::property(39, "Tokyo", DarkBlue, 400, 50),
    ];

    for tile in tiles.iter_mut() {
        if let Some(group) = tile.group {
            tile.build_cost = group.build_cost();
        }
    }

    debug_assert_eq!(tiles.len(), 40);
    tiles
});

/// Get a tile's static definition by board position.
pub fn get_tile(idx: u8) -> Option<&'static TileDef> {
    BOARD.get(idx as usize)
}

/// Every board position belonging to a given color group, in position order.
pub fn group_tiles(group: ColorGroup) -> Vec<u8> {
    BOARD
        .iter()
        .filter(|t| t.group == Some(group))
        .map(|t| t.index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_has_forty_tiles() {
        assert_eq!(BOARD.len(), 40);
    }

    #[test]
    fn landmarks_are_at_canonical_positions() {
        assert_eq!(get_tile(0).unwrap().kind, TileKind::Go);
        assert_eq!(get_tile(10).unwrap().kind, TileKind::Jail);
        assert_eq!(get_tile(20).unwrap().kind, TileKind::FreeParking);
        assert_eq!(get_tile(30).unwrap().kind, TileKind::GoToJail);
        for idx in [5, 15, 25, 35] {
            assert_eq!(get_tile(idx).unwrap().kind, TileKind::Railroad);
        }
        for idx in [12, 28] {
            assert_eq!(get_tile(idx).unwrap().kind, TileKind::Utility);
        }
        for idx in [4, 38] {
            assert_eq!(get_tile(idx).unwrap().kind, TileKind::Tax);
        }
        for idx in [7, 22, 36] {
            assert_eq!(get_tile(idx).unwrap().kind, TileKind::Chance);
        }
        for idx in [2, 17, 33] {
            assert_eq!(get_tile(idx).unwrap().kind, TileKind::CommunityChest);
        }
    }

    #[test]
    fn color_groups_have_correct_cardinality() {
        assert_eq!(group_tiles(ColorGroup::Brown).len(), 2);
        assert_eq!(group_tiles(ColorGroup::DarkBlue).len(), 2);
        for group in [
            ColorGroup::LightBlue,
            ColorGroup::Pink,
            ColorGroup::Orange,
            ColorGroup::Red,
            ColorGroup::Yellow,
            ColorGroup::Green,
        ] {
            assert_eq!(group_tiles(group).len(), 3);
        }
    }

    #[test]
    fn build_costs_match_group_table() {
        assert_eq!(get_tile(1).unwrap().build_cost, 50);
        assert_eq!(get_tile(11).unwrap().build_cost, 100);
        assert_eq!(get_tile(21).unwrap().build_cost, 150);
        assert_eq!(get_tile(37).unwrap().build_cost, 200);
    }
}
