//! Player identity and per-player game record.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The transient identity of a connected player.
///
/// It is the id of the connection that currently owns the player, so it
/// changes on every reconnect; the room layer rewrites it in place across
/// the whole game state when that happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Palette handed out to players in join order.
pub const PLAYER_COLORS: [&str; 10] = [
    "#3b82f6", "#ef4444", "#22c55e", "#a855f7", "#f97316", "#14b8a6", "#eab308", "#ec4899",
    "#0ea5e9", "#84cc16",
];

/// Who takes part when a game starts. Built from the lobby by the room layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSeed {
    pub id: PlayerId,
    pub name: String,
    pub avatar: u32,
    pub is_host: bool,
}

/// A player's in-game record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: u32,
    /// Index of the tile the player stands on.
    pub position: usize,
    pub bonus_points: u32,
    pub skip_next_turn: bool,
    pub color: String,
    pub is_host: bool,
}

impl Player {
    pub(crate) fn from_seed(seed: &PlayerSeed, order: usize) -> Self {
        Self {
            id: seed.id,
            name: seed.name.clone(),
            avatar: seed.avatar,
            position: 0,
            bonus_points: 0,
            skip_next_turn: false,
            color: PLAYER_COLORS[order % PLAYER_COLORS.len()].to_string(),
            is_host: seed.is_host,
        }
    }
}
