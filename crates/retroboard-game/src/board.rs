//! Procedural board generation.
//!
//! A board is a single path of tiles laid over a `cols × rows` grid. The
//! path is produced by a self-avoiding random walk that prefers horizontal
//! steps, then painted with tile categories. Everything is driven by one
//! [`Mulberry32`] stream, so the same seed and options always yield the
//! same tile sequence.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::prng::Mulberry32;

/// Walk attempts before giving up and returning an empty board.
pub const MAX_WALK_ATTEMPTS: usize = 250;

/// Number of tiles repainted as `bonus` on every board.
pub const BONUS_TILE_COUNT: usize = 4;

/// Bonus tiles are never placed before this index.
pub const BONUS_MIN_INDEX: usize = 6;

/// Draws allowed per bonus placement before that placement is skipped.
const BONUS_PLACEMENT_TRIES: usize = 400;

/// Weighted pool for regular tiles: blue 4, green 2, red 1, violet 1.
const CATEGORY_POOL: [TileKind; 8] = [
    TileKind::Blue,
    TileKind::Blue,
    TileKind::Blue,
    TileKind::Blue,
    TileKind::Green,
    TileKind::Green,
    TileKind::Red,
    TileKind::Violet,
];

/// Neighbor offsets in the order the walk considers them.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The category of a tile, which decides what happens on landing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    Start,
    Blue,
    Green,
    Red,
    Violet,
    Bonus,
}

/// One cell of the generated path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    /// Position in the path (0 is the start tile).
    pub id: usize,
    pub grid_x: u32,
    pub grid_y: u32,
    pub pixel_x: u32,
    pub pixel_y: u32,
    #[serde(rename = "type")]
    pub kind: TileKind,
}

/// Generation options. Pixel positions are `offset + grid * cell_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardOptions {
    pub cols: u32,
    pub rows: u32,
    pub target_length: usize,
    pub cell_size: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Default for BoardOptions {
    fn default() -> Self {
        Self {
            cols: 20,
            rows: 6,
            target_length: 45,
            cell_size: 72,
            offset_x: 60,
            offset_y: 60,
        }
    }
}

/// A generated board. `length == tiles.len()`; zero is a valid result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub seed: u32,
    pub cols: u32,
    pub rows: u32,
    pub length: usize,
    pub tiles: Vec<Tile>,
}

impl Board {
    /// Index of the final tile, or 0 for an empty board.
    pub fn last_index(&self) -> usize {
        self.length.saturating_sub(1)
    }

    /// Returns the tile at `index`, if any.
    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// Returns `true` when generation exhausted its attempts.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generates a board for `seed`.
///
/// Never fails: if no walk of `target_length` fits the grid within
/// [`MAX_WALK_ATTEMPTS`], the board comes back with zero tiles.
///
/// A grid with no columns or rows and a `target_length` of zero are the
/// same degenerate case: no walk is tried and the board is empty, without
/// even a start tile. Landing on such a board passes the turn.
pub fn generate(seed: u32, options: &BoardOptions) -> Board {
    let mut rng = Mulberry32::new(seed);

    let path = if options.cols == 0 || options.rows == 0 || options.target_length == 0 {
        None
    } else {
        (0..MAX_WALK_ATTEMPTS).find_map(|_| random_walk(&mut rng, options))
    };

    let Some(path) = path else {
        tracing::warn!(seed, "board generation exhausted its attempts");
        return Board {
            seed,
            cols: options.cols,
            rows: options.rows,
            length: 0,
            tiles: Vec::new(),
        };
    };

    let kinds = paint(&mut rng, path.len());
    let tiles: Vec<Tile> = path
        .into_iter()
        .zip(kinds)
        .enumerate()
        .map(|(id, ((x, y), kind))| Tile {
            id,
            grid_x: x,
            grid_y: y,
            pixel_x: options.offset_x + x * options.cell_size,
            pixel_y: options.offset_y + y * options.cell_size,
            kind,
        })
        .collect();

    Board {
        seed,
        cols: options.cols,
        rows: options.rows,
        length: tiles.len(),
        tiles,
    }
}

/// One walk attempt from a random start cell. `None` if it stalls early.
fn random_walk(rng: &mut Mulberry32, options: &BoardOptions) -> Option<Vec<(u32, u32)>> {
    let cols = options.cols as i32;
    let rows = options.rows as i32;

    let start = (rng.below(options.cols as usize) as i32, rng.below(options.rows as usize) as i32);
    let mut path = vec![start];
    let mut visited = HashSet::from([start]);

    while path.len() < options.target_length {
        let (x, y) = path[path.len() - 1];
        let mut candidates = Vec::with_capacity(8);
        for (dx, dy) in DIRECTIONS {
            let next = (x + dx, y + dy);
            let in_bounds = (0..cols).contains(&next.0) && (0..rows).contains(&next.1);
            if !in_bounds || visited.contains(&next) {
                continue;
            }
            let weight = if dy == 0 { 3 } else { 1 };
            candidates.extend(std::iter::repeat_n(next, weight));
        }
        if candidates.is_empty() {
            return None;
        }
        let next = candidates[rng.below(candidates.len())];
        visited.insert(next);
        path.push(next);
    }

    Some(path.into_iter().map(|(x, y)| (x as u32, y as u32)).collect())
}

/// Assigns a category to every tile of a path of `len` tiles.
fn paint(rng: &mut Mulberry32, len: usize) -> Vec<TileKind> {
    let mut kinds = Vec::with_capacity(len);
    if len == 0 {
        return kinds;
    }
    kinds.push(TileKind::Start);
    for _ in 1..len {
        kinds.push(CATEGORY_POOL[rng.below(CATEGORY_POOL.len())]);
    }

    let min_idx = BONUS_MIN_INDEX.min(len - 1);
    let span = len - min_idx;
    let mut used = HashSet::from([0usize]);
    for _ in 0..BONUS_TILE_COUNT {
        for _ in 0..BONUS_PLACEMENT_TRIES {
            let idx = min_idx + rng.below(span);
            if used.insert(idx) {
                kinds[idx] = TileKind::Bonus;
                break;
            }
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(board: &Board, kind: TileKind) -> usize {
        board.tiles.iter().filter(|t| t.kind == kind).count()
    }

    #[test]
    fn test_generate_is_deterministic() {
        let options = BoardOptions::default();
        for seed in [0, 1, 42, 123_456_789, u32::MAX] {
            assert_eq!(generate(seed, &options), generate(seed, &options));
        }
    }

    #[test]
    fn test_generate_default_reaches_target_length() {
        let board = generate(12_345, &BoardOptions::default());
        assert_eq!(board.length, 45);
        assert_eq!(board.tiles.len(), 45);
        assert_eq!(board.seed, 12_345);
    }

    #[test]
    fn test_generate_start_and_bonus_tiles() {
        for seed in 0..50 {
            let board = generate(seed, &BoardOptions::default());
            if board.is_empty() {
                continue;
            }
            assert_eq!(board.tiles[0].kind, TileKind::Start);
            assert_eq!(count(&board, TileKind::Start), 1);
            assert_eq!(count(&board, TileKind::Bonus), BONUS_TILE_COUNT);
            assert!(board.tiles[..BONUS_MIN_INDEX]
                .iter()
                .all(|t| t.kind != TileKind::Bonus));
        }
    }

    #[test]
    fn test_generate_path_is_contiguous_and_self_avoiding() {
        let board = generate(777, &BoardOptions::default());
        let mut seen = HashSet::new();
        for (i, tile) in board.tiles.iter().enumerate() {
            assert_eq!(tile.id, i);
            assert!(seen.insert((tile.grid_x, tile.grid_y)));
            if i > 0 {
                let prev = &board.tiles[i - 1];
                let dist = prev.grid_x.abs_diff(tile.grid_x) + prev.grid_y.abs_diff(tile.grid_y);
                assert_eq!(dist, 1, "tiles {} and {i} are not adjacent", i - 1);
            }
        }
    }

    #[test]
    fn test_generate_pixel_positions_follow_grid() {
        let options = BoardOptions::default();
        let board = generate(5, &options);
        for tile in &board.tiles {
            assert_eq!(tile.pixel_x, 60 + tile.grid_x * 72);
            assert_eq!(tile.pixel_y, 60 + tile.grid_y * 72);
            assert!(tile.grid_x < options.cols && tile.grid_y < options.rows);
        }
    }

    #[test]
    fn test_generate_impossible_target_returns_empty_board() {
        let options = BoardOptions {
            cols: 3,
            rows: 3,
            target_length: 10,
            ..BoardOptions::default()
        };
        let board = generate(1, &options);
        assert!(board.is_empty());
        assert_eq!(board.length, 0);
        assert_eq!(board.last_index(), 0);
    }

    #[test]
    fn test_generate_zero_grid_returns_empty_board() {
        let options = BoardOptions {
            cols: 0,
            ..BoardOptions::default()
        };
        assert!(generate(9, &options).is_empty());
    }

    #[test]
    fn test_generate_zero_target_returns_empty_board() {
        let options = BoardOptions {
            target_length: 0,
            ..BoardOptions::default()
        };
        let board = generate(9, &options);
        assert!(board.is_empty());
        assert_eq!(board.length, 0);
        assert_eq!(board.last_index(), 0);
    }

    #[test]
    fn test_generate_short_board_places_fewer_bonus_tiles() {
        let options = BoardOptions {
            cols: 4,
            rows: 1,
            target_length: 3,
            ..BoardOptions::default()
        };
        let board = generate(11, &options);
        assert_eq!(board.length, 3);
        assert_eq!(board.tiles[0].kind, TileKind::Start);
        // Only index 2 is eligible once index 0 is reserved.
        assert_eq!(count(&board, TileKind::Bonus), 1);
        assert_eq!(board.tiles[2].kind, TileKind::Bonus);
    }

    #[test]
    fn test_tile_serializes_kind_as_type() {
        let board = generate(3, &BoardOptions::default());
        let json = serde_json::to_value(&board.tiles[0]).unwrap();
        assert_eq!(json["type"], "start");
        assert!(json.get("gridX").is_some());
    }
}
