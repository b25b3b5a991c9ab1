//! Board diffing and move classification.
//!
//! Everything here is pure: snapshots in, a classified draft out.
//! Recognition noise never raises errors, it degrades into moves an
//! operator can correct later.

use std::collections::BTreeSet;

use tracing::warn;

use crate::board::{Board, Coord, Orientation, TileMap};
use crate::game::Placement;

/// Confidence assigned to a candidate square no template matched.
pub const FALLBACK_CONFIDENCE: u8 = 76;

/// Readings above this confidence are pinned and never re-analyzed.
pub const KEEP_CONFIDENCE: u8 = 90;

/// Outcome of comparing an analyzed board against the previous
/// snapshot. `board` is the resolved full snapshot.
#[derive(Debug, Clone)]
pub struct BoardDiff {
    pub board: Board,
    pub new_tiles: TileMap,
    pub removed_tiles: TileMap,
    pub changed_tiles: TileMap,
}

/// Resolves an observed board against the previous snapshot. A square
/// keeps its earlier reading when that one was more confident.
pub fn diff(mut observed: Board, previous: &Board) -> BoardDiff {
    for (&coord, &prev) in previous.iter() {
        if let Some(seen) = observed.get(coord) {
            if prev.confidence > seen.confidence {
                observed.insert(coord, prev);
            }
        }
    }

    let mut new_tiles = TileMap::new();
    for (&coord, &tile) in observed.iter() {
        if !previous.contains(coord) {
            new_tiles.insert(coord, tile);
        }
    }

    let mut removed_tiles = TileMap::new();
    let mut changed_tiles = TileMap::new();
    for (&coord, &prev) in previous.iter() {
        match observed.get(coord) {
            None => {
                removed_tiles.insert(coord, prev);
            }
            Some(seen) if seen.letter != prev.letter => {
                changed_tiles.insert(coord, seen);
            }
            Some(_) => {}
        }
    }

    BoardDiff {
        board: observed,
        new_tiles,
        removed_tiles,
        changed_tiles,
    }
}

/// Drops newly detected blanks that do not belong to the placement: a
/// blank must share a row or column with a lettered new tile and be
/// connected to it through occupied squares.
pub fn discard_stray_blanks(board: &mut Board, new_tiles: &mut TileMap) {
    let lettered: Vec<Coord> = new_tiles
        .iter()
        .filter(|(_, tile)| !tile.is_blank())
        .map(|(&coord, _)| coord)
        .collect();
    let strays: Vec<Coord> = new_tiles
        .iter()
        .filter(|(_, tile)| tile.is_blank())
        .map(|(&coord, _)| coord)
        .filter(|&blank| !lettered.iter().any(|&anchor| connected(board, blank, anchor)))
        .collect();
    for coord in strays {
        warn!("dropping stray blank at {}", coord.status_key());
        new_tiles.remove(&coord);
        board.remove(coord);
    }
}

/// Whether `from` and `to` lie on one line with every square between
/// them occupied.
fn connected(board: &Board, from: Coord, to: Coord) -> bool {
    let orientation = if from.row == to.row {
        Orientation::Horizontal
    } else if from.col == to.col {
        Orientation::Vertical
    } else {
        return false;
    };
    let (mut cursor, target) = if from < to { (from, to) } else { (to, from) };
    while cursor != target {
        match orientation.step(cursor) {
            Some(next) if board.contains(next) => cursor = next,
            _ => return false,
        }
    }
    true
}

/// What the new tiles of a diff amount to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No new tiles: the player passed or exchanged.
    NoMove,
    /// New tiles span both axes; only an operator can untangle this.
    Invalid,
    /// A readable word placement.
    Word(Placement),
}

/// Derives orientation, anchor and word from the new tiles of a
/// resolved board.
pub fn classify(board: &Board, new_tiles: &TileMap) -> Classification {
    if new_tiles.is_empty() {
        return Classification::NoMove;
    }

    let coords: Vec<Coord> = new_tiles.keys().copied().collect();
    let cols: BTreeSet<u8> = coords.iter().map(|coord| coord.col).collect();
    let rows: BTreeSet<u8> = coords.iter().map(|coord| coord.row).collect();
    let mut horizontal = cols.len() > 1;
    let vertical = rows.len() > 1;
    if horizontal && vertical {
        warn!("placement spans both axes: {coords:?}");
        return Classification::Invalid;
    }

    let first = coords[0];
    let orientation = if coords.len() == 1 {
        horizontal = first.left().is_some_and(|c| board.contains(c))
            || first.right().is_some_and(|c| board.contains(c));
        let vertical = !horizontal
            && (first.up().is_some_and(|c| board.contains(c))
                || first.down().is_some_and(|c| board.contains(c)));
        if vertical {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    } else if vertical {
        Orientation::Vertical
    } else {
        Orientation::Horizontal
    };

    let mut anchor = first;
    while let Some(prev) = orientation.back(anchor) {
        if !board.contains(prev) {
            break;
        }
        anchor = prev;
    }

    let mut word = String::new();
    let mut covered = 0;
    let mut cursor = Some(anchor);
    while let Some(coord) = cursor {
        let Some(tile) = board.get(coord) else { break };
        if new_tiles.contains_key(&coord) {
            word.push(tile.letter);
            covered += 1;
        } else {
            word.push('.');
        }
        cursor = orientation.step(coord);
    }
    if covered < new_tiles.len() {
        warn!(
            "{} new tiles are not connected to the word at {}",
            new_tiles.len() - covered,
            anchor.gcg_label(orientation)
        );
        return Classification::Invalid;
    }

    Classification::Word(Placement::new(anchor, orientation, word))
}

/// Candidate squares reachable from `start` by 4-connected steps
/// through other candidates. Squares in `ignore` may be crossed but
/// are not analyzed again.
pub fn reachable_candidates(
    start: Coord,
    candidates: &BTreeSet<Coord>,
    ignore: &BTreeSet<Coord>,
) -> BTreeSet<Coord> {
    let mut pending = candidates.clone();
    let mut result = BTreeSet::new();
    let mut stack = vec![start];
    while let Some(coord) = stack.pop() {
        if pending.remove(&coord) {
            if !ignore.contains(&coord) {
                result.insert(coord);
            }
            stack.extend(coord.neighbours());
        }
    }
    result
}

/// Splits coordinates round-robin into `parts` disjoint partitions.
pub fn round_robin_chunks(coords: &BTreeSet<Coord>, parts: usize) -> Vec<Vec<Coord>> {
    debug_assert!(parts > 0);
    (0..parts)
        .map(|lane| {
            coords
                .iter()
                .copied()
                .skip(lane)
                .step_by(parts)
                .collect()
        })
        .collect()
}
