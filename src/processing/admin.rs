//! Admin corrections and the recalculation cascade. Every operation
//! validates first and leaves the game untouched on failure; after a
//! successful edit the history is replayed from the edited move so
//! scores stay derivable from the move list.

use tracing::{info, warn};

use crate::board::{Board, Coord, Tile, TileMap, BLANK};
use crate::config::GameParams;
use crate::error::{TileWatchError, TwResult};
use crate::game::{opponent, Game, Move, MoveKind, Placement, RACK_SIZE};
use crate::inference::{classify, Classification};

/// Confidence of tiles placed by an admin edit. High enough to win
/// against any recognition result, low enough to stay re-analyzable.
pub const ADMIN_CONFIDENCE: u8 = 99;

/// Replays the history from move index `start`: each move's board is
/// rebuilt from its predecessor, words and points are re-derived per
/// kind and the cumulative score is chained forward.
pub fn replay_from(game: &mut Game, params: &GameParams, start: usize) {
    let len = game.moves.len();
    for index in start..len {
        let prev = index.checked_sub(1).map(|i| game.moves[i].clone());
        let before = index.checked_sub(2).map(|i| game.moves[i].clone());
        let old = game.moves[index].clone();
        let mut rebuilt = rebuild(game, params, &old, prev.as_ref(), before.as_ref());
        rebuilt.number = index + 1;
        game.moves[index] = rebuilt;
    }
    if start < len {
        info!("replayed moves {}..{}", start + 1, len);
    }
}

/// One replayed move. `prev` feeds the incoming board and score,
/// `before` is only needed to restore the state a withdraw reverts to.
fn rebuild(
    game: &Game,
    params: &GameParams,
    old: &Move,
    prev: Option<&Move>,
    before: Option<&Move>,
) -> Move {
    let mut rebuilt = match old.kind {
        MoveKind::Regular | MoveKind::Exchange | MoveKind::Unknown => {
            let mut board = prev.map_or_else(Board::new, |p| p.board.clone());
            for coord in old.removed_tiles.keys() {
                board.remove(*coord);
            }
            board.merge(&old.new_tiles);
            match classify(&board, &old.new_tiles) {
                Classification::Word(placement) => Move::regular(
                    game.language,
                    old.player,
                    placement,
                    board,
                    old.new_tiles.clone(),
                    old.removed_tiles.clone(),
                    old.played_time,
                    old.img.clone(),
                    prev,
                ),
                Classification::NoMove => Move::exchange(
                    old.player,
                    board,
                    old.removed_tiles.clone(),
                    old.played_time,
                    old.img.clone(),
                    prev,
                ),
                Classification::Invalid => Move::unknown(
                    old.player,
                    board,
                    old.new_tiles.clone(),
                    old.removed_tiles.clone(),
                    old.played_time,
                    old.img.clone(),
                    prev,
                ),
            }
        }
        MoveKind::Withdraw => {
            let player = prev.map_or(old.player, |p| p.player);
            let mut mov = Move::base(MoveKind::Withdraw, player, old.played_time, prev);
            mov.points = prev.map_or(0, |p| -p.points);
            mov.score[player] += mov.points;
            mov.placement = prev.and_then(|p| p.placement.clone());
            mov.removed_tiles = prev.map_or_else(TileMap::new, |p| p.new_tiles.clone());
            match before {
                Some(b) => {
                    mov.board = b.board.clone();
                    mov.rack_size = b.rack_size;
                }
                None => {
                    mov.board = Board::new();
                    mov.rack_size = [RACK_SIZE, RACK_SIZE];
                }
            }
            mov.img = old.img.clone();
            mov
        }
        MoveKind::ChallengeBonus => {
            let mut mov =
                Move::base(MoveKind::ChallengeBonus, old.player, old.played_time, prev);
            mov.points = -params.malus_doubt;
            mov.score[old.player] += mov.points;
            mov.img = old.img.clone();
            mov
        }
        MoveKind::TimeMalus | MoveKind::LastRackBonus | MoveKind::LastRackMalus => {
            let mut mov = Move::base(old.kind, old.player, old.played_time, prev);
            mov.points = old.points;
            mov.score[old.player] += old.points;
            mov.rack = old.rack.clone();
            mov.img = old.img.clone();
            mov
        }
    };
    rebuilt.modified = old.modified;
    rebuilt.committed_at = old.committed_at;
    rebuilt
}

fn move_index(game: &Game, number: usize) -> TwResult<usize> {
    number
        .checked_sub(1)
        .filter(|&index| index < game.moves.len())
        .ok_or(TileWatchError::NoSuchMove(number))
}

fn valid_word_char(ch: char) -> bool {
    ch == BLANK
        || ch.is_ascii_uppercase()
        || matches!(ch, 'Ä' | 'Ö' | 'Ü')
        || (ch.is_alphabetic() && ch.is_lowercase())
}

/// The tiles a corrected word adds on top of `previous`. Letters
/// landing on occupied squares are treated as '.'.
fn tiles_for_word(previous: &Board, placement: &Placement) -> TwResult<TileMap> {
    if placement.word.is_empty() {
        return Err(TileWatchError::Edit(String::from("empty word")));
    }
    let mut tiles = TileMap::new();
    for (i, ch) in placement.word.chars().enumerate() {
        let coord = placement.orientation.offset(placement.anchor, i).ok_or_else(|| {
            TileWatchError::Edit(format!("word {:?} runs off the board", placement.word))
        })?;
        if ch == '.' {
            if !previous.contains(coord) {
                return Err(TileWatchError::Edit(format!(
                    "no tile to cover at {}",
                    coord.status_key()
                )));
            }
            continue;
        }
        if !valid_word_char(ch) {
            return Err(TileWatchError::Edit(format!("invalid character {ch:?} in word")));
        }
        if previous.contains(coord) {
            continue;
        }
        tiles.insert(coord, Tile::new(ch, ADMIN_CONFIDENCE));
    }
    if tiles.is_empty() {
        return Err(TileWatchError::Edit(format!(
            "word {:?} adds no tiles",
            placement.word
        )));
    }
    Ok(tiles)
}

/// Replaces the word of move `number` and cascades. Returns the index
/// the replay started from.
pub fn change_move(
    game: &mut Game,
    params: &GameParams,
    number: usize,
    placement: Placement,
) -> TwResult<usize> {
    let index = move_index(game, number)?;
    let kind = game.moves[index].kind;
    if !matches!(kind, MoveKind::Regular | MoveKind::Exchange | MoveKind::Unknown) {
        return Err(TileWatchError::Edit(format!("can not edit a {kind} move")));
    }
    let previous_board = index
        .checked_sub(1)
        .map_or_else(Board::new, |i| game.moves[i].board.clone());
    let new_tiles = tiles_for_word(&previous_board, &placement)?;

    info!(
        "move #{number}: set word {} at {}",
        placement.word,
        placement.anchor.gcg_label(placement.orientation)
    );
    let mov = &mut game.moves[index];
    mov.kind = MoveKind::Regular;
    mov.new_tiles = new_tiles;
    mov.removed_tiles.clear();
    mov.modified = true;
    replay_from(game, params, index);
    Ok(index)
}

/// Converts move `number` into an exchange, dropping its tiles.
pub fn to_exchange(game: &mut Game, params: &GameParams, number: usize) -> TwResult<usize> {
    let index = move_index(game, number)?;
    let kind = game.moves[index].kind;
    if !matches!(kind, MoveKind::Regular | MoveKind::Unknown) {
        return Err(TileWatchError::Edit(format!(
            "can not turn a {kind} move into an exchange"
        )));
    }
    info!("move #{number}: convert to exchange");
    let mov = &mut game.moves[index];
    mov.kind = MoveKind::Exchange;
    mov.new_tiles.clear();
    mov.modified = true;
    replay_from(game, params, index);
    Ok(index)
}

/// Splices two exchange moves in front of move `number`, one per
/// player starting with the mover of that move.
pub fn insert_moves(game: &mut Game, params: &GameParams, number: usize) -> TwResult<usize> {
    let index = move_index(game, number)?;
    let player = game.moves[index].player;
    let played_time = game.moves[index].played_time;
    info!("insert two exchanges before move #{number}");

    let mut second = Move::base(MoveKind::Exchange, opponent(player), played_time, None);
    second.modified = true;
    game.moves.insert(index, second);
    let mut first = Move::base(MoveKind::Exchange, player, played_time, None);
    first.modified = true;
    game.moves.insert(index, first);
    replay_from(game, params, index);
    Ok(index)
}

/// Inserts a challenge settlement after move `number`. `kind` selects
/// a withdraw (valid challenge) or a challenge bonus (invalid one).
pub fn insert_challenge(
    game: &mut Game,
    params: &GameParams,
    number: usize,
    kind: MoveKind,
) -> TwResult<usize> {
    if !matches!(kind, MoveKind::Withdraw | MoveKind::ChallengeBonus) {
        return Err(TileWatchError::Edit(format!("{kind} is not a challenge kind")));
    }
    let index = move_index(game, number)?;
    let target = &game.moves[index];
    if !target.is_challengeable() {
        return Err(TileWatchError::Edit(format!(
            "can not challenge a {} move",
            target.kind
        )));
    }
    let player = match kind {
        MoveKind::Withdraw => target.player,
        _ => opponent(target.player),
    };
    info!("insert {kind} after move #{number}");
    let mut mov = Move::base(kind, player, target.played_time, None);
    mov.modified = true;
    game.moves.insert(index + 1, mov);
    replay_from(game, params, index + 1);
    Ok(index + 1)
}

/// Removes the challenge settlement at move `number` and renumbers.
pub fn delete_challenge(game: &mut Game, params: &GameParams, number: usize) -> TwResult<usize> {
    let index = move_index(game, number)?;
    let kind = game.moves[index].kind;
    if !matches!(kind, MoveKind::Withdraw | MoveKind::ChallengeBonus) {
        return Err(TileWatchError::Edit(format!("move #{number} is not a challenge")));
    }
    info!("delete {kind} at move #{number}");
    game.moves.remove(index);
    replay_from(game, params, index);
    Ok(index)
}

/// Flips a challenge between valid and invalid. The acting player
/// flips with it: a withdraw belongs to the withdrawn mover, a bonus
/// to the challenger.
pub fn toggle_challenge(game: &mut Game, params: &GameParams, number: usize) -> TwResult<usize> {
    let index = move_index(game, number)?;
    let mov = &mut game.moves[index];
    mov.kind = match mov.kind {
        MoveKind::Withdraw => MoveKind::ChallengeBonus,
        MoveKind::ChallengeBonus => MoveKind::Withdraw,
        kind => {
            return Err(TileWatchError::Edit(format!("move #{number} is not a challenge, but {kind}")))
        }
    };
    mov.player = opponent(mov.player);
    mov.modified = true;
    info!("move #{number} toggled to {}", game.moves[index].kind);
    replay_from(game, params, index);
    Ok(index)
}

/// Assigns a letter to the blank at `coord` across the whole history.
pub fn set_blank(game: &mut Game, coord: Coord, letter: char) -> TwResult<usize> {
    if letter == BLANK || !letter.is_alphabetic() || !letter.is_lowercase() {
        return Err(TileWatchError::Edit(format!(
            "blank letter must be lowercase, got {letter:?}"
        )));
    }
    assign_blank(game, coord, letter)
}

/// Reverts the blank at `coord` to the unassigned marker.
pub fn remove_blank(game: &mut Game, coord: Coord) -> TwResult<usize> {
    assign_blank(game, coord, BLANK)
}

fn assign_blank(game: &mut Game, coord: Coord, letter: char) -> TwResult<usize> {
    let mut first = None;
    for (index, mov) in game.moves.iter().enumerate() {
        let Some(tile) = mov.board.get(coord) else { continue };
        if !tile.is_blank() {
            return Err(TileWatchError::Edit(format!(
                "tile at {} is no blank",
                coord.status_key()
            )));
        }
        if first.is_none() {
            first = Some(index);
        }
    }
    let Some(first) = first else {
        return Err(TileWatchError::Edit(format!("no tile at {}", coord.status_key())));
    };

    info!("blank at {} set to {letter:?}", coord.status_key());
    for mov in &mut game.moves[first..] {
        let Some(tile) = mov.board.get(coord) else { continue };
        let patched = Tile::new(letter, tile.confidence);
        mov.board.insert(coord, patched);
        if mov.new_tiles.contains_key(&coord) {
            mov.new_tiles.insert(coord, patched);
        }
        if mov.removed_tiles.contains_key(&coord) {
            mov.removed_tiles.insert(coord, patched);
        }
        patch_word(mov, coord, letter);
    }
    Ok(first)
}

/// Rewrites the word character standing on `coord`. Covered positions
/// ('.') stay covered, they render through the board anyway.
fn patch_word(mov: &mut Move, coord: Coord, letter: char) {
    let Some(placement) = &mut mov.placement else { return };
    let mut chars: Vec<char> = placement.word.chars().collect();
    for (i, ch) in chars.iter_mut().enumerate() {
        match placement.orientation.offset(placement.anchor, i) {
            Some(cell) if cell == coord => {
                if *ch != '.' {
                    *ch = letter;
                }
                break;
            }
            Some(_) => {}
            None => break,
        }
    }
    placement.word = chars.into_iter().collect();
}

/// Absorbs higher-confidence re-reads of old squares: every board in
/// history is patched, and the moves inside the re-read window are
/// replayed so words and points follow the corrected letters. Older
/// moves keep their recorded word, the window is the bound the
/// recognizer is trusted to revise.
pub fn apply_changed_tiles(game: &mut Game, params: &GameParams, changed: &TileMap) {
    let len = game.moves.len();
    let window_start = len.saturating_sub(params.verify_moves);
    let mut first = len;
    for index in 0..len {
        let mov = &mut game.moves[index];
        let mut touched = false;
        for (&coord, &tile) in changed {
            if mov.board.contains(coord) {
                mov.board.insert(coord, tile);
                touched = true;
            }
            if mov.new_tiles.contains_key(&coord) {
                mov.new_tiles.insert(coord, tile);
            }
        }
        if touched && index >= window_start {
            first = first.min(index);
        }
    }
    if first < len {
        warn!("re-read changed {} square(s), replaying from move #{}", changed.len(), first + 1);
        replay_from(game, params, first);
    }
}
