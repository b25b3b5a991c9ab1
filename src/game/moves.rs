use std::path::PathBuf;

use chrono::{DateTime, Local};
use strum_macros::Display;

use crate::board::layout::{self, Language, FULL_RACK_BONUS};
use crate::board::{Board, Coord, Orientation, TileMap};

/// Starting rack size per player.
pub const RACK_SIZE: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveKind {
    Regular,
    Exchange,
    Withdraw,
    ChallengeBonus,
    LastRackBonus,
    LastRackMalus,
    TimeMalus,
    Unknown,
}

/// Position of a regular move's word: the first square of the full
/// word, its direction, and the word with '.' standing in for letters
/// that were already on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub anchor: Coord,
    pub orientation: Orientation,
    pub word: String,
}

impl Placement {
    pub fn new(anchor: Coord, orientation: Orientation, word: impl Into<String>) -> Self {
        Self {
            anchor,
            orientation,
            word: word.into(),
        }
    }
}

/// One entry of the game history. Carries a full board snapshot so any
/// move can be re-derived or corrected without replaying the camera.
#[derive(Debug, Clone)]
pub struct Move {
    /// 1-based position in the history, assigned on append.
    pub number: usize,
    pub kind: MoveKind,
    pub player: usize,
    pub placement: Option<Placement>,
    pub points: i32,
    /// Cumulative score of both players after this move.
    pub score: [i32; 2],
    pub is_scrabble: bool,
    pub board: Board,
    pub new_tiles: TileMap,
    pub removed_tiles: TileMap,
    /// Seconds each player had used when the move was committed.
    pub played_time: [u32; 2],
    /// Estimated tiles on each rack after this move.
    pub rack_size: [i32; 2],
    /// Leftover letters, set on the end-of-game rack moves only.
    pub rack: Option<String>,
    pub img: Option<PathBuf>,
    pub modified: bool,
    pub committed_at: DateTime<Local>,
}

impl Move {
    /// Skeleton move inheriting board, score and rack sizes from its
    /// predecessor. Callers fill in the kind-specific fields.
    pub(crate) fn base(
        kind: MoveKind,
        player: usize,
        played_time: [u32; 2],
        previous: Option<&Move>,
    ) -> Self {
        let (board, score, rack_size) = match previous {
            Some(prev) => (prev.board.clone(), prev.score, prev.rack_size),
            None => (Board::new(), [0, 0], [RACK_SIZE, RACK_SIZE]),
        };
        Self {
            number: 0,
            kind,
            player,
            placement: None,
            points: 0,
            score,
            is_scrabble: false,
            board,
            new_tiles: TileMap::new(),
            removed_tiles: TileMap::new(),
            played_time,
            rack_size,
            rack: None,
            img: None,
            modified: false,
            committed_at: Local::now(),
        }
    }

    /// A word placement with derived points, score and rack sizes.
    #[allow(clippy::too_many_arguments)]
    pub fn regular(
        language: Language,
        player: usize,
        placement: Placement,
        board: Board,
        new_tiles: TileMap,
        removed_tiles: TileMap,
        played_time: [u32; 2],
        img: Option<PathBuf>,
        previous: Option<&Move>,
    ) -> Self {
        let mut mov = Self::base(MoveKind::Regular, player, played_time, previous);
        let (points, is_scrabble) = score_word(language, &board, &new_tiles, &placement);
        mov.rack_size = racks_after_draw(language, previous, player, new_tiles.len());
        mov.points = points;
        mov.score[player] += points;
        mov.is_scrabble = is_scrabble;
        mov.placement = Some(placement);
        mov.board = board;
        mov.new_tiles = new_tiles;
        mov.removed_tiles = removed_tiles;
        mov.img = img;
        mov
    }

    /// A turn without detectable new tiles: pass or tile exchange.
    /// The analyzed board is kept so confidence upgrades survive.
    pub fn exchange(
        player: usize,
        board: Board,
        removed_tiles: TileMap,
        played_time: [u32; 2],
        img: Option<PathBuf>,
        previous: Option<&Move>,
    ) -> Self {
        let mut mov = Self::base(MoveKind::Exchange, player, played_time, previous);
        mov.board = board;
        mov.removed_tiles = removed_tiles;
        mov.img = img;
        mov
    }

    /// An unclassifiable placement. Zero points, but the board is
    /// updated so later diffs stay consistent.
    pub fn unknown(
        player: usize,
        board: Board,
        new_tiles: TileMap,
        removed_tiles: TileMap,
        played_time: [u32; 2],
        img: Option<PathBuf>,
        previous: Option<&Move>,
    ) -> Self {
        let mut mov = Self::base(MoveKind::Unknown, player, played_time, previous);
        mov.board = board;
        mov.new_tiles = new_tiles;
        mov.removed_tiles = removed_tiles;
        mov.img = img;
        mov
    }

    /// Malus applied when remaining time went negative. `overdrawn` is
    /// the (negative) remaining seconds at the end of the game.
    pub fn time_malus(
        player: usize,
        overdrawn: i64,
        malus_per_minute: i32,
        previous: Option<&Move>,
    ) -> Self {
        let played_time = previous.map_or([0, 0], |prev| prev.played_time);
        let mut mov = Self::base(MoveKind::TimeMalus, player, played_time, previous);
        if overdrawn < 0 {
            mov.points = (overdrawn.div_euclid(60) as i32) * malus_per_minute;
            mov.score[player] += mov.points;
        }
        mov.img = previous.and_then(|prev| prev.img.clone());
        mov
    }

    /// End-of-game rack bonus or malus. `points` is signed; the rack
    /// string holds the opponent's leftover letters.
    pub fn last_rack(
        kind: MoveKind,
        player: usize,
        points: i32,
        rack: String,
        previous: Option<&Move>,
    ) -> Self {
        debug_assert!(matches!(
            kind,
            MoveKind::LastRackBonus | MoveKind::LastRackMalus
        ));
        let played_time = previous.map_or([0, 0], |prev| prev.played_time);
        let mut mov = Self::base(kind, player, played_time, previous);
        mov.points = points;
        mov.score[player] += points;
        mov.rack = Some(rack);
        mov.img = previous.and_then(|prev| prev.img.clone());
        mov
    }

    pub fn is_challengeable(&self) -> bool {
        matches!(self.kind, MoveKind::Regular | MoveKind::ChallengeBonus)
    }

    fn mod_str(&self) -> &'static str {
        if self.modified {
            "\u{270F}"
        } else {
            ""
        }
    }

    /// The word in GCG notation: letters already on the board appear
    /// parenthesized, adjacent parentheses merged ("(S)UPER").
    pub fn gcg_word(&self) -> String {
        match self.kind {
            MoveKind::Regular => {
                let Some(placement) = &self.placement else {
                    return String::new();
                };
                let mut out = String::new();
                for (i, ch) in placement.word.chars().enumerate() {
                    if ch != '.' {
                        out.push(ch);
                        continue;
                    }
                    let cell = placement
                        .orientation
                        .offset(placement.anchor, i)
                        .and_then(|coord| self.board.get(coord));
                    if let Some(tile) = cell {
                        out.push('(');
                        out.push(tile.letter);
                        out.push(')');
                    }
                }
                out.replace(")(", "")
            }
            MoveKind::Withdraw => self
                .placement
                .as_ref()
                .map(|placement| placement.word.clone())
                .unwrap_or_default(),
            MoveKind::LastRackBonus | MoveKind::LastRackMalus => {
                self.rack.clone().unwrap_or_default()
            }
            _ => String::new(),
        }
    }

    /// One line of the GCG transcript.
    pub fn gcg_line(&self, nicknames: &[String; 2]) -> String {
        let name = &nicknames[self.player];
        let prefix = format!("> {}{}:", self.mod_str(), name);
        let score = self.score[self.player];
        match self.kind {
            MoveKind::Regular => {
                let coord = self
                    .placement
                    .as_ref()
                    .map(|placement| placement.anchor.gcg_label(placement.orientation))
                    .unwrap_or_default();
                format!("{prefix} {coord} {} {} {score}", self.gcg_word(), self.points)
            }
            MoveKind::Exchange => format!("{prefix} -  {} {score}", self.points),
            MoveKind::Withdraw => format!("{prefix} -- {} {score}", self.points),
            MoveKind::ChallengeBonus => format!("{prefix} (challenge) {} {score}", self.points),
            MoveKind::LastRackBonus | MoveKind::LastRackMalus => {
                format!("{prefix} rack={} {} {score}", self.gcg_word(), self.points)
            }
            MoveKind::TimeMalus => format!("{prefix} (time) {} {score}", self.points),
            MoveKind::Unknown => format!("{prefix} (unknown) ? {score}"),
        }
    }
}

/// Rack sizes after `player` draws replacements for `taken` placed
/// tiles. Draws are capped by what the bag still holds.
pub(crate) fn racks_after_draw(
    language: Language,
    previous: Option<&Move>,
    player: usize,
    taken: usize,
) -> [i32; 2] {
    let (racks, tiles_on_board) = match previous {
        Some(prev) => (prev.rack_size, prev.board.len() as i32),
        None => ([RACK_SIZE, RACK_SIZE], 0),
    };
    let take = taken as i32;
    let in_bag = language.bag_size() as i32 - tiles_on_board - racks[0] - racks[1];
    let mut next = racks;
    next[player] = racks[player] - take + take.min(in_bag);
    next
}

/// Points of a placed word on `board`, plus whether it emptied the
/// rack. Newly placed squares activate their letter bonus, multiply
/// the word bonus and score any perpendicular word they complete.
pub fn score_word(
    language: Language,
    board: &Board,
    new_tiles: &TileMap,
    placement: &Placement,
) -> (i32, bool) {
    let mut points = 0;
    let mut crossing_words = 0;
    let mut word_multiplier = 1;

    let mut cursor = Some(placement.anchor);
    while let Some(coord) = cursor {
        let Some(tile) = board.get(coord) else { break };
        if new_tiles.contains_key(&coord) {
            points += language.letter_score(tile.letter) * layout::letter_multiplier(coord);
            word_multiplier *= layout::word_multiplier(coord);
            crossing_words += crossing_word_score(
                language,
                board,
                new_tiles,
                coord,
                placement.orientation.crossed(),
            );
        } else {
            points += language.letter_score(tile.letter);
        }
        cursor = placement.orientation.step(coord);
    }

    let mut total = points * word_multiplier + crossing_words;
    let is_scrabble = new_tiles.len() >= 7;
    if is_scrabble {
        total += FULL_RACK_BONUS;
    }
    (total, is_scrabble)
}

/// Score of the perpendicular word through `coord`, or 0 if that word
/// is only the tile itself.
fn crossing_word_score(
    language: Language,
    board: &Board,
    new_tiles: &TileMap,
    coord: Coord,
    orientation: Orientation,
) -> i32 {
    let mut start = coord;
    while let Some(prev) = orientation.back(start) {
        if !board.contains(prev) {
            break;
        }
        start = prev;
    }

    let mut cells = Vec::new();
    let mut cursor = Some(start);
    while let Some(current) = cursor {
        let Some(tile) = board.get(current) else { break };
        cells.push((current, tile.letter));
        cursor = orientation.step(current);
    }
    if cells.len() <= 1 {
        return 0;
    }

    let mut score = 0;
    let mut multiplier = 1;
    for (cell, letter) in cells {
        if new_tiles.contains_key(&cell) {
            score += language.letter_score(letter) * layout::letter_multiplier(cell);
            multiplier *= layout::word_multiplier(cell);
        } else {
            score += language.letter_score(letter);
        }
    }
    score * multiplier
}
