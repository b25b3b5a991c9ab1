pub mod moves;

pub use moves::{Move, MoveKind, Placement, RACK_SIZE};

use std::fmt;

use chrono::{DateTime, Local};

use crate::board::layout::Language;
use crate::board::{Board, BLANK};
use crate::error::{TileWatchError, TwResult};

/// The other player of a two player game.
pub fn opponent(player: usize) -> usize {
    1 - player
}

/// Full game history. Mutated only by the command worker; everyone
/// else reads committed snapshots.
#[derive(Debug, Clone)]
pub struct Game {
    pub language: Language,
    pub nicknames: [String; 2],
    pub started_at: DateTime<Local>,
    pub moves: Vec<Move>,
}

impl Game {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            nicknames: [String::from("Name1"), String::from("Name2")],
            started_at: Local::now(),
            moves: Vec::new(),
        }
    }

    /// Clears the history for a new game. Nicknames survive.
    pub fn reset(&mut self) {
        self.moves.clear();
        self.started_at = Local::now();
    }

    pub fn set_nicknames(&mut self, name0: impl Into<String>, name1: impl Into<String>) {
        self.nicknames = [name0.into(), name1.into()];
    }

    pub fn last(&self) -> Option<&Move> {
        self.moves.last()
    }

    pub fn current_board(&self) -> Board {
        self.moves
            .last()
            .map_or_else(Board::new, |mov| mov.board.clone())
    }

    pub fn current_score(&self) -> [i32; 2] {
        self.moves.last().map_or([0, 0], |mov| mov.score)
    }

    /// Appends a move, assigning its 1-based number.
    pub fn add_move(&mut self, mut mov: Move) -> &Move {
        mov.number = self.moves.len() + 1;
        self.moves.push(mov);
        &self.moves[self.moves.len() - 1]
    }

    /// Settles a valid challenge: the last move is withdrawn, board and
    /// rack sizes revert to the state before it.
    pub fn add_valid_challenge(&mut self, played_time: [u32; 2]) -> TwResult<&Move> {
        let len = self.moves.len();
        let Some(last) = self.moves.last() else {
            return Err(TileWatchError::Edit(String::from("no move to withdraw")));
        };
        if !last.is_challengeable() {
            return Err(TileWatchError::Edit(format!(
                "can not withdraw a {} move",
                last.kind
            )));
        }

        let player = last.player;
        let points = -last.points;
        let mut mov = Move::base(MoveKind::Withdraw, player, played_time, Some(last));
        mov.points = points;
        mov.score[player] += points;
        mov.placement = last.placement.clone();
        mov.removed_tiles = last.new_tiles.clone();
        mov.img = last.img.clone();
        match len.checked_sub(2).map(|idx| &self.moves[idx]) {
            Some(before) => {
                mov.board = before.board.clone();
                mov.rack_size = before.rack_size;
            }
            None => {
                mov.board = Board::new();
                mov.rack_size = [RACK_SIZE, RACK_SIZE];
            }
        }
        Ok(self.add_move(mov))
    }

    /// Settles an invalid challenge: a fixed malus against the
    /// challenger, board untouched.
    pub fn add_invalid_challenge(
        &mut self,
        challenger: usize,
        malus: i32,
        played_time: [u32; 2],
    ) -> TwResult<&Move> {
        let Some(last) = self.moves.last() else {
            return Err(TileWatchError::Edit(String::from("no move to challenge")));
        };
        if !last.is_challengeable() {
            return Err(TileWatchError::Edit(format!(
                "can not challenge a {} move",
                last.kind
            )));
        }

        let mut mov = Move::base(MoveKind::ChallengeBonus, challenger, played_time, Some(last));
        mov.points = -malus;
        mov.score[challenger] -= malus;
        mov.img = last.img.clone();
        Ok(self.add_move(mov))
    }

    /// Records overdrawn playing time as a malus. No move is added
    /// when the player finished within the limit.
    pub fn add_time_malus(&mut self, player: usize, remaining: i64, malus_per_minute: i32) {
        if remaining >= 0 {
            return;
        }
        let mov = Move::time_malus(player, remaining, malus_per_minute, self.moves.last());
        self.add_move(mov);
    }

    /// Records the end-of-game rack transfer as a bonus/malus pair.
    pub fn add_last_rack(&mut self, player: usize, rack: String, points: i32) {
        let bonus = Move::last_rack(
            MoveKind::LastRackBonus,
            player,
            points,
            rack.clone(),
            self.moves.last(),
        );
        self.add_move(bonus);
        let malus = Move::last_rack(
            MoveKind::LastRackMalus,
            opponent(player),
            -points,
            rack,
            self.moves.last(),
        );
        self.add_move(malus);
    }

    /// Letters still off the board after `mov`: the bag plus both
    /// racks. Lowercase letters count as the blank they stand on.
    pub fn bag_after(&self, mov: &Move) -> Vec<char> {
        let mut bag = self.language.full_bag();
        for (_, tile) in mov.board.iter() {
            let target = if tile.letter.is_alphabetic() && tile.letter.is_lowercase() {
                BLANK
            } else {
                tile.letter
            };
            if let Some(pos) = bag.iter().position(|&c| c == target) {
                bag.remove(pos);
            }
        }
        bag
    }

    /// Estimates the final racks by walking the history backward to
    /// the last point where the bag still covered both racks, then
    /// replaying the draws. Some((player, letters, value)) when
    /// exactly that player's rack ended empty.
    pub fn rack_adjustment(&self) -> Option<(usize, String, i32)> {
        let len = self.moves.len();
        if len == 0 {
            return None;
        }

        let mut bag_len: i32 = 0;
        let mut pivot = len - 1;
        for idx in (1..len).rev() {
            pivot = idx;
            let bag = self.bag_after(&self.moves[idx]);
            if bag.len() >= 14 {
                bag_len = bag.len() as i32 - 14;
                break;
            }
        }

        let mut rack = [RACK_SIZE, RACK_SIZE];
        for mov in &self.moves[pivot + 1..] {
            let placed = mov.new_tiles.len() as i32;
            let from_bag = placed.min(bag_len);
            rack[mov.player] -= placed - from_bag;
            bag_len -= from_bag;
        }

        let bag = self.bag_after(&self.moves[len - 1]);
        let points: i32 = bag.iter().map(|&c| self.language.letter_score(c)).sum();
        let letters: String = bag.iter().collect();
        if rack[0] == 0 && rack[1] > 0 {
            return Some((0, letters, points));
        }
        if rack[1] == 0 && rack[0] > 0 {
            return Some((1, letters, points));
        }
        None
    }

    /// The transcript up to and including move index `upto`.
    pub fn gcg_lines(&self, upto: usize) -> Vec<String> {
        let end = (upto + 1).min(self.moves.len());
        self.moves[..end]
            .iter()
            .map(|mov| mov.gcg_line(&self.nicknames))
            .collect()
    }

    /// The current board with the latest move's tiles marked.
    pub fn board_str(&self) -> String {
        match self.moves.last() {
            Some(mov) => mov.board.grid(&mov.new_tiles, &mov.removed_tiles),
            None => Board::new().to_string(),
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let score = self.current_score();
        writeln!(
            f,
            "{} {} - {} {}",
            self.nicknames[0], score[0], self.nicknames[1], score[1]
        )?;
        write!(f, "{}", self.board_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Coord, Orientation, Tile, TileMap};

    fn play_word(game: &mut Game, player: usize, col: u8, row: u8, word: &str) {
        let mut board = game.current_board();
        let mut new_tiles = TileMap::new();
        for (i, letter) in word.chars().enumerate() {
            let coord = Coord::new(col + i as u8, row);
            if board.contains(coord) {
                continue;
            }
            let tile = Tile::new(letter, 90);
            board.insert(coord, tile);
            new_tiles.insert(coord, tile);
        }
        let placement = Placement::new(Coord::new(col, row), Orientation::Horizontal, word);
        let mov = Move::regular(
            game.language,
            player,
            placement,
            board,
            new_tiles,
            TileMap::new(),
            [0, 0],
            None,
            game.last(),
        );
        game.add_move(mov);
    }

    #[test]
    fn invalid_challenge_applies_the_malus() {
        let mut game = Game::new(Language::German);
        play_word(&mut game, 0, 3, 7, "FIRNS");
        assert_eq!(game.current_score(), [24, 0]);

        assert!(game.add_invalid_challenge(0, 10, [30, 0]).is_ok());
        assert_eq!(game.current_score(), [14, 0]);
        assert_eq!(game.moves[1].kind, MoveKind::ChallengeBonus);
        assert_eq!(game.moves[1].points, -10);
    }

    #[test]
    fn valid_challenge_restores_the_previous_state() {
        let mut game = Game::new(Language::German);
        play_word(&mut game, 0, 3, 7, "FIRNS");
        play_word(&mut game, 1, 3, 8, "SUHLE");
        let before = game.moves[0].board.clone();
        let score_before = game.moves[0].score;

        let result = game.add_valid_challenge([40, 20]);
        assert!(result.is_ok());
        let withdraw = &game.moves[2];
        assert_eq!(withdraw.kind, MoveKind::Withdraw);
        assert_eq!(withdraw.player, 1);
        assert_eq!(withdraw.score, score_before);
        assert_eq!(withdraw.board.len(), before.len());
        assert_eq!(withdraw.removed_tiles.len(), 5);
    }

    #[test]
    fn withdrawing_the_opening_move_empties_the_board() {
        let mut game = Game::new(Language::German);
        play_word(&mut game, 0, 3, 7, "FIRNS");

        let result = game.add_valid_challenge([15, 0]);
        assert!(result.is_ok());
        let withdraw = &game.moves[1];
        assert!(withdraw.board.is_empty());
        assert_eq!(withdraw.score, [0, 0]);
        assert_eq!(withdraw.rack_size, [7, 7]);
    }

    #[test]
    fn challenges_need_a_challengeable_move() {
        let mut game = Game::new(Language::German);
        assert!(game.add_valid_challenge([0, 0]).is_err());
        assert!(game.add_invalid_challenge(0, 10, [0, 0]).is_err());

        let exchange = Move::exchange(0, Board::new(), TileMap::new(), [5, 0], None, None);
        game.add_move(exchange);
        assert!(game.add_valid_challenge([9, 0]).is_err());
        assert_eq!(game.moves.len(), 1);
    }

    #[test]
    fn rack_adjustment_needs_an_empty_rack() {
        let mut game = Game::new(Language::German);
        play_word(&mut game, 0, 3, 7, "FIRNS");
        assert!(game.rack_adjustment().is_none());
    }

    #[test]
    fn move_numbers_stay_contiguous() {
        let mut game = Game::new(Language::German);
        play_word(&mut game, 0, 3, 7, "FIRNS");
        play_word(&mut game, 1, 3, 8, "SUHLE");
        let numbers: Vec<usize> = game.moves.iter().map(|mov| mov.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
