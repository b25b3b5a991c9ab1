//! The command processor. Owns the game, runs the vision fan-out and
//! the move pipeline, applies admin corrections and publishes every
//! mutation.

pub mod admin;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::board::{Board, Coord, Tile, BLANK};
use crate::config::{Config, GameParams};
use crate::error::{TileWatchError, TwResult};
use crate::game::moves::score_word;
use crate::game::{Game, Move, MoveKind};
use crate::inference::{
    classify, diff, discard_stray_blanks, reachable_candidates, round_robin_chunks,
    Classification, FALLBACK_CONFIDENCE, KEEP_CONFIDENCE,
};
use crate::records::{DevRecorder, Recorder};
use crate::vision::{Frame, FrameSlot, Vision};
use crate::worker::{Command, GameView, StatusHub};

/// Analysis runs on this many workers: two pooled, one inline.
const ANALYZE_WORKERS: usize = 3;

/// Tile placements start from the center star.
const CENTER: (u8, u8) = (7, 7);

pub struct Processor {
    game: Game,
    params: GameParams,
    slot: Arc<FrameSlot>,
    vision: Arc<dyn Vision>,
    recorder: Recorder,
    dev: Option<DevRecorder>,
    hub: Arc<StatusHub>,
    /// Committed snapshot for out-of-queue readers.
    shared: Arc<Mutex<Game>>,
    pool: rayon::ThreadPool,
}

impl Processor {
    pub fn new(
        config: &Config,
        slot: Arc<FrameSlot>,
        vision: Arc<dyn Vision>,
        hub: Arc<StatusHub>,
    ) -> TwResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ANALYZE_WORKERS - 1)
            .thread_name(|lane| format!("analyze-{lane}"))
            .build()
            .map_err(|err| TileWatchError::Config(err.to_string()))?;
        let dev = config
            .output
            .development_recording
            .then(|| DevRecorder::new(config.output.web_file("game.csv")));
        let game = Game::new(config.game.language);
        Ok(Self {
            shared: Arc::new(Mutex::new(game.clone())),
            game,
            params: config.game.clone(),
            slot,
            vision,
            recorder: Recorder::new(config),
            dev,
            hub,
            pool,
        })
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Handle to the committed snapshot, refreshed on every mutation.
    pub fn shared_game(&self) -> Arc<Mutex<Game>> {
        Arc::clone(&self.shared)
    }

    pub fn set_nicknames(&mut self, name0: impl Into<String>, name1: impl Into<String>) {
        self.game.set_nicknames(name0, name1);
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        shared.nicknames = self.game.nicknames.clone();
    }

    /// Executes one queued command. Errors leave the game exactly as
    /// it was, except where noted on the move pipeline.
    pub fn handle(&mut self, command: Command) -> TwResult<()> {
        match command {
            Command::Move {
                player,
                played_time,
            } => self.process_move(player, played_time),
            Command::ValidChallenge {
                challenger,
                played_time,
            } => self.valid_challenge(challenger, played_time),
            Command::InvalidChallenge {
                challenger,
                played_time,
            } => self.invalid_challenge(challenger, played_time),
            Command::StartOfGame => self.start_of_game(),
            Command::EndOfGame => self.end_of_game(),
            Command::ChangeMove { number, placement } => {
                let start = admin::change_move(&mut self.game, &self.params, number, placement)?;
                self.finish_edit(start)
            }
            Command::ToExchange { number } => {
                let start = admin::to_exchange(&mut self.game, &self.params, number)?;
                self.finish_edit(start)
            }
            Command::InsertMoves { number } => {
                let start = admin::insert_moves(&mut self.game, &self.params, number)?;
                self.finish_edit(start)
            }
            Command::DeleteChallenge { number } => {
                let start = admin::delete_challenge(&mut self.game, &self.params, number)?;
                self.finish_edit(start)
            }
            Command::InsertChallenge { number, kind } => {
                let start =
                    admin::insert_challenge(&mut self.game, &self.params, number, kind)?;
                self.finish_edit(start)
            }
            Command::ToggleChallenge { number } => {
                let start = admin::toggle_challenge(&mut self.game, &self.params, number)?;
                self.finish_edit(start)
            }
            Command::SetBlank { coord, letter } => {
                let start = admin::set_blank(&mut self.game, coord, letter)?;
                self.finish_edit(start)
            }
            Command::RemoveBlank { coord } => {
                let start = admin::remove_blank(&mut self.game, coord)?;
                self.finish_edit(start)
            }
            Command::Shutdown => Ok(()),
        }
    }

    /// Grabs the latest frame, analyzes it and commits the move.
    fn process_move(&mut self, player: usize, played_time: [u32; 2]) -> TwResult<()> {
        let Some(frame) = self.slot.latest() else {
            return Err(TileWatchError::Camera(String::from("no frame available")));
        };

        self.fix_stale_blanks(&frame.candidates);

        let previous_board = self.game.current_board();
        let analyzed = self.analyze_frame(&frame, &previous_board);

        let mut result = diff(analyzed, &previous_board);
        discard_stray_blanks(&mut result.board, &mut result.new_tiles);
        if !result.changed_tiles.is_empty() {
            info!("changed tiles: {:?}", result.changed_tiles);
            admin::apply_changed_tiles(&mut self.game, &self.params, &result.changed_tiles);
        }

        let previous = self.game.moves.last();
        let mov = match classify(&result.board, &result.new_tiles) {
            Classification::Word(placement) => Move::regular(
                self.params.language,
                player,
                placement,
                result.board,
                result.new_tiles,
                result.removed_tiles,
                played_time,
                frame.image.clone(),
                previous,
            ),
            Classification::NoMove => Move::exchange(
                player,
                result.board,
                result.removed_tiles,
                played_time,
                frame.image.clone(),
                previous,
            ),
            Classification::Invalid => Move::unknown(
                player,
                result.board,
                result.new_tiles,
                result.removed_tiles,
                played_time,
                frame.image.clone(),
                previous,
            ),
        };
        let nicknames = self.game.nicknames.clone();
        let committed = self.game.add_move(mov);
        info!("move #{}: {}", committed.number, committed.gcg_line(&nicknames));
        self.commit_latest()
    }

    /// Re-recognizes the candidate squares on top of the previous
    /// board. Partitions are disjoint, so the merge is conflict free.
    fn analyze_frame(&self, frame: &Frame, previous_board: &Board) -> Board {
        let mut ignore = BTreeSet::new();
        let len = self.game.moves.len();
        if len > self.params.verify_moves {
            // A window of recent moves stays open for re-recognition,
            // older squares are pinned. A challenge in the window
            // shifts its base by one.
            let window_move = &self.game.moves[len - self.params.verify_moves + 1];
            let base = if matches!(window_move.kind, MoveKind::Exchange | MoveKind::Withdraw) {
                &window_move.board
            } else {
                &self.game.moves[len - self.params.verify_moves].board
            };
            let last = &self.game.moves[len - 1].board;
            ignore = base.coords().filter(|&c| last.contains(c)).collect();
        }

        let mut candidates = frame.candidates.clone();
        candidates.extend(ignore.iter().copied());
        let filtered = reachable_candidates(Coord::new(CENTER.0, CENTER.1), &candidates, &ignore);
        debug!("analyzing {} candidate squares", filtered.len());

        let chunks = round_robin_chunks(&filtered, ANALYZE_WORKERS);
        let vision = &self.vision;
        let mut lane0 = Vec::new();
        let mut lane1 = Vec::new();
        let mut lane2 = Vec::new();
        self.pool.scope(|scope| {
            scope.spawn(|_| lane0 = analyze_chunk(vision.as_ref(), frame, previous_board, &chunks[0]));
            scope.spawn(|_| lane1 = analyze_chunk(vision.as_ref(), frame, previous_board, &chunks[1]));
            lane2 = analyze_chunk(vision.as_ref(), frame, previous_board, &chunks[2]);
        });

        let mut analyzed = previous_board.clone();
        for (coord, tile) in lane0.into_iter().chain(lane1).chain(lane2) {
            analyzed.insert(coord, tile);
        }
        analyzed
    }

    /// Blanks of the latest move that vanished from the candidates
    /// were recognition noise. Drop them and re-derive the move.
    fn fix_stale_blanks(&mut self, candidates: &BTreeSet<Coord>) {
        if self.game.moves.len() <= 1 {
            return;
        }
        let len = self.game.moves.len();
        let previous_score = self.game.moves[len - 2].score;
        let Some(last) = self.game.moves.last_mut() else {
            return;
        };
        let stale: Vec<Coord> = last
            .new_tiles
            .iter()
            .filter(|(coord, _)| {
                last.board.get(**coord).is_some_and(|t| t.letter == BLANK)
                    && !candidates.contains(*coord)
            })
            .map(|(&coord, _)| coord)
            .collect();
        if stale.is_empty() {
            return;
        }

        for coord in &stale {
            warn!("dropping blank at {} no longer recognized", coord.status_key());
            last.new_tiles.remove(coord);
            last.board.remove(*coord);
        }
        match classify(&last.board, &last.new_tiles) {
            Classification::Word(placement) => {
                let (points, is_scrabble) =
                    score_word(self.params.language, &last.board, &last.new_tiles, &placement);
                last.kind = MoveKind::Regular;
                last.points = points;
                last.is_scrabble = is_scrabble;
                last.score = previous_score;
                last.score[last.player] += points;
                last.placement = Some(placement);
                warn!("corrected move #{}", last.number);
            }
            _ => warn!("could not correct move #{}", last.number),
        }
    }

    fn valid_challenge(&mut self, challenger: usize, played_time: [u32; 2]) -> TwResult<()> {
        let mov = self.game.add_valid_challenge(played_time)?;
        info!(
            "valid challenge by player {challenger}: withdraw move #{}",
            mov.number
        );
        self.commit_latest()
    }

    fn invalid_challenge(&mut self, challenger: usize, played_time: [u32; 2]) -> TwResult<()> {
        let malus = self.params.malus_doubt;
        let mov = self
            .game
            .add_invalid_challenge(challenger, malus, played_time)?;
        info!("invalid challenge by player {challenger}: move #{}", mov.number);
        self.commit_latest()
    }

    fn start_of_game(&mut self) -> TwResult<()> {
        info!("start of game");
        self.game.reset();
        self.recorder.start_of_game(&self.game)?;
        self.publish();
        Ok(())
    }

    /// Final accounting: overdrawn time, then the rack transfer when
    /// exactly one rack ended empty.
    fn end_of_game(&mut self) -> TwResult<()> {
        if self.game.moves.is_empty() {
            return Ok(());
        }
        let first_new = self.game.moves.len();
        let max_time = self.params.max_time_secs();
        for player in 0..2 {
            let played = self.game.moves[self.game.moves.len() - 1].played_time[player];
            let remaining = max_time - i64::from(played);
            self.game
                .add_time_malus(player, remaining, self.params.timeout_malus);
        }
        if let Some((player, letters, points)) = self.game.rack_adjustment() {
            info!("rack transfer: {points} points to player {player} ({letters})");
            self.game.add_last_rack(player, letters, points);
        }
        info!("end of game:\n{}", self.game);
        self.store_from(first_new)?;
        if let Some(dev) = &self.dev {
            for index in first_new..self.game.moves.len() {
                dev.record(&self.game, index)?;
            }
        }
        self.publish();
        Ok(())
    }

    /// Persists the latest move and wakes dashboard consumers.
    fn commit_latest(&mut self) -> TwResult<()> {
        let index = self.game.moves.len() - 1;
        self.recorder.store(&self.game, index)?;
        if let Some(dev) = &self.dev {
            dev.record(&self.game, index)?;
        }
        self.publish();
        Ok(())
    }

    /// After a successful admin edit: persist every replayed move.
    fn finish_edit(&mut self, start: usize) -> TwResult<()> {
        self.store_from(start)?;
        self.publish();
        Ok(())
    }

    fn store_from(&self, start: usize) -> TwResult<()> {
        for index in start..self.game.moves.len() {
            self.recorder.store(&self.game, index)?;
        }
        Ok(())
    }

    /// Refreshes the committed snapshot and wakes dashboard waiters.
    fn publish(&self) {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        *shared = self.game.clone();
        drop(shared);
        self.hub.publish(GameView::of(&self.game));
    }
}

/// One analysis partition. Confident readings are pinned, the rest go
/// through the recognizer with the current reading as suggestion.
fn analyze_chunk(
    vision: &dyn Vision,
    frame: &Frame,
    board: &Board,
    chunk: &[Coord],
) -> Vec<(Coord, Tile)> {
    chunk
        .iter()
        .map(|&coord| {
            let suggestion = board
                .get(coord)
                .unwrap_or_else(|| Tile::new(BLANK, FALLBACK_CONFIDENCE));
            let tile = if suggestion.confidence > KEEP_CONFIDENCE {
                suggestion
            } else {
                vision.recognize(frame, coord, suggestion)
            };
            (coord, tile)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Recognizer backed by a fixed letter map.
    struct MapVision {
        letters: BTreeMap<Coord, char>,
    }

    impl Vision for MapVision {
        fn recognize(&self, _frame: &Frame, coord: Coord, suggestion: Tile) -> Tile {
            match self.letters.get(&coord) {
                Some(&letter) => Tile::new(letter, 92),
                None => suggestion,
            }
        }
    }

    fn firns_frame() -> (Frame, MapVision) {
        let letters: BTreeMap<Coord, char> = "FIRNS"
            .chars()
            .enumerate()
            .map(|(i, letter)| (Coord::new(3 + i as u8, 7), letter))
            .collect();
        let frame = Frame {
            seq: 1,
            candidates: letters.keys().copied().collect(),
            image: None,
        };
        (frame, MapVision { letters })
    }

    #[test]
    fn a_captured_word_is_scored_and_logged() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.output.web_dir = dir.path().to_path_buf();

        let slot = Arc::new(FrameSlot::new());
        let (frame, vision) = firns_frame();
        slot.publish(frame);

        let mut processor = Processor::new(
            &config,
            Arc::clone(&slot),
            Arc::new(vision),
            Arc::new(StatusHub::new()),
        )
        .unwrap();
        processor
            .handle(Command::Move {
                player: 0,
                played_time: [10, 0],
            })
            .unwrap();

        let game = processor.game();
        assert_eq!(game.moves.len(), 1);
        let mov = &game.moves[0];
        assert_eq!(mov.points, 24);
        assert_eq!(mov.gcg_line(&game.nicknames), "> Name1: H4 FIRNS 24 24");
    }
}
