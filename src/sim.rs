//! Scripted games. A JSON script of board readings and button presses
//! drives the full engine through a camera and recognizer that read
//! from a shared scripted table, so every thread, queue and handler of
//! a live session is exercised.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::api::Session;
use crate::board::{Board, Coord, Tile};
use crate::config::Config;
use crate::error::{TileWatchError, TwResult};
use crate::game::Game;
use crate::state::{ButtonEvent, GameState};
use crate::vision::{Camera, Frame, NullPanel, Vision};

/// How long a scripted run waits for a frame or for the queue.
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// A recorded or hand-written game.
#[derive(Debug, Clone, Deserialize)]
pub struct GameScript {
    #[serde(default = "default_name1")]
    pub name1: String,
    #[serde(default = "default_name2")]
    pub name2: String,
    pub steps: Vec<Step>,
}

fn default_name1() -> String {
    String::from("Name1")
}

fn default_name2() -> String {
    String::from("Name2")
}

/// One script step: optionally lay out the full board (keys like
/// "h4", lowercase letters are assigned blanks, '_' an unassigned
/// one), then press a button.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub board: Option<BTreeMap<String, String>>,
    pub button: String,
}

impl GameScript {
    pub fn load(path: &Path) -> TwResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Parses a script board map into a snapshot.
pub fn board_from_keys(map: &BTreeMap<String, String>) -> TwResult<Board> {
    let mut board = Board::new();
    for (key, value) in map {
        let (_, coord) = Coord::parse_gcg(key).ok_or_else(|| {
            TileWatchError::Config(format!("bad board coordinate {key:?} in script"))
        })?;
        let mut chars = value.chars();
        let letter = chars.next().ok_or_else(|| {
            TileWatchError::Config(format!("empty letter for {key:?} in script"))
        })?;
        if chars.next().is_some() {
            return Err(TileWatchError::Config(format!(
                "letter for {key:?} must be a single character, got {value:?}"
            )));
        }
        board.insert(coord, Tile::new(letter, 90));
    }
    Ok(board)
}

/// The physical table of a scripted game: the board the camera sees.
/// `set` bumps a generation that frames carry as their sequence
/// number, so the runner can wait until a reading went through.
#[derive(Default)]
pub struct ScriptedTable {
    inner: Mutex<(u64, Board)>,
}

impl ScriptedTable {
    pub fn set(&self, board: Board) -> u64 {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.0 += 1;
        inner.1 = board;
        inner.0
    }

    fn snapshot(&self) -> (u64, Board) {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.clone()
    }
}

/// Camera reading candidate squares off the scripted table.
pub struct ScriptedCamera {
    table: Arc<ScriptedTable>,
}

impl ScriptedCamera {
    pub fn new(table: Arc<ScriptedTable>) -> Self {
        Self { table }
    }
}

impl Camera for ScriptedCamera {
    fn frame(&self) -> Frame {
        // Pace the capture loop like a real camera would.
        thread::sleep(Duration::from_millis(5));
        let (generation, board) = self.table.snapshot();
        Frame {
            seq: generation,
            candidates: board.coords().collect(),
            image: None,
        }
    }
}

/// Recognizer answering from the scripted table, with the confidence
/// jitter of a real template match.
pub struct ScriptedVision {
    table: Arc<ScriptedTable>,
}

impl ScriptedVision {
    pub fn new(table: Arc<ScriptedTable>) -> Self {
        Self { table }
    }
}

impl Vision for ScriptedVision {
    fn recognize(&self, _frame: &Frame, coord: Coord, suggestion: Tile) -> Tile {
        let (_, board) = self.table.snapshot();
        match board.get(coord) {
            Some(tile) => Tile::new(tile.letter, 80 + fastrand::u8(..15)),
            None => suggestion,
        }
    }
}

/// What a scripted run leaves behind.
pub struct ScriptOutcome {
    pub game: Game,
    pub final_state: GameState,
}

/// Replays a script against a freshly started session. Each board
/// reading is guaranteed to have reached the frame slot before its
/// button press, and the queue is drained after every press, so the
/// outcome is deterministic.
pub fn run_script(script: &GameScript, config: Config) -> TwResult<ScriptOutcome> {
    let table = Arc::new(ScriptedTable::default());
    let camera = Arc::new(ScriptedCamera::new(Arc::clone(&table)));
    let vision = Arc::new(ScriptedVision::new(Arc::clone(&table)));
    let mut session = Session::start(
        config,
        [script.name1.clone(), script.name2.clone()],
        camera,
        vision,
        Arc::new(NullPanel),
    )?;

    for (index, step) in script.steps.iter().enumerate() {
        if let Some(map) = &step.board {
            let board = board_from_keys(map)?;
            let generation = table.set(board);
            session.wait_for_frame(generation, STEP_TIMEOUT)?;
        }
        let button: ButtonEvent = step.button.parse().map_err(|_| {
            TileWatchError::Config(format!(
                "unknown button {:?} at script step {}",
                step.button,
                index + 1
            ))
        })?;
        let state = session.press(button);
        debug!("script step {}: {} -> {}", index + 1, step.button, state);
        if !session.sync(STEP_TIMEOUT) {
            return Err(TileWatchError::Config(format!(
                "queue did not drain after script step {}",
                index + 1
            )));
        }
    }

    let outcome = ScriptOutcome {
        game: session.game(),
        final_state: session.state(),
    };
    session.shutdown();
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_boards_parse_status_keys() {
        let mut map = BTreeMap::new();
        map.insert(String::from("h4"), String::from("F"));
        map.insert(String::from("h8"), String::from("_"));
        let board = board_from_keys(&map).unwrap();
        assert_eq!(board.get(Coord::new(3, 7)).map(|t| t.letter), Some('F'));
        assert_eq!(board.get(Coord::new(7, 7)).map(|t| t.letter), Some('_'));

        map.insert(String::from("z9"), String::from("A"));
        assert!(board_from_keys(&map).is_err());
    }

    #[test]
    fn scripts_deserialize_with_defaults() {
        let script: GameScript = serde_json::from_str(
            r#"{"steps": [{"button": "RED"}, {"board": {"h4": "F"}, "button": "GREEN"}]}"#,
        )
        .unwrap();
        assert_eq!(script.name1, "Name1");
        assert_eq!(script.steps.len(), 2);
        assert!(script.steps[0].board.is_none());
        assert_eq!(script.steps[1].button, "GREEN");
    }

    #[test]
    fn table_generation_advances() {
        let table = ScriptedTable::default();
        assert_eq!(table.set(Board::new()), 1);
        assert_eq!(table.set(Board::new()), 2);
        let camera = ScriptedCamera::new(Arc::new(ScriptedTable::default()));
        assert_eq!(camera.frame().seq, 0);
    }
}
