//! Persisted outputs: the status record mirrored to the dashboard
//! after every mutation, one data file per move, and the optional
//! development csv protocol.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::{Config, GameParams, OutputParams};
use crate::error::TwResult;
use crate::game::{opponent, Game, Move, MoveKind};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Snapshot of the game as the dashboard consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub time: String,
    #[serde(rename = "move")]
    pub move_number: usize,
    pub score1: i32,
    pub score2: i32,
    pub time1: i64,
    pub time2: i64,
    pub name1: String,
    pub name2: String,
    pub onmove: String,
    pub moves: Vec<String>,
    pub board: BTreeMap<String, String>,
    pub bag: Vec<char>,
}

impl StatusRecord {
    /// The game as it stood after move index `upto`.
    pub fn at(game: &Game, params: &GameParams, upto: usize) -> Self {
        let Some(mov) = game.moves.get(upto) else {
            return Self::empty(game, params);
        };
        let board = mov
            .board
            .iter()
            .map(|(coord, tile)| (coord.status_key(), tile.letter.to_string()))
            .collect();
        Self {
            time: mov.committed_at.format(TIME_FORMAT).to_string(),
            move_number: mov.number,
            score1: mov.score[0],
            score2: mov.score[1],
            time1: params.remaining(mov.played_time[0]),
            time2: params.remaining(mov.played_time[1]),
            name1: game.nicknames[0].clone(),
            name2: game.nicknames[1].clone(),
            onmove: game.nicknames[mov.player].clone(),
            moves: game.gcg_lines(upto),
            board,
            bag: game.bag_after(mov),
        }
    }

    fn empty(game: &Game, params: &GameParams) -> Self {
        Self {
            time: game.started_at.format(TIME_FORMAT).to_string(),
            move_number: 0,
            score1: 0,
            score2: 0,
            time1: params.max_time_secs(),
            time2: params.max_time_secs(),
            name1: game.nicknames[0].clone(),
            name2: game.nicknames[1].clone(),
            onmove: game.nicknames[0].clone(),
            moves: Vec::new(),
            board: BTreeMap::new(),
            bag: game.language.full_bag(),
        }
    }
}

/// Writes status and per-move records into the web directory.
pub struct Recorder {
    game_params: GameParams,
    output: OutputParams,
}

impl Recorder {
    pub fn new(config: &Config) -> Self {
        Self {
            game_params: config.game.clone(),
            output: config.output.clone(),
        }
    }

    /// Clears artifacts of the previous game and publishes an empty
    /// status record.
    pub fn start_of_game(&self, game: &Game) -> TwResult<()> {
        fs::create_dir_all(&self.output.web_dir)?;
        for entry in fs::read_dir(&self.output.web_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let stale = (name.starts_with("data-") && name.ends_with(".json"))
                || (name.starts_with("image-") && name.ends_with(".jpg"));
            if stale {
                if let Err(err) = fs::remove_file(entry.path()) {
                    error!("could not remove {name}: {err}");
                }
            }
        }
        self.write_status(game, 0)
    }

    /// Writes data-{n}.json for the move at `index` and refreshes
    /// status.json when that move is the latest. The capture the move
    /// was inferred from is copied alongside.
    pub fn store(&self, game: &Game, index: usize) -> TwResult<()> {
        fs::create_dir_all(&self.output.web_dir)?;
        let Some(mov) = game.moves.get(index) else {
            return self.write_status(game, index);
        };

        if let Some(img) = &mov.img {
            if img.exists() {
                let target = self.output.web_file(&format!("image-{}.jpg", mov.number));
                if let Err(err) = fs::copy(img, &target) {
                    error!("could not copy capture for move {}: {err}", mov.number);
                }
            }
        }

        let record = StatusRecord::at(game, &self.game_params, index);
        let text = serde_json::to_string(&record)?;
        fs::write(
            self.output.web_file(&format!("data-{}.json", mov.number)),
            &text,
        )?;
        if index + 1 == game.moves.len() {
            debug!("write status.json for move {}", mov.number);
            fs::write(self.output.web_file("status.json"), &text)?;
        }
        Ok(())
    }

    fn write_status(&self, game: &Game, index: usize) -> TwResult<()> {
        let record = StatusRecord::at(game, &self.game_params, index);
        let text = serde_json::to_string(&record)?;
        fs::write(self.output.web_file("status.json"), text)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct DevRow {
    #[serde(rename = "move")]
    number: usize,
    button: String,
    status: String,
    coord: String,
    word: String,
    points: Option<i32>,
    score1: i32,
    score2: i32,
}

/// Appends raw button/move rows to a csv protocol, used to replay
/// recorded games during development.
pub struct DevRecorder {
    path: PathBuf,
}

impl DevRecorder {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Appends the protocol rows of the move at `index`.
    pub fn record(&self, game: &Game, index: usize) -> TwResult<()> {
        let Some(mov) = game.moves.get(index) else {
            return Ok(());
        };
        let rows = rows_for(game, mov);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn coord_label(mov: &Move) -> String {
    mov.placement
        .as_ref()
        .map(|placement| placement.anchor.gcg_label(placement.orientation))
        .unwrap_or_default()
}

fn raw_word(mov: &Move) -> String {
    mov.placement
        .as_ref()
        .map(|placement| placement.word.clone())
        .unwrap_or_default()
}

fn rows_for(game: &Game, mov: &Move) -> Vec<DevRow> {
    let turn_button = |player: usize| ["GREEN", "RED"][player].to_string();
    let running = |player: usize| ["S0", "S1"][player].to_string();
    let pausing = |player: usize| ["P0", "P1"][player].to_string();
    let doubting = |player: usize| ["DOUBT0", "DOUBT1"][player].to_string();

    match mov.kind {
        MoveKind::Regular => vec![DevRow {
            number: mov.number,
            button: turn_button(mov.player),
            status: running(mov.player),
            coord: coord_label(mov),
            word: raw_word(mov),
            points: Some(mov.points),
            score1: mov.score[0],
            score2: mov.score[1],
        }],
        MoveKind::Exchange => vec![DevRow {
            number: mov.number,
            button: turn_button(mov.player),
            status: running(mov.player),
            coord: String::from("-"),
            word: String::new(),
            points: Some(mov.points),
            score1: mov.score[0],
            score2: mov.score[1],
        }],
        MoveKind::Withdraw | MoveKind::ChallengeBonus => {
            // The challenge settles in three steps: pause, doubt
            // button, resume. A withdraw carries the mover of the
            // withdrawn move, a challenge bonus the challenger.
            let challenger = match mov.kind {
                MoveKind::Withdraw => opponent(mov.player),
                _ => mov.player,
            };
            let withdrawn_word = match mov.kind {
                MoveKind::Withdraw => raw_word(mov),
                _ => String::new(),
            };
            let mut rows = Vec::new();
            if let Some(before) = mov.number.checked_sub(2).and_then(|i| game.moves.get(i)) {
                rows.push(DevRow {
                    number: before.number,
                    button: String::from("YELLOW"),
                    status: pausing(challenger),
                    coord: coord_label(before),
                    word: raw_word(before),
                    points: Some(before.points),
                    score1: before.score[0],
                    score2: before.score[1],
                });
            }
            rows.push(DevRow {
                number: mov.number,
                button: doubting(challenger),
                status: pausing(challenger),
                coord: String::from("--"),
                word: withdrawn_word.clone(),
                points: Some(mov.points),
                score1: mov.score[0],
                score2: mov.score[1],
            });
            rows.push(DevRow {
                number: mov.number,
                button: String::from("YELLOW"),
                status: running(challenger),
                coord: String::from("--"),
                word: withdrawn_word,
                points: Some(mov.points),
                score1: mov.score[0],
                score2: mov.score[1],
            });
            rows
        }
        MoveKind::LastRackBonus | MoveKind::LastRackMalus => vec![DevRow {
            number: mov.number,
            button: String::from("EOG"),
            status: String::from("(rack)"),
            coord: String::new(),
            word: mov.rack.clone().unwrap_or_default(),
            points: Some(mov.points),
            score1: mov.score[0],
            score2: mov.score[1],
        }],
        MoveKind::TimeMalus => vec![DevRow {
            number: mov.number,
            button: String::new(),
            status: String::from("(time)"),
            coord: String::new(),
            word: String::new(),
            points: Some(mov.points),
            score1: mov.score[0],
            score2: mov.score[1],
        }],
        MoveKind::Unknown => vec![DevRow {
            number: mov.number,
            button: String::new(),
            status: String::from("(unknown)"),
            coord: String::new(),
            word: String::new(),
            points: None,
            score1: mov.score[0],
            score2: mov.score[1],
        }],
    }
}
