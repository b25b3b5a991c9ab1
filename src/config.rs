use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::board::Language;
use crate::error::TwResult;

#[derive(Args, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[command(flatten)]
    #[serde(default)]
    pub game: GameParams,
    #[command(flatten)]
    #[serde(default)]
    pub output: OutputParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameParams {
    #[arg(long, default_value_t = Language::German)]
    pub language: Language,

    // === CLOCK ===
    /// Playing time per player in seconds.
    #[arg(long, default_value_t = 1800)]
    pub max_time: u32,
    /// Display floor for overdrawn remaining time, in seconds.
    #[arg(long, default_value_t = -300)]
    pub min_time: i64,
    /// Seconds after a pause within which a valid challenge is allowed.
    #[arg(long, default_value_t = 20)]
    pub doubt_timeout: u32,

    // === PENALTIES ===
    #[arg(long, default_value_t = 10)]
    pub malus_doubt: i32,
    /// Points deducted per started minute of overdrawn time.
    #[arg(long, default_value_t = 10)]
    pub timeout_malus: i32,

    /// How many of the latest moves stay open for re-recognition.
    #[arg(long, default_value_t = 3)]
    pub verify_moves: usize,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputParams {
    /// Directory for per-move records and board images.
    #[arg(long, default_value = "web")]
    pub web_dir: PathBuf,
    /// Also write a csv protocol of raw button/move data.
    #[arg(long)]
    pub development_recording: bool,
}

impl Config {
    /// Reads a JSON config file. Missing fields fall back to their
    /// CLI defaults.
    pub fn load_from_file(path: &Path) -> TwResult<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl GameParams {
    pub fn max_time_secs(&self) -> i64 {
        i64::from(self.max_time)
    }

    /// Remaining display time, floored for players far in overtime.
    pub fn remaining(&self, played: u32) -> i64 {
        (self.max_time_secs() - i64::from(played)).max(self.min_time)
    }
}

impl OutputParams {
    pub fn web_file(&self, name: &str) -> PathBuf {
        self.web_dir.join(name)
    }
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            language: Language::German,
            max_time: 1800,
            min_time: -300,
            doubt_timeout: 20,
            malus_doubt: 10,
            timeout_malus: 10,
            verify_moves: 3,
        }
    }
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            web_dir: PathBuf::from("web"),
            development_recording: false,
        }
    }
}
