//! Engine for reconstructing a physical Scrabble game from an
//! overhead camera: board diffs become typed moves with scores,
//! buttons drive a turn state machine, and a single worker thread
//! owns all game mutation.

pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod inference;
pub mod processing;
pub mod records;
pub mod sim;
pub mod state;
pub mod vision;
pub mod watch;
pub mod worker;
