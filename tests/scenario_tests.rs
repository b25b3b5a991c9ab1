//! Full-engine scenarios: scripted games drive every thread, queue and
//! handler of a live session.

use std::collections::BTreeMap;

use tempfile::TempDir;
use tilewatch::config::{Config, GameParams, OutputParams};
use tilewatch::game::MoveKind;
use tilewatch::sim::{run_script, GameScript, Step};
use tilewatch::state::GameState;

fn test_config(dir: &TempDir) -> Config {
    Config {
        game: GameParams::default(),
        output: OutputParams {
            web_dir: dir.path().to_path_buf(),
            development_recording: false,
        },
    }
}

fn board(cells: &[(&str, &str)]) -> Option<BTreeMap<String, String>> {
    Some(
        cells
            .iter()
            .map(|(key, letter)| (key.to_string(), letter.to_string()))
            .collect(),
    )
}

fn step(board: Option<BTreeMap<String, String>>, button: &str) -> Step {
    Step {
        board,
        button: button.to_string(),
    }
}

fn script(steps: Vec<Step>) -> GameScript {
    GameScript {
        name1: String::from("Anna"),
        name2: String::from("Ben"),
        steps,
    }
}

const FIRNS: &[(&str, &str)] = &[
    ("h4", "F"),
    ("h5", "I"),
    ("h6", "R"),
    ("h7", "N"),
    ("h8", "S"),
];

/// FIRNS plus the vertical V.TEN through its I.
const WITH_VTEN: &[(&str, &str)] = &[
    ("h4", "F"),
    ("h5", "I"),
    ("h6", "R"),
    ("h7", "N"),
    ("h8", "S"),
    ("g5", "V"),
    ("i5", "T"),
    ("j5", "E"),
    ("k5", "N"),
];

#[test]
fn opening_crossing_and_invalid_challenge() {
    let dir = TempDir::new().unwrap();
    let outcome = run_script(
        &script(vec![
            step(None, "RED"),
            step(board(FIRNS), "GREEN"),
            step(board(WITH_VTEN), "RED"),
            step(None, "YELLOW"),
            step(None, "DOUBT1"),
            step(None, "YELLOW"),
        ]),
        test_config(&dir),
    )
    .unwrap();

    let game = outcome.game;
    assert_eq!(game.moves.len(), 3);
    assert_eq!(game.moves[0].kind, MoveKind::Regular);
    assert_eq!(game.moves[0].points, 24);
    assert_eq!(game.moves[0].score, [24, 0]);
    assert_eq!(game.moves[1].points, 20);
    assert_eq!(game.moves[1].score, [24, 20]);
    assert_eq!(
        game.moves[1].placement.as_ref().map(|p| p.word.as_str()),
        Some("V.TEN")
    );

    // The challenge against V.TEN was invalid: a malus against the
    // challenger, board untouched.
    assert_eq!(game.moves[2].kind, MoveKind::ChallengeBonus);
    assert_eq!(game.moves[2].player, 0);
    assert_eq!(game.current_score(), [14, 20]);
    assert_eq!(game.current_board().len(), 9);

    assert_eq!(outcome.final_state, GameState::S0);
    assert_eq!(game.gcg_lines(0), vec!["> Anna: H4 FIRNS 24 24"]);
}

#[test]
fn valid_challenge_withdraws_the_last_word() {
    let dir = TempDir::new().unwrap();
    let outcome = run_script(
        &script(vec![
            step(None, "RED"),
            step(board(FIRNS), "GREEN"),
            step(board(WITH_VTEN), "RED"),
            step(None, "YELLOW"),
            step(None, "DOUBT0"),
            step(None, "YELLOW"),
        ]),
        test_config(&dir),
    )
    .unwrap();

    let game = outcome.game;
    assert_eq!(game.moves.len(), 3);
    let withdraw = &game.moves[2];
    assert_eq!(withdraw.kind, MoveKind::Withdraw);
    assert_eq!(withdraw.player, 1);
    assert_eq!(withdraw.points, -20);
    assert_eq!(withdraw.removed_tiles.len(), 4);
    assert_eq!(game.current_score(), [24, 0]);
    assert_eq!(game.current_board().len(), 5);
}

#[test]
fn an_unchanged_board_reads_as_an_exchange() {
    let dir = TempDir::new().unwrap();
    let outcome = run_script(
        &script(vec![
            step(None, "RED"),
            step(board(FIRNS), "GREEN"),
            // The opponent passes: the camera sees the same tiles.
            step(board(FIRNS), "RED"),
        ]),
        test_config(&dir),
    )
    .unwrap();

    let game = outcome.game;
    assert_eq!(game.moves.len(), 2);
    assert_eq!(game.moves[1].kind, MoveKind::Exchange);
    assert_eq!(game.moves[1].player, 1);
    assert_eq!(game.moves[1].points, 0);
    assert_eq!(game.current_score(), [24, 0]);
}

#[test]
fn tiles_on_both_axes_are_an_unknown_move() {
    let dir = TempDir::new().unwrap();
    let outcome = run_script(
        &script(vec![
            step(None, "RED"),
            step(
                board(&[("h8", "A"), ("h9", "B"), ("g8", "C")]),
                "GREEN",
            ),
        ]),
        test_config(&dir),
    )
    .unwrap();

    let game = outcome.game;
    assert_eq!(game.moves.len(), 1);
    assert_eq!(game.moves[0].kind, MoveKind::Unknown);
    assert_eq!(game.moves[0].points, 0);
    assert_eq!(game.current_score(), [0, 0]);
    // The board keeps the reading so the next diff stays consistent.
    assert_eq!(game.current_board().len(), 3);
}

#[test]
fn every_committed_move_lands_in_the_web_directory() {
    let dir = TempDir::new().unwrap();
    run_script(
        &script(vec![
            step(None, "RED"),
            step(board(FIRNS), "GREEN"),
            step(board(WITH_VTEN), "RED"),
        ]),
        test_config(&dir),
    )
    .unwrap();

    let status: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("status.json")).unwrap())
            .unwrap();
    assert_eq!(status["move"], 2);
    assert_eq!(status["score1"], 24);
    assert_eq!(status["score2"], 20);
    assert_eq!(status["name1"], "Anna");
    assert_eq!(status["board"]["h4"], "F");

    assert!(dir.path().join("data-1.json").exists());
    assert!(dir.path().join("data-2.json").exists());
}
