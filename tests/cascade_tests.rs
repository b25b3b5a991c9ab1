//! Admin corrections through a live session: edits travel the command
//! queue behind in-flight moves and the replayed history is published.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tilewatch::api::Session;
use tilewatch::board::{Coord, Orientation};
use tilewatch::config::{Config, GameParams, OutputParams};
use tilewatch::game::{MoveKind, Placement};
use tilewatch::sim::{board_from_keys, ScriptedCamera, ScriptedTable, ScriptedVision};
use tilewatch::state::ButtonEvent;
use tilewatch::vision::NullPanel;
use tilewatch::worker::Command;

const TIMEOUT: Duration = Duration::from_secs(10);

fn start_session(dir: &TempDir) -> (Session, Arc<ScriptedTable>) {
    let config = Config {
        game: GameParams::default(),
        output: OutputParams {
            web_dir: dir.path().to_path_buf(),
            development_recording: false,
        },
    };
    let table = Arc::new(ScriptedTable::default());
    let camera = Arc::new(ScriptedCamera::new(Arc::clone(&table)));
    let vision = Arc::new(ScriptedVision::new(Arc::clone(&table)));
    let session = Session::start(
        config,
        [String::from("Anna"), String::from("Ben")],
        camera,
        vision,
        Arc::new(NullPanel),
    )
    .unwrap();
    (session, table)
}

fn play(
    session: &mut Session,
    table: &ScriptedTable,
    cells: &[(&str, &str)],
    button: ButtonEvent,
) {
    let map: BTreeMap<String, String> = cells
        .iter()
        .map(|(key, letter)| (key.to_string(), letter.to_string()))
        .collect();
    let generation = table.set(board_from_keys(&map).unwrap());
    session.wait_for_frame(generation, TIMEOUT).unwrap();
    session.press(button);
    assert!(session.sync(TIMEOUT));
}

fn submit(session: &Session, command: Command) {
    session.queue().submit(command).unwrap();
    assert!(session.sync(TIMEOUT));
}

const FIRNS: &[(&str, &str)] = &[
    ("h4", "F"),
    ("h5", "I"),
    ("h6", "R"),
    ("h7", "N"),
    ("h8", "S"),
];

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
fn shortening_a_word_cascades_through_the_queue() {
    let dir = TempDir::new().unwrap();
    let (mut session, table) = start_session(&dir);
    session.press(ButtonEvent::Red);
    play(&mut session, &table, FIRNS, ButtonEvent::Green);
    play(&mut session, &table, WITH_VTEN, ButtonEvent::Red);
    assert_eq!(session.game().current_score(), [24, 20]);

    submit(
        &session,
        Command::ChangeMove {
            number: 1,
            placement: Placement::new(Coord::new(3, 7), Orientation::Horizontal, "FIR"),
        },
    );

    let game = session.game();
    assert_eq!(game.moves[0].points, 10);
    assert!(game.moves[0].modified);
    assert_eq!(game.moves[1].points, 20);
    assert_eq!(game.current_score(), [10, 20]);
    // The published view follows the edit.
    assert_eq!(session.status().score, [10, 20]);
    assert_eq!(session.status().move_count, 2);

    session.shutdown();
}

#[test]
fn blank_assignment_round_trip_through_the_queue() {
    let dir = TempDir::new().unwrap();
    let (mut session, table) = start_session(&dir);
    session.press(ButtonEvent::Red);
    play(
        &mut session,
        &table,
        &[
            ("h4", "F"),
            ("h5", "I"),
            ("h6", "R"),
            ("h7", "N"),
            ("h8", "_"),
        ],
        ButtonEvent::Green,
    );
    assert_eq!(session.game().moves[0].points, 22);

    let coord = Coord::new(7, 7);
    submit(&session, Command::SetBlank { coord, letter: 's' });
    let game = session.game();
    assert_eq!(game.moves[0].board.get(coord).map(|t| t.letter), Some('s'));
    assert_eq!(
        game.moves[0].placement.as_ref().map(|p| p.word.as_str()),
        Some("FIRNs")
    );
    assert_eq!(game.moves[0].points, 22);

    submit(&session, Command::RemoveBlank { coord });
    let game = session.game();
    assert_eq!(game.moves[0].board.get(coord).map(|t| t.letter), Some('_'));

    session.shutdown();
}

#[test]
fn missed_turns_are_spliced_in_as_exchanges() {
    let dir = TempDir::new().unwrap();
    let (mut session, table) = start_session(&dir);
    session.press(ButtonEvent::Red);
    play(&mut session, &table, FIRNS, ButtonEvent::Green);

    submit(&session, Command::InsertMoves { number: 1 });

    let game = session.game();
    assert_eq!(game.moves.len(), 3);
    assert_eq!(game.moves[0].kind, MoveKind::Exchange);
    assert_eq!(game.moves[0].player, 0);
    assert_eq!(game.moves[1].kind, MoveKind::Exchange);
    assert_eq!(game.moves[1].player, 1);
    assert_eq!(game.moves[2].kind, MoveKind::Regular);
    assert_eq!(game.moves[2].number, 3);
    assert_eq!(game.current_score(), [24, 0]);

    session.shutdown();
}

#[test]
fn a_rejected_edit_leaves_the_game_and_the_worker_intact() {
    let dir = TempDir::new().unwrap();
    let (mut session, table) = start_session(&dir);
    session.press(ButtonEvent::Red);
    play(&mut session, &table, FIRNS, ButtonEvent::Green);

    submit(
        &session,
        Command::ChangeMove {
            number: 9,
            placement: Placement::new(Coord::new(0, 0), Orientation::Horizontal, "AB"),
        },
    );
    let game = session.game();
    assert_eq!(game.moves.len(), 1);
    assert_eq!(game.moves[0].points, 24);
    assert!(!game.moves[0].modified);

    // The queue keeps draining after the failure.
    submit(&session, Command::ToExchange { number: 1 });
    assert_eq!(session.game().moves[0].kind, MoveKind::Exchange);
    assert_eq!(session.game().current_score(), [0, 0]);

    session.shutdown();
}
