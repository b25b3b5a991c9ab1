//! The command queue. A single worker thread drains it strictly in
//! order and is the only writer of the game, so no locking guards the
//! move list itself.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::board::{Board, Coord};
use crate::error::{TileWatchError, TwResult};
use crate::game::{Game, MoveKind, Placement};

/// Everything that may mutate the game. Admin corrections travel the
/// same queue as moves, so they serialize behind in-flight analysis.
#[derive(Debug, Clone)]
pub enum Command {
    /// Grab the latest frame and commit a move for `player`.
    Move {
        player: usize,
        played_time: [u32; 2],
    },
    ValidChallenge {
        challenger: usize,
        played_time: [u32; 2],
    },
    InvalidChallenge {
        challenger: usize,
        played_time: [u32; 2],
    },
    StartOfGame,
    EndOfGame,
    /// Replace a move's placement and replay everything after it.
    ChangeMove {
        number: usize,
        placement: Placement,
    },
    ToExchange {
        number: usize,
    },
    /// Insert two exchange moves before `number`.
    InsertMoves {
        number: usize,
    },
    DeleteChallenge {
        number: usize,
    },
    /// `kind` must be WITHDRAW or CHALLENGE_BONUS.
    InsertChallenge {
        number: usize,
        kind: MoveKind,
    },
    ToggleChallenge {
        number: usize,
    },
    SetBlank {
        coord: Coord,
        letter: char,
    },
    RemoveBlank {
        coord: Coord,
    },
    Shutdown,
}

/// Handle for submitting commands to the worker.
#[derive(Clone)]
pub struct CommandQueue {
    sender: Sender<Command>,
    submitted: Arc<AtomicU64>,
}

impl CommandQueue {
    pub fn submit(&self, command: Command) -> TwResult<()> {
        self.sender
            .send(command)
            .map_err(|_| TileWatchError::EngineStopped)?;
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// The worker thread. Command failures and panics are logged and the
/// loop keeps draining, a wedged queue would freeze the whole table.
pub struct Worker {
    queue: CommandQueue,
    processed: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn<H>(mut handler: H) -> Self
    where
        H: FnMut(Command) -> TwResult<()> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Command>();
        let processed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&processed);
        let handle = thread::Builder::new()
            .name(String::from("worker"))
            .spawn(move || {
                while let Ok(command) = receiver.recv() {
                    if matches!(command, Command::Shutdown) {
                        counter.fetch_add(1, Ordering::SeqCst);
                        info!("worker shutting down");
                        break;
                    }
                    let label = format!("{command:?}");
                    match panic::catch_unwind(AssertUnwindSafe(|| handler(command))) {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => warn!("command {label} failed: {err}"),
                        Err(_) => error!("command {label} panicked"),
                    }
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .ok();
        Self {
            queue: CommandQueue {
                sender,
                submitted: Arc::new(AtomicU64::new(0)),
            },
            processed,
            handle,
        }
    }

    pub fn queue(&self) -> CommandQueue {
        self.queue.clone()
    }

    /// Blocks until every submitted command has been consumed. Admin
    /// callers use this to read a state that includes their edit.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.processed.load(Ordering::SeqCst) < self.queue.submitted.load(Ordering::SeqCst) {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        true
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.queue.submit(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// What readers see of the game between mutations.
#[derive(Debug, Clone, Default)]
pub struct GameView {
    pub move_count: usize,
    pub score: [i32; 2],
    pub played_time: [u32; 2],
    pub last_kind: Option<MoveKind>,
    pub board: Board,
    pub gcg: Vec<String>,
}

impl GameView {
    pub fn of(game: &Game) -> Self {
        let last = game.moves.last();
        Self {
            move_count: game.moves.len(),
            score: game.current_score(),
            played_time: last.map_or([0, 0], |mov| mov.played_time),
            last_kind: last.map(|mov| mov.kind),
            board: game.current_board(),
            gcg: match game.moves.len() {
                0 => Vec::new(),
                n => game.gcg_lines(n - 1),
            },
        }
    }
}

struct HubState {
    view: GameView,
    dirty: bool,
}

/// Mutation signal for dashboard consumers. Set after every commit,
/// consumed by the first waiter, re-armed by the next commit.
pub struct StatusHub {
    state: Mutex<HubState>,
    changed: Condvar,
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState {
                view: GameView::default(),
                dirty: false,
            }),
            changed: Condvar::new(),
        }
    }

    pub fn publish(&self, view: GameView) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.view = view;
        state.dirty = true;
        self.changed.notify_all();
    }

    /// The latest view without waiting.
    pub fn snapshot(&self) -> GameView {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .view
            .clone()
    }

    /// Blocks until the next mutation or the timeout. Consumes the
    /// signal on success.
    pub fn wait_update(&self, timeout: Duration) -> Option<GameView> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut state, _) = self
            .changed
            .wait_timeout_while(state, timeout, |s| !s.dirty)
            .unwrap_or_else(PoisonError::into_inner);
        if state.dirty {
            state.dirty = false;
            Some(state.view.clone())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn commands_run_in_submission_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let worker = Worker::spawn(move |command| {
            if let Command::Move { player, .. } = command {
                log.lock().unwrap().push(player);
            }
            Ok(())
        });
        let queue = worker.queue();
        for player in [0, 1, 0, 1] {
            queue
                .submit(Command::Move {
                    player,
                    played_time: [0, 0],
                })
                .unwrap();
        }
        worker.stop();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 0, 1]);
    }

    #[test]
    fn a_panicking_command_does_not_kill_the_worker() {
        let seen = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&seen);
        let worker = Worker::spawn(move |command| {
            if let Command::EndOfGame = command {
                panic!("boom");
            }
            *count.lock().unwrap() += 1;
            Ok(())
        });
        let queue = worker.queue();
        queue.submit(Command::StartOfGame).unwrap();
        queue.submit(Command::EndOfGame).unwrap();
        queue.submit(Command::StartOfGame).unwrap();
        worker.stop();
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[test]
    fn submitting_after_shutdown_errors() {
        let worker = Worker::spawn(|_| Ok(()));
        let queue = worker.queue();
        worker.stop();
        assert!(queue.submit(Command::StartOfGame).is_err());
    }

    #[test]
    fn hub_signal_is_consumed_and_rearmed() {
        let hub = StatusHub::new();
        assert!(hub.wait_update(Duration::ZERO).is_none());

        hub.publish(GameView {
            move_count: 1,
            ..GameView::default()
        });
        let first = hub.wait_update(Duration::ZERO);
        assert_eq!(first.map(|v| v.move_count), Some(1));
        assert!(hub.wait_update(Duration::ZERO).is_none());

        hub.publish(GameView {
            move_count: 2,
            ..GameView::default()
        });
        assert!(hub.wait_update(Duration::ZERO).is_some());
        assert_eq!(hub.snapshot().move_count, 2);
    }
}
