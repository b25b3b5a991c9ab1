//! The chess clock. Button handlers flip it synchronously, a ticker
//! thread advances it once per second.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::vision::Panel;

/// Snapshot of the clock. `time` is total seconds used per player,
/// `current` the seconds within the running move.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockState {
    pub player: usize,
    pub paused: bool,
    pub time: [u32; 2],
    pub current: [u32; 2],
}

/// Shared clock around a [`ClockState`]. The ticker is the only
/// writer of elapsed time, handlers only switch player and pause.
pub struct Watch {
    state: Mutex<ClockState>,
    panel: Arc<dyn Panel>,
}

impl Watch {
    pub fn new(panel: Arc<dyn Panel>) -> Self {
        let state = ClockState {
            paused: true,
            ..ClockState::default()
        };
        Self {
            state: Mutex::new(state),
            panel,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts the clock for `player` and zeroes the per-move counters.
    pub fn start(&self, player: usize) {
        let mut state = self.lock();
        state.player = player;
        state.current = [0, 0];
        state.paused = false;
        self.render(&state);
    }

    pub fn pause(&self) {
        let mut state = self.lock();
        state.paused = true;
        self.render(&state);
    }

    pub fn resume(&self) {
        let mut state = self.lock();
        state.paused = false;
        self.render(&state);
    }

    pub fn reset(&self) {
        let mut state = self.lock();
        *state = ClockState {
            paused: true,
            ..ClockState::default()
        };
        self.render(&state);
    }

    /// One elapsed second. Counts only while running.
    pub fn tick(&self) {
        let mut state = self.lock();
        if !state.paused {
            let player = state.player;
            state.time[player] += 1;
            state.current[player] += 1;
        }
        self.render(&state);
    }

    pub fn status(&self) -> ClockState {
        *self.lock()
    }

    fn render(&self, state: &ClockState) {
        self.panel
            .show_time(state.player, state.time, state.current);
    }
}

/// Drives [`Watch::tick`] once per second until stopped. The loop
/// checks its stop signal every iteration and is never killed.
pub struct Ticker {
    stop: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(watch: Arc<Watch>) -> Self {
        let (stop, stopped) = mpsc::channel();
        let handle = thread::Builder::new()
            .name(String::from("ticker"))
            .spawn(move || loop {
                match stopped.recv_timeout(Duration::from_secs(1)) {
                    Err(RecvTimeoutError::Timeout) => watch.tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .ok();
        Self { stop, handle }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
