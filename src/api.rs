//! The session facade. Wires clock, capture loop, command worker and
//! state machine together and exposes the read surface: state name,
//! clock, score, committed game snapshots and the update signal.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::Config;
use crate::error::{TileWatchError, TwResult};
use crate::game::Game;
use crate::processing::Processor;
use crate::state::{ButtonEvent, Context, GameState, StateMachine};
use crate::vision::{Camera, CaptureLoop, FrameSlot, Panel, Vision};
use crate::watch::{ClockState, Ticker, Watch};
use crate::worker::{Command, CommandQueue, GameView, StatusHub, Worker};

/// A running table: all threads live as long as the session.
pub struct Session {
    machine: StateMachine,
    watch: Arc<Watch>,
    slot: Arc<FrameSlot>,
    hub: Arc<StatusHub>,
    shared: Arc<Mutex<Game>>,
    worker: Worker,
    capture: CaptureLoop,
    ticker: Ticker,
}

impl Session {
    /// Builds the engine around the supplied hardware collaborators
    /// and starts all background threads.
    pub fn start(
        config: Config,
        nicknames: [String; 2],
        camera: Arc<dyn Camera>,
        vision: Arc<dyn Vision>,
        panel: Arc<dyn Panel>,
    ) -> TwResult<Self> {
        let watch = Arc::new(Watch::new(Arc::clone(&panel)));
        let slot = Arc::new(FrameSlot::new());
        let hub = Arc::new(StatusHub::new());

        let mut processor = Processor::new(&config, Arc::clone(&slot), vision, Arc::clone(&hub))?;
        processor.set_nicknames(nicknames[0].clone(), nicknames[1].clone());
        let shared = processor.shared_game();
        let worker = Worker::spawn(move |command| processor.handle(command));
        let queue = worker.queue();
        queue.submit(Command::StartOfGame)?;

        let capture = CaptureLoop::spawn(camera, Arc::clone(&slot));
        let ticker = Ticker::spawn(Arc::clone(&watch));
        let machine = StateMachine::new(Context {
            watch: Arc::clone(&watch),
            queue,
            panel,
            params: config.game.clone(),
        });
        info!("session started for {} vs {}", nicknames[0], nicknames[1]);

        Ok(Self {
            machine,
            watch,
            slot,
            hub,
            shared,
            worker,
            capture,
            ticker,
        })
    }

    pub fn press(&mut self, button: ButtonEvent) -> GameState {
        self.machine.press(button)
    }

    pub fn state(&self) -> GameState {
        self.machine.state()
    }

    pub fn clock(&self) -> ClockState {
        self.watch.status()
    }

    /// The latest published view, without blocking.
    pub fn status(&self) -> GameView {
        self.hub.snapshot()
    }

    /// Blocks until the next mutation, consuming the update signal.
    pub fn wait_update(&self, timeout: Duration) -> Option<GameView> {
        self.hub.wait_update(timeout)
    }

    /// A clone of the committed game.
    pub fn game(&self) -> Game {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Queue handle for admin corrections. They serialize behind any
    /// in-flight move processing.
    pub fn queue(&self) -> CommandQueue {
        self.worker.queue()
    }

    /// Waits until every enqueued command has been executed.
    pub fn sync(&self, timeout: Duration) -> bool {
        self.worker.wait_idle(timeout)
    }

    /// Waits until the capture loop has published a frame of at least
    /// `seq`. Scripted drivers use this to hand a reading over before
    /// pressing the button that consumes it.
    pub fn wait_for_frame(&self, seq: u64, timeout: Duration) -> TwResult<()> {
        let deadline = Instant::now() + timeout;
        while self.slot.latest().map_or(true, |frame| frame.seq < seq) {
            if Instant::now() >= deadline {
                return Err(TileWatchError::Camera(format!(
                    "no frame {seq} within {timeout:?}"
                )));
            }
            thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    }

    /// Stops all threads. Queued commands are drained first.
    pub fn shutdown(self) {
        let Session {
            capture,
            ticker,
            worker,
            ..
        } = self;
        capture.stop();
        ticker.stop();
        worker.stop();
        info!("session stopped");
    }
}
