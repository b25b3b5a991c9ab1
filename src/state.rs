//! The turn state machine. Buttons map to handlers through a tagged
//! transition table; handlers flip the clock and LEDs synchronously,
//! enqueue at most one command and return the next state. Unmapped
//! (state, button) pairs are logged no-ops.

use std::sync::Arc;

use strum_macros::{Display, EnumString};
use tracing::{debug, warn};

use crate::config::GameParams;
use crate::vision::{Led, Panel};
use crate::watch::Watch;
use crate::worker::{Command, CommandQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum GameState {
    /// Waiting for the first press of a fresh game.
    Start,
    /// Player 0's clock is running.
    S0,
    /// Player 1's clock is running.
    S1,
    /// Paused out of S0. Challenges are settled here.
    P0,
    /// Paused out of S1.
    P1,
    Eog,
    /// Input suppressed while the host resets or reboots.
    Blocking,
}

/// The fixed button vocabulary of the table hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ButtonEvent {
    /// Player 0's turn button.
    Green,
    /// Player 1's turn button.
    Red,
    /// Pause / resume.
    Yellow,
    Doubt0,
    Doubt1,
    Reset,
    Reboot,
    /// Toggles the device's access point, only honored before a game.
    ApToggle,
}

/// Ports the handlers act through. Decision logic stays in the
/// handlers, I/O stays behind these handles.
pub struct Context {
    pub watch: Arc<Watch>,
    pub queue: CommandQueue,
    pub panel: Arc<dyn Panel>,
    pub params: GameParams,
}

impl Context {
    fn enqueue(&self, command: Command) {
        if let Err(err) = self.queue.submit(command) {
            warn!("could not enqueue command: {err}");
        }
    }

    fn played_time(&self) -> [u32; 2] {
        self.watch.status().time
    }

    /// A challenge counts only within the doubt timeout of the
    /// challenger's running turn.
    fn doubt_allowed(&self, challenger: usize) -> bool {
        self.watch.status().current[challenger] <= self.params.doubt_timeout
    }

    fn challenge(&self, challenger: usize, valid: bool) {
        if !self.doubt_allowed(challenger) {
            self.panel.show_message("doubt timeout expired");
            return;
        }
        let played_time = self.played_time();
        self.enqueue(if valid {
            Command::ValidChallenge {
                challenger,
                played_time,
            }
        } else {
            Command::InvalidChallenge {
                challenger,
                played_time,
            }
        });
    }
}

type Handler = fn(&Context) -> GameState;

fn start_player0(ctx: &Context) -> GameState {
    ctx.watch.start(0);
    ctx.panel.show_leds(&[Led::Green]);
    GameState::S0
}

fn start_player1(ctx: &Context) -> GameState {
    ctx.watch.start(1);
    ctx.panel.show_leds(&[Led::Red]);
    GameState::S1
}

fn new_game(ctx: &Context) -> GameState {
    ctx.watch.reset();
    ctx.panel.show_leds(&[]);
    ctx.enqueue(Command::StartOfGame);
    GameState::Start
}

fn reboot(ctx: &Context) -> GameState {
    ctx.watch.pause();
    ctx.panel.show_message("rebooting");
    ctx.enqueue(Command::EndOfGame);
    GameState::Blocking
}

fn toggle_ap(ctx: &Context) -> GameState {
    ctx.panel.show_message("toggle access point");
    GameState::Start
}

fn submit_player0(ctx: &Context) -> GameState {
    ctx.watch.start(1);
    ctx.panel.show_leds(&[Led::Red]);
    ctx.enqueue(Command::Move {
        player: 0,
        played_time: ctx.played_time(),
    });
    GameState::S1
}

fn submit_player1(ctx: &Context) -> GameState {
    ctx.watch.start(0);
    ctx.panel.show_leds(&[Led::Green]);
    ctx.enqueue(Command::Move {
        player: 1,
        played_time: ctx.played_time(),
    });
    GameState::S0
}

fn pause_p0(ctx: &Context) -> GameState {
    ctx.watch.pause();
    ctx.panel.show_leds(&[Led::Yellow]);
    GameState::P0
}

fn pause_p1(ctx: &Context) -> GameState {
    ctx.watch.pause();
    ctx.panel.show_leds(&[Led::Yellow]);
    GameState::P1
}

fn resume_s0(ctx: &Context) -> GameState {
    ctx.watch.resume();
    ctx.panel.show_leds(&[Led::Green]);
    GameState::S0
}

fn resume_s1(ctx: &Context) -> GameState {
    ctx.watch.resume();
    ctx.panel.show_leds(&[Led::Red]);
    GameState::S1
}

fn valid_challenge_p0(ctx: &Context) -> GameState {
    ctx.challenge(0, true);
    GameState::P0
}

fn invalid_challenge_p0(ctx: &Context) -> GameState {
    ctx.challenge(0, false);
    GameState::P0
}

fn valid_challenge_p1(ctx: &Context) -> GameState {
    ctx.challenge(1, true);
    GameState::P1
}

fn invalid_challenge_p1(ctx: &Context) -> GameState {
    ctx.challenge(1, false);
    GameState::P1
}

fn end_of_game(ctx: &Context) -> GameState {
    ctx.watch.pause();
    ctx.panel.show_message("end of game");
    ctx.enqueue(Command::EndOfGame);
    GameState::Eog
}

/// The transition table. Every mapped pair performs its synchronous
/// side effects and enqueues at most one command.
const TRANSITIONS: &[(GameState, ButtonEvent, Handler)] = &[
    (GameState::Start, ButtonEvent::Green, start_player1),
    (GameState::Start, ButtonEvent::Red, start_player0),
    (GameState::Start, ButtonEvent::Reset, new_game),
    (GameState::Start, ButtonEvent::Reboot, reboot),
    (GameState::Start, ButtonEvent::ApToggle, toggle_ap),
    (GameState::S0, ButtonEvent::Green, submit_player0),
    (GameState::S0, ButtonEvent::Yellow, pause_p0),
    (GameState::S1, ButtonEvent::Red, submit_player1),
    (GameState::S1, ButtonEvent::Yellow, pause_p1),
    (GameState::P0, ButtonEvent::Red, resume_s0),
    (GameState::P0, ButtonEvent::Yellow, resume_s0),
    (GameState::P0, ButtonEvent::Doubt0, valid_challenge_p0),
    (GameState::P0, ButtonEvent::Doubt1, invalid_challenge_p0),
    (GameState::P0, ButtonEvent::Reset, end_of_game),
    (GameState::P1, ButtonEvent::Green, resume_s1),
    (GameState::P1, ButtonEvent::Yellow, resume_s1),
    (GameState::P1, ButtonEvent::Doubt1, valid_challenge_p1),
    (GameState::P1, ButtonEvent::Doubt0, invalid_challenge_p1),
    (GameState::P1, ButtonEvent::Reset, end_of_game),
    (GameState::Eog, ButtonEvent::Green, new_game),
    (GameState::Eog, ButtonEvent::Red, new_game),
    (GameState::Eog, ButtonEvent::Reset, new_game),
];

fn lookup(state: GameState, button: ButtonEvent) -> Option<Handler> {
    TRANSITIONS
        .iter()
        .find(|(s, b, _)| *s == state && *b == button)
        .map(|(_, _, handler)| *handler)
}

pub struct StateMachine {
    state: GameState,
    context: Context,
}

impl StateMachine {
    pub fn new(context: Context) -> Self {
        Self {
            state: GameState::Start,
            context,
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Feeds one button press through the table.
    pub fn press(&mut self, button: ButtonEvent) -> GameState {
        match lookup(self.state, button) {
            Some(handler) => {
                let next = handler(&self.context);
                debug!("{} --{}--> {}", self.state, button, next);
                self.state = next;
            }
            None => debug!("{} ignored in {}", button, self.state),
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::NullPanel;
    use crate::worker::Worker;
    use std::sync::Mutex;
    use std::time::Duration;

    fn machine_with_log() -> (StateMachine, Arc<Mutex<Vec<String>>>, Worker) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        let worker = Worker::spawn(move |command| {
            seen.lock().unwrap().push(format!("{command:?}"));
            Ok(())
        });
        let context = Context {
            watch: Arc::new(Watch::new(Arc::new(NullPanel))),
            queue: worker.queue(),
            panel: Arc::new(NullPanel),
            params: GameParams::default(),
        };
        (StateMachine::new(context), log, worker)
    }

    fn drained(log: &Arc<Mutex<Vec<String>>>, worker: &Worker) -> Vec<String> {
        assert!(worker.wait_idle(Duration::from_secs(5)));
        log.lock().unwrap().clone()
    }

    #[test]
    fn a_full_turn_cycle() {
        let (mut machine, log, worker) = machine_with_log();
        assert_eq!(machine.press(ButtonEvent::Red), GameState::S0);
        assert_eq!(machine.press(ButtonEvent::Green), GameState::S1);
        assert_eq!(machine.press(ButtonEvent::Red), GameState::S0);

        let commands = drained(&log, &worker);
        assert_eq!(commands.len(), 2);
        assert!(commands[0].contains("player: 0"));
        assert!(commands[1].contains("player: 1"));
    }

    #[test]
    fn unmapped_pairs_are_no_ops() {
        let (mut machine, log, worker) = machine_with_log();
        assert_eq!(machine.press(ButtonEvent::Yellow), GameState::Start);
        assert_eq!(machine.press(ButtonEvent::Doubt0), GameState::Start);
        machine.press(ButtonEvent::Red);
        assert_eq!(machine.press(ButtonEvent::Red), GameState::S0);
        assert!(drained(&log, &worker).is_empty());
    }

    #[test]
    fn challenge_settlement_from_the_pause_state() {
        let (mut machine, log, worker) = machine_with_log();
        machine.press(ButtonEvent::Red);
        assert_eq!(machine.press(ButtonEvent::Yellow), GameState::P0);
        assert_eq!(machine.press(ButtonEvent::Doubt1), GameState::P0);
        assert_eq!(machine.press(ButtonEvent::Yellow), GameState::S0);

        let commands = drained(&log, &worker);
        assert_eq!(commands.len(), 1);
        assert!(commands[0].contains("InvalidChallenge"));
        assert!(commands[0].contains("challenger: 0"));
    }

    #[test]
    fn doubt_after_the_timeout_is_refused() {
        let (mut machine, log, worker) = machine_with_log();
        machine.context.params.doubt_timeout = 2;
        machine.press(ButtonEvent::Red);
        for _ in 0..3 {
            machine.context.watch.tick();
        }
        machine.press(ButtonEvent::Yellow);
        assert_eq!(machine.press(ButtonEvent::Doubt0), GameState::P0);
        assert!(drained(&log, &worker).is_empty());
    }

    #[test]
    fn reset_from_pause_ends_the_game() {
        let (mut machine, log, worker) = machine_with_log();
        machine.press(ButtonEvent::Red);
        machine.press(ButtonEvent::Yellow);
        assert_eq!(machine.press(ButtonEvent::Reset), GameState::Eog);
        assert_eq!(machine.press(ButtonEvent::Green), GameState::Start);
        assert_eq!(machine.press(ButtonEvent::Reboot), GameState::Blocking);
        assert_eq!(machine.press(ButtonEvent::Green), GameState::Blocking);

        let commands = drained(&log, &worker);
        assert_eq!(commands.len(), 3);
        assert!(commands[0].contains("EndOfGame"));
        assert!(commands[1].contains("StartOfGame"));
        assert!(commands[2].contains("EndOfGame"));
    }
}
