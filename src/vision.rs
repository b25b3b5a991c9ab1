//! Interfaces to the hardware collaborators: camera, tile recognition
//! and the operator panel. The engine only ever sees these traits,
//! real drivers live outside this crate.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::board::{Coord, Tile};

/// One board capture: the squares the extractor considers occupied,
/// plus a reference to the stored image.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub seq: u64,
    pub candidates: BTreeSet<Coord>,
    pub image: Option<PathBuf>,
}

/// Produces frames at its own pace. `frame` may block until the next
/// capture but must return periodically so loops can stop.
pub trait Camera: Send + Sync {
    fn frame(&self) -> Frame;
}

/// Reads a single square of a frame. Implementations return the
/// suggestion unchanged unless they match something more confident.
pub trait Vision: Send + Sync {
    fn recognize(&self, frame: &Frame, coord: Coord, suggestion: Tile) -> Tile;
}

/// Recognizer that never overrides a suggestion.
pub struct NullVision;

impl Vision for NullVision {
    fn recognize(&self, _frame: &Frame, _coord: Coord, suggestion: Tile) -> Tile {
        suggestion
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    Green,
    Yellow,
    Red,
}

/// Operator-facing outputs: button lamps and the two player displays.
pub trait Panel: Send + Sync {
    fn show_time(&self, player: usize, time: [u32; 2], current: [u32; 2]);
    fn show_leds(&self, lit: &[Led]);
    fn show_message(&self, text: &str);
}

/// Panel without hardware attached.
pub struct NullPanel;

impl Panel for NullPanel {
    fn show_time(&self, _player: usize, _time: [u32; 2], _current: [u32; 2]) {}
    fn show_leds(&self, _lit: &[Led]) {}
    fn show_message(&self, _text: &str) {}
}

/// Mailbox holding the latest frame. Capture overwrites, readers take
/// a copy of whatever is newest.
#[derive(Default)]
pub struct FrameSlot {
    inner: Mutex<Option<Frame>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: Frame) {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(frame);
    }

    pub fn latest(&self) -> Option<Frame> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Copies frames from a camera into a [`FrameSlot`] until stopped.
/// The stop flag is checked once per capture, never mid-capture.
pub struct CaptureLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    pub fn spawn(camera: Arc<dyn Camera>, slot: Arc<FrameSlot>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(String::from("capture"))
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    slot.publish(camera.frame());
                }
            })
            .ok();
        Self { stop, handle }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
