//! Input events and the seams to the OS layer.
//!
//! OS hooks run on their own threads and push into an [`InputQueue`]; the
//! compositor drains it on its own thread, so no core state is shared.

use std::collections::VecDeque;
use std::sync::Arc;

use kurbo::Point;
use parking_lot::Mutex;

/// Keys the compositor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    F12,
    Escape,
    Z,
    Other(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    pub fn with_ctrl(key: Key) -> Self {
        Self { key, ctrl: true }
    }
}

/// One normalized input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Screen-space sample from the global pointer hook.
    PointerSample(Point),
    /// Canvas-space press, move and release on the overlay.
    PointerPressed(Point),
    PointerMoved(Point),
    PointerReleased(Point),
    Key(KeyEvent),
    /// External request to enter or leave edit mode.
    EditMode(bool),
}

/// Thread-safe event queue.
///
/// Producers on any thread push; the owning thread drains once per tick.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    inner: Arc<Mutex<VecDeque<InputEvent>>>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InputEvent) {
        self.inner.lock().push_back(event);
    }

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<InputEvent> {
        self.inner.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// A source of input events such as an OS hook.
///
/// `start`, `stop` and `dispose` must be safe to call repeatedly.
pub trait EventSource {
    fn start(&mut self);

    fn stop(&mut self);

    fn is_running(&self) -> bool;

    fn dispose(&mut self) {
        self.stop();
    }
}

/// Receives click-through toggles for the overlay window.
pub trait ClickThrough {
    fn set_click_through(&mut self, enabled: bool);
}
