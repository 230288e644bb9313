use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Milliseconds on the engine's monotonic timeline
pub type Millis = u64;

/// Monotonic time source used for scheduling and grace-window math
pub trait Clock {
    fn now(&self) -> Millis;
}

/// Production clock: milliseconds elapsed since construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Hand-driven clock. Clones share the same timeline, so a test can keep
/// one handle while the game owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, at: Millis) {
        // never run backwards
        if at > self.now.get() {
            self.now.set(at);
        }
    }

    pub fn advance(&self, by: Millis) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }
}
