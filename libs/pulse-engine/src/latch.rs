use std::sync::atomic::{AtomicU8, Ordering};

/// How a stream ended, as seen by its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Completed,
    Errored,
    /// The consumer went away. Closes the latch without a downstream signal.
    Cancelled,
}

const OPEN: u8 = 0;
const COMPLETED: u8 = 1;
const ERRORED: u8 = 2;
const CANCELLED: u8 = 3;

impl Terminal {
    fn as_u8(self) -> u8 {
        match self {
            Terminal::Completed => COMPLETED,
            Terminal::Errored => ERRORED,
            Terminal::Cancelled => CANCELLED,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        match v {
            COMPLETED => Some(Terminal::Completed),
            ERRORED => Some(Terminal::Errored),
            CANCELLED => Some(Terminal::Cancelled),
            _ => None,
        }
    }
}

/// Fire-once latch around terminal-signal delivery.
///
/// The first `fire` wins; every later call returns `false` and must not be
/// delivered downstream. Safe to share between threads.
#[derive(Debug)]
pub struct TerminalLatch {
    state: AtomicU8,
}

impl Default for TerminalLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalLatch {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(OPEN),
        }
    }

    /// Try to close the latch with `terminal`. Returns `true` if this call won.
    pub fn fire(&self, terminal: Terminal) -> bool {
        self.state
            .compare_exchange(OPEN, terminal.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_open(&self) -> bool {
        self.state.load(Ordering::Acquire) == OPEN
    }

    /// The terminal that won, if any.
    pub fn terminal(&self) -> Option<Terminal> {
        Terminal::from_u8(self.state.load(Ordering::Acquire))
    }
}
