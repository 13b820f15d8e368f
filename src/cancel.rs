//! Stop-request fan-in.
//!
//! Several independent triggers can ask a recording to stop. A [`StopToken`] is
//! armed for each session and lets exactly one of them through.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a stop request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSource {
    /// The stop command or button
    UserAction,
    /// A global hotkey pressed while the recorder was in the background
    Hotkey,
    /// The application was asked to close mid-recording
    WindowClose,
}

impl StopSource {
    const ALL: [StopSource; 3] = [
        StopSource::UserAction,
        StopSource::Hotkey,
        StopSource::WindowClose,
    ];

    fn code(self) -> u8 {
        match self {
            StopSource::UserAction => 1,
            StopSource::Hotkey => 2,
            StopSource::WindowClose => 3,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl fmt::Display for StopSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopSource::UserAction => f.write_str("stop command"),
            StopSource::Hotkey => f.write_str("global hotkey"),
            StopSource::WindowClose => f.write_str("close request"),
        }
    }
}

const UNSET: u8 = 0;

/// First-writer-wins latch for one session's stop request.
#[derive(Debug, Default)]
pub struct StopToken {
    winner: AtomicU8,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stop request. Returns true only for the first caller.
    pub fn trigger(&self, source: StopSource) -> bool {
        self.winner
            .compare_exchange(UNSET, source.code(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_triggered(&self) -> bool {
        self.winner.load(Ordering::SeqCst) != UNSET
    }

    /// The source whose request was accepted, if any.
    pub fn source(&self) -> Option<StopSource> {
        StopSource::from_code(self.winner.load(Ordering::SeqCst))
    }

    /// Re-arm after a request that could not be delivered.
    pub fn reset(&self) {
        self.winner.store(UNSET, Ordering::SeqCst);
    }
}
