//! Notifications flowing from background threads to the front-end loop.
//!
//! Background contexts never touch session state directly; they only enqueue
//! [`AppEvent`]s that the event loop consumes.

use std::fmt;

use tokio::sync::mpsc;

use crate::hotkeys::GlobalKey;

/// Identifies one start-to-finish recording attempt.
pub type SessionId = u64;

/// Terminal state of a session. Exactly one is reported per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The encoder finished normally or was stopped gracefully
    Completed,
    /// The encoder could not be launched or exited abnormally
    Failed(String),
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Completed => f.write_str("Recording stopped and saved."),
            SessionOutcome::Failed(message) => write!(f, "Recording failed:\n{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The supervisor's monitor reports how a session ended
    Session {
        id: SessionId,
        outcome: SessionOutcome,
    },
    /// A stop requested before the encoder was up could not be delivered
    StopFailed { id: SessionId, message: String },
    /// An allow-listed key was pressed anywhere on the desktop
    Key(GlobalKey),
    /// The user asked to close the application
    CloseRequested,
}

pub type EventSender = mpsc::UnboundedSender<AppEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AppEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
