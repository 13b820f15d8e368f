//! Session state machine.
//!
//! The single source of truth for which actions are valid. Invalid transitions are
//! ignored (they return `false`) because the front-end already hides the
//! affordances that would trigger them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing running; settings may be edited
    #[default]
    Idle,
    /// Interactive rectangle selection; everything else is disabled
    SelectingRegion,
    /// Encoder running, indicator shown, hotkeys live
    Recording,
    /// Stop requested, waiting for the encoder to exit
    Stopping,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::SelectingRegion => "selecting region",
            SessionState::Recording => "recording",
            SessionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
pub struct SessionStateMachine {
    state: SessionState,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Settings and start controls are usable only when idle.
    pub fn controls_enabled(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn can_start(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Stop is offered while selecting (to abort) and while recording.
    pub fn can_stop(&self) -> bool {
        matches!(
            self.state,
            SessionState::SelectingRegion | SessionState::Recording
        )
    }

    /// A process may be alive in these states.
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Recording | SessionState::Stopping)
    }

    pub fn begin_selection(&mut self) -> bool {
        self.transition(SessionState::Idle, SessionState::SelectingRegion)
    }

    /// Selection finished or was abandoned.
    pub fn end_selection(&mut self) -> bool {
        self.transition(SessionState::SelectingRegion, SessionState::Idle)
    }

    pub fn begin_recording(&mut self) -> bool {
        self.transition(SessionState::Idle, SessionState::Recording)
    }

    pub fn begin_stopping(&mut self) -> bool {
        self.transition(SessionState::Recording, SessionState::Stopping)
    }

    /// A stop could not be delivered; the encoder is still recording.
    pub fn resume_recording(&mut self) -> bool {
        self.transition(SessionState::Stopping, SessionState::Recording)
    }

    /// The encoder reported a terminal state.
    pub fn finish(&mut self) -> bool {
        match self.state {
            SessionState::Recording | SessionState::Stopping => {
                self.set(SessionState::Idle);
                true
            }
            other => {
                log::debug!("Ignoring finish while {}", other);
                false
            }
        }
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> bool {
        if self.state != from {
            log::debug!(
                "Ignoring transition {} -> {} while {}",
                from,
                to,
                self.state
            );
            return false;
        }
        self.set(to);
        true
    }

    fn set(&mut self, to: SessionState) {
        log::debug!("Session state: {} -> {}", self.state, to);
        self.state = to;
    }
}
