//! Unit tests for the session state machine and stop fan-in.

use screen_recorder::cancel::{StopSource, StopToken};
use screen_recorder::session::{SessionState, SessionStateMachine};

#[test]
fn test_enablement_follows_state() {
    let mut sm = SessionStateMachine::new();
    assert!(sm.can_start() && sm.controls_enabled() && !sm.can_stop());

    sm.begin_recording();
    assert!(!sm.can_start() && !sm.controls_enabled() && sm.can_stop());

    sm.begin_stopping();
    assert!(!sm.can_start() && !sm.can_stop());

    sm.finish();
    assert_eq!(sm.state(), SessionState::Idle);
    assert!(sm.can_start());
}

#[test]
fn test_stopping_cannot_restart() {
    let mut sm = SessionStateMachine::new();
    sm.begin_recording();
    sm.begin_stopping();
    assert!(!sm.begin_recording());
    assert!(!sm.begin_selection());
    assert_eq!(sm.state(), SessionState::Stopping);
}

#[test]
fn test_stop_token_records_winner() {
    let token = StopToken::new();
    assert_eq!(token.source(), None);
    assert!(token.trigger(StopSource::WindowClose));
    assert!(!token.trigger(StopSource::Hotkey));
    assert_eq!(token.source(), Some(StopSource::WindowClose));
    assert_eq!(StopSource::WindowClose.to_string(), "close request");
}
