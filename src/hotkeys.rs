//! Global hotkey handling for screen-recorder.
//!
//! Keys are captured system-wide with rdev, so they work while the recorder's
//! terminal is in the background. Only an allow-listed set of keys is forwarded,
//! and only while the listener is active (during a recording).

use rdev::{listen, Event, EventType, Key};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::events::{AppEvent, EventSender};

/// Keys the recorder reacts to while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKey {
    /// Stop the recording
    S,
    /// Reserved
    P,
    /// Reserved
    U,
}

impl GlobalKey {
    /// Map a raw key to an allow-listed one.
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::KeyS => Some(GlobalKey::S),
            Key::KeyP => Some(GlobalKey::P),
            Key::KeyU => Some(GlobalKey::U),
            _ => None,
        }
    }

    pub fn stops_recording(self) -> bool {
        self == GlobalKey::S
    }

    pub fn name(self) -> &'static str {
        match self {
            GlobalKey::S => "s",
            GlobalKey::P => "p",
            GlobalKey::U => "u",
        }
    }
}

/// Forwards allow-listed key presses to the event loop while active.
pub struct KeyListener {
    /// Gate checked for every key press
    active: Arc<AtomicBool>,
    events: EventSender,
    /// Handle to the listener thread
    listener_thread: Option<JoinHandle<()>>,
}

impl KeyListener {
    pub fn new(events: EventSender) -> Self {
        KeyListener {
            active: Arc::new(AtomicBool::new(false)),
            events,
            listener_thread: None,
        }
    }

    /// Start forwarding keys, spawning the listener thread on first use.
    ///
    /// rdev's `listen` never returns while it works, so the thread is kept for the
    /// life of the process and `stop` only closes the gate.
    pub fn start(&mut self) -> io::Result<()> {
        let needs_thread = self
            .listener_thread
            .as_ref()
            .map_or(true, |handle| handle.is_finished());

        if needs_thread {
            let active = Arc::clone(&self.active);
            let events = self.events.clone();
            let handle = thread::Builder::new()
                .name("global-keys".to_string())
                .spawn(move || {
                    let callback = move |event: Event| {
                        if let EventType::KeyPress(key) = event.event_type {
                            dispatch(key, &active, &events);
                        }
                    };
                    // On macOS this requires Accessibility permission
                    if let Err(e) = listen(callback) {
                        log::error!("Global key listener stopped: {:?}", e);
                    }
                })?;
            self.listener_thread = Some(handle);
        }

        self.active.store(true, Ordering::SeqCst);
        log::debug!("Global key listener active");
        Ok(())
    }

    /// Stop forwarding keys.
    pub fn stop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            log::debug!("Global key listener inactive");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forward `key` if the gate is open and the key is allow-listed.
///
/// Returns true if an event was sent.
fn dispatch(key: Key, active: &AtomicBool, events: &EventSender) -> bool {
    if !active.load(Ordering::SeqCst) {
        return false;
    }
    match GlobalKey::from_key(key) {
        Some(global) => {
            log::debug!("Global key pressed: {}", global.name());
            events.send(AppEvent::Key(global)).is_ok()
        }
        None => false,
    }
}
