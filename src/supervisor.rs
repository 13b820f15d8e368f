//! Encoder process supervision.
//!
//! One encoder per session. [`Supervisor::start`] hands the command to a monitor
//! thread and returns at once; the monitor spawns the process, polls it until it
//! exits, classifies the exit, and reports exactly one [`SessionOutcome`] on the
//! event channel.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::command::EncoderCommand;
use crate::error::RecorderError;
use crate::events::{AppEvent, EventSender, SessionId, SessionOutcome};
use crate::pipeline::{EncoderChild, ExitInfo, ProcessHost};

/// Exit codes treated as success when no stop was requested: normal exit, and the
/// codes ffmpeg reports after an interrupt or a partial exit.
pub const ACCEPTABLE_EXIT_CODES: [i32; 3] = [0, 2, 130];

/// Default grace period between the interrupt and a forced kill.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// State shared between the front-end and one monitor thread.
///
/// The monitor publishes the pid and reaps the child while holding this lock, and
/// `stop` signals while holding it, so an interrupt never targets a reaped pid.
#[derive(Debug, Default)]
struct Control {
    pid: Option<u32>,
    stop_requested: bool,
    exited: bool,
    finished: bool,
}

fn lock(control: &Mutex<Control>) -> MutexGuard<'_, Control> {
    control.lock().unwrap_or_else(|e| e.into_inner())
}

struct ActiveSession {
    id: SessionId,
    control: Arc<Mutex<Control>>,
    monitor: Option<JoinHandle<()>>,
}

/// Owns the lifecycle of the encoder.
pub struct Supervisor {
    host: Arc<dyn ProcessHost>,
    events: EventSender,
    stop_timeout: Option<Duration>,
    next_id: SessionId,
    active: Option<ActiveSession>,
}

impl Supervisor {
    pub fn new(host: Arc<dyn ProcessHost>, events: EventSender) -> Self {
        Self {
            host,
            events,
            stop_timeout: Some(DEFAULT_STOP_TIMEOUT),
            next_id: 1,
            active: None,
        }
    }

    /// Set the grace period before a stopped encoder is killed. `None` waits forever.
    pub fn with_stop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// True until the current session's outcome has been decided.
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| !lock(&a.control).finished)
    }

    /// Id of the most recently started session.
    pub fn current_session(&self) -> Option<SessionId> {
        self.active.as_ref().map(|a| a.id)
    }

    pub fn stop_requested(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| lock(&a.control).stop_requested)
    }

    /// Launch `command` on a monitor thread.
    ///
    /// Fails with [`RecorderError::AlreadyRunning`] without spawning anything if a
    /// session is live. Launch errors are reported later as a failed outcome.
    pub fn start(&mut self, command: EncoderCommand) -> Result<SessionId, RecorderError> {
        if self.is_running() {
            return Err(RecorderError::AlreadyRunning);
        }
        self.reap_finished();

        let id = self.next_id;
        self.next_id += 1;

        let control = Arc::new(Mutex::new(Control::default()));
        let monitor = {
            let host = Arc::clone(&self.host);
            let control = Arc::clone(&control);
            let events = self.events.clone();
            let stop_timeout = self.stop_timeout;
            log::info!("Starting session {}: {}", id, command);
            thread::Builder::new()
                .name(format!("encoder-monitor-{}", id))
                .spawn(move || monitor(id, host.as_ref(), &command, &control, &events, stop_timeout))
                .map_err(|e| RecorderError::SpawnFailure {
                    program: "monitor thread".to_string(),
                    message: e.to_string(),
                })?
        };

        self.active = Some(ActiveSession {
            id,
            control,
            monitor: Some(monitor),
        });
        Ok(id)
    }

    /// Ask the encoder to finish gracefully.
    ///
    /// Returns `Ok(false)` when there is nothing to stop or a stop is already
    /// pending, so concurrent triggers are harmless. If the interrupt cannot be
    /// delivered the request is withdrawn and [`RecorderError::SignalFailure`] is
    /// returned; the encoder keeps running.
    pub fn stop(&self) -> Result<bool, RecorderError> {
        let Some(active) = &self.active else {
            return Ok(false);
        };
        let mut control = lock(&active.control);
        if control.exited || control.finished || control.stop_requested {
            return Ok(false);
        }

        // Must be visible to the monitor before the encoder can react to the signal
        control.stop_requested = true;

        let Some(pid) = control.pid else {
            log::debug!("Stop requested before the encoder was spawned");
            return Ok(true);
        };
        match self.host.interrupt(pid) {
            Ok(()) => {
                log::info!("Sent interrupt to encoder (pid {})", pid);
                Ok(true)
            }
            Err(e) => {
                control.stop_requested = false;
                log::error!("Failed to interrupt encoder (pid {}): {}", pid, e);
                Err(RecorderError::SignalFailure(e))
            }
        }
    }

    /// Block until the current monitor thread has exited.
    pub fn join(&mut self) {
        if let Some(handle) = self.active.as_mut().and_then(|a| a.monitor.take()) {
            if handle.join().is_err() {
                log::error!("Encoder monitor thread panicked");
            }
        }
    }

    fn reap_finished(&mut self) {
        if let Some(mut active) = self.active.take() {
            if let Some(handle) = active.monitor.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Leave no encoder behind writing a half-finished file
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

fn monitor(
    id: SessionId,
    host: &dyn ProcessHost,
    command: &EncoderCommand,
    control: &Mutex<Control>,
    events: &EventSender,
    stop_timeout: Option<Duration>,
) {
    let outcome = run_session(id, host, command, control, events, stop_timeout);
    match &outcome {
        SessionOutcome::Completed => log::info!("Session {} completed", id),
        SessionOutcome::Failed(message) => log::error!("Session {} failed: {}", id, message),
    }
    lock(control).finished = true;
    if events.send(AppEvent::Session { id, outcome }).is_err() {
        log::debug!("Event loop gone, dropping outcome of session {}", id);
    }
}

fn run_session(
    id: SessionId,
    host: &dyn ProcessHost,
    command: &EncoderCommand,
    control: &Mutex<Control>,
    events: &EventSender,
    stop_timeout: Option<Duration>,
) -> SessionOutcome {
    let mut child = match host.start(command) {
        Ok(child) => child,
        Err(e) => {
            lock(control).exited = true;
            let err = RecorderError::SpawnFailure {
                program: command.program().to_string(),
                message: e.to_string(),
            };
            return SessionOutcome::Failed(err.to_string());
        }
    };
    {
        let mut ctl = lock(control);
        ctl.pid = Some(child.pid());
        if ctl.stop_requested {
            // The stop arrived while spawning and was already accepted
            if let Err(e) = host.interrupt(child.pid()) {
                ctl.stop_requested = false;
                log::error!("Failed to deliver early stop to pid {}: {}", child.pid(), e);
                let message = RecorderError::SignalFailure(e).to_string();
                if events.send(AppEvent::StopFailed { id, message }).is_err() {
                    log::debug!("Event loop gone, dropping stop failure of session {}", id);
                }
            } else {
                log::info!("Sent interrupt to encoder (pid {})", child.pid());
            }
        }
    }

    let exit = wait_for_exit(child.as_mut(), control, stop_timeout);
    let stop_requested = lock(control).stop_requested;
    let diagnostics = child.take_diagnostics();

    match exit {
        Ok(exit) => classify(exit, stop_requested, &diagnostics),
        Err(e) => SessionOutcome::Failed(format!("Lost track of the encoder: {}", e)),
    }
}

fn wait_for_exit(
    child: &mut dyn EncoderChild,
    control: &Mutex<Control>,
    stop_timeout: Option<Duration>,
) -> std::io::Result<ExitInfo> {
    let mut stop_seen: Option<Instant> = None;
    let mut killed = false;

    loop {
        {
            let mut ctl = lock(control);
            match child.try_wait() {
                Ok(Some(exit)) => {
                    ctl.exited = true;
                    return Ok(exit);
                }
                Ok(None) => {}
                Err(e) => {
                    ctl.exited = true;
                    let _ = child.kill();
                    return Err(e);
                }
            }
            stop_seen = match (ctl.stop_requested, stop_seen) {
                (true, None) => Some(Instant::now()),
                (true, seen) => seen,
                (false, _) => None,
            };
        }

        if let (Some(since), Some(timeout)) = (stop_seen, stop_timeout) {
            if !killed && since.elapsed() >= timeout {
                log::warn!(
                    "Encoder (pid {}) ignored the interrupt for {:?}, killing it",
                    child.pid(),
                    timeout
                );
                if let Err(e) = child.kill() {
                    log::error!("Failed to kill encoder: {}", e);
                }
                killed = true;
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Decide the outcome of a session from how the encoder exited.
///
/// A requested stop always counts as success: interrupted encoders report
/// signal-derived codes that are not errors.
pub fn classify(exit: ExitInfo, stop_requested: bool, diagnostics: &str) -> SessionOutcome {
    if stop_requested {
        return SessionOutcome::Completed;
    }
    match exit.code {
        Some(code) if ACCEPTABLE_EXIT_CODES.contains(&code) => SessionOutcome::Completed,
        code => {
            let diagnostics = diagnostics.trim();
            if diagnostics.is_empty() {
                let err = RecorderError::EncoderFailure {
                    code,
                    diagnostics: String::new(),
                };
                SessionOutcome::Failed(err.to_string())
            } else {
                SessionOutcome::Failed(diagnostics.to_string())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scriptable stand-in for the platform process host.

    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::command::EncoderCommand;
    use crate::pipeline::{EncoderChild, ExitInfo, ProcessHost};

    #[derive(Debug, Default)]
    struct FakeState {
        exit: Option<i32>,
        exit_on_interrupt: Option<i32>,
        fail_spawn: Option<String>,
        fail_interrupt: bool,
        hold_spawn: bool,
        spawn_attempts: usize,
        interrupts: usize,
        kills: usize,
        spawned: Vec<EncoderCommand>,
        diagnostics: String,
    }

    #[derive(Clone, Default)]
    pub(crate) struct FakeHost {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeHost {
        /// Exits with 255 on interrupt, like ffmpeg after a Ctrl+C.
        pub(crate) fn new() -> Self {
            let host = FakeHost::default();
            host.set(|s| s.exit_on_interrupt = Some(255));
            host
        }

        fn set(&self, f: impl FnOnce(&mut FakeState)) {
            f(&mut self.state.lock().unwrap());
        }

        pub(crate) fn exit_on_interrupt(&self, code: Option<i32>) {
            self.set(|s| s.exit_on_interrupt = code);
        }

        pub(crate) fn fail_spawn(&self, message: &str) {
            let message = message.to_string();
            self.set(|s| s.fail_spawn = Some(message));
        }

        pub(crate) fn fail_interrupt(&self, fail: bool) {
            self.set(|s| s.fail_interrupt = fail);
        }

        /// Keep the next launch pending until released with `hold_spawn(false)`.
        pub(crate) fn hold_spawn(&self, hold: bool) {
            self.set(|s| s.hold_spawn = hold);
        }

        pub(crate) fn spawn_attempts(&self) -> usize {
            self.state.lock().unwrap().spawn_attempts
        }

        pub(crate) fn set_diagnostics(&self, text: &str) {
            let text = text.to_string();
            self.set(|s| s.diagnostics = text);
        }

        /// Make the running encoder exit on its own.
        pub(crate) fn finish(&self, code: i32) {
            self.set(|s| s.exit = Some(code));
        }

        pub(crate) fn interrupts(&self) -> usize {
            self.state.lock().unwrap().interrupts
        }

        pub(crate) fn kills(&self) -> usize {
            self.state.lock().unwrap().kills
        }

        pub(crate) fn spawned(&self) -> Vec<EncoderCommand> {
            self.state.lock().unwrap().spawned.clone()
        }
    }

    impl ProcessHost for FakeHost {
        fn start(&self, command: &EncoderCommand) -> io::Result<Box<dyn EncoderChild>> {
            self.set(|s| s.spawn_attempts += 1);
            while self.state.lock().unwrap().hold_spawn {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
            let mut state = self.state.lock().unwrap();
            if let Some(message) = &state.fail_spawn {
                return Err(io::Error::new(io::ErrorKind::NotFound, message.clone()));
            }
            state.exit = None;
            state.spawned.push(command.clone());
            Ok(Box::new(FakeChild {
                state: Arc::clone(&self.state),
            }))
        }

        fn interrupt(&self, _pid: u32) -> io::Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.fail_interrupt {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "Operation not permitted",
                ));
            }
            state.interrupts += 1;
            if let Some(code) = state.exit_on_interrupt {
                state.exit = Some(code);
            }
            Ok(())
        }
    }

    struct FakeChild {
        state: Arc<Mutex<FakeState>>,
    }

    impl EncoderChild for FakeChild {
        fn pid(&self) -> u32 {
            4242
        }

        fn try_wait(&mut self) -> io::Result<Option<ExitInfo>> {
            Ok(self.state.lock().unwrap().exit.map(ExitInfo::with_code))
        }

        fn kill(&mut self) -> io::Result<()> {
            let mut state = self.state.lock().unwrap();
            state.kills += 1;
            state.exit = Some(137);
            Ok(())
        }

        fn take_diagnostics(&mut self) -> String {
            self.state.lock().unwrap().diagnostics.clone()
        }
    }
}
