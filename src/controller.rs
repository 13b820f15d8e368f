//! Session controller.
//!
//! Glues geometry, command building, supervision, stop fan-in and the state
//! machine together. Every operation runs on the front-end's context and answers
//! with the [`UiEffect`]s the front-end should apply, in order.

use crate::cancel::{StopSource, StopToken};
use crate::command::{self, CaptureBackend, CaptureSource, DEFAULT_ENCODER};
use crate::error::RecorderError;
use crate::events::{SessionId, SessionOutcome};
use crate::geometry::{self, Display, SelectedRegion};
use crate::hotkeys::GlobalKey;
use crate::session::{SessionState, SessionStateMachine};
use crate::settings::RecordingSettings;
use crate::supervisor::Supervisor;

/// Something the front-end should do in response to a controller operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    DisableControls,
    EnableControls,
    /// Get out of the way of the captured area
    Minimize,
    Restore,
    /// Show the REC indicator and start its timer
    StartIndicator,
    StopIndicator,
    StartKeyListener,
    StopKeyListener,
    Info(String),
    Error(String),
    /// Close the application
    Close,
}

/// Answer to a close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    /// Close now
    Accept,
    /// A recording is being stopped; the close completes with its outcome
    Deferred,
    /// The recording could not be stopped; stay open
    Rejected,
}

pub struct SessionController {
    machine: SessionStateMachine,
    supervisor: Supervisor,
    displays: Vec<Display>,
    program: String,
    source: CaptureSource,
    hotkeys: bool,
    /// Session whose outcome we are waiting for
    session: Option<SessionId>,
    stop_token: StopToken,
    close_pending: bool,
    /// Interactive selection for the next recording, used when the settings
    /// carry none. Consumed by the recording that uses it.
    region: Option<SelectedRegion>,
}

impl SessionController {
    pub fn new(supervisor: Supervisor, displays: Vec<Display>) -> Self {
        Self {
            machine: SessionStateMachine::new(),
            supervisor,
            displays,
            program: DEFAULT_ENCODER.to_string(),
            source: CaptureSource::default(),
            hotkeys: true,
            session: None,
            stop_token: StopToken::new(),
            close_pending: false,
            region: None,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_backend(mut self, backend: CaptureBackend) -> Self {
        self.source.backend = backend;
        self
    }

    pub fn with_source(mut self, source: CaptureSource) -> Self {
        self.source = source;
        self
    }

    /// Enable or disable the global key listener for recordings.
    pub fn with_hotkeys(mut self, enabled: bool) -> Self {
        self.hotkeys = enabled;
        self
    }

    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    pub fn machine(&self) -> &SessionStateMachine {
        &self.machine
    }

    pub fn region(&self) -> Option<&SelectedRegion> {
        self.region.as_ref()
    }

    pub fn close_pending(&self) -> bool {
        self.close_pending
    }

    /// The display for `index`, or one synthesized at the origin with the
    /// configured resolution when the index is unknown.
    pub fn display(&self, index: usize, settings: &RecordingSettings) -> Display {
        self.displays
            .iter()
            .find(|d| d.index == index)
            .copied()
            .unwrap_or(Display {
                index,
                x: 0,
                y: 0,
                width: settings.resolution.width,
                height: settings.resolution.height,
            })
    }

    pub fn begin_region_selection(&mut self) -> Vec<UiEffect> {
        if !self.machine.begin_selection() {
            return Vec::new();
        }
        vec![UiEffect::DisableControls, UiEffect::Minimize]
    }

    /// Store the dragged region for the next recording.
    ///
    /// A click without a drag clears the selection so the whole screen is captured.
    pub fn complete_region_selection(&mut self, region: SelectedRegion) -> Vec<UiEffect> {
        if !self.machine.end_selection() {
            return Vec::new();
        }
        let message = if region.global.is_degenerate() {
            self.region = None;
            "Empty selection, recording the full screen".to_string()
        } else {
            self.region = Some(region);
            format!("Selected region {}", region.global)
        };
        vec![
            UiEffect::Restore,
            UiEffect::EnableControls,
            UiEffect::Info(message),
        ]
    }

    pub fn cancel_region_selection(&mut self) -> Vec<UiEffect> {
        if !self.machine.end_selection() {
            return Vec::new();
        }
        vec![UiEffect::Restore, UiEffect::EnableControls]
    }

    /// Use `region` for the next recording whose settings carry none.
    pub fn set_region(&mut self, region: SelectedRegion) {
        self.region = Some(region);
    }

    /// Forget the selected region.
    pub fn clear_region(&mut self) {
        self.region = None;
    }

    /// Launch the encoder for `settings`.
    ///
    /// A launch failure is not an error here; it arrives later as a failed outcome.
    pub fn start_recording(
        &mut self,
        settings: &RecordingSettings,
    ) -> Result<Vec<UiEffect>, RecorderError> {
        if self.machine.is_active() || self.supervisor.is_running() {
            return Err(RecorderError::AlreadyRunning);
        }
        if !self.machine.can_start() {
            log::debug!("Ignoring start while {}", self.machine.state());
            return Ok(Vec::new());
        }
        let output = settings
            .output_path
            .as_ref()
            .ok_or(RecorderError::NoOutputSelected)?;

        let display = self.display(settings.screen_index, settings);
        let selected = self.region.take();
        let region = settings.region.as_ref().or(selected.as_ref());
        let geometry = geometry::resolve(region, &display);
        let command = command::build(
            &self.program,
            &self.source,
            settings,
            &geometry,
            &output.to_string_lossy(),
        );

        let id = self.supervisor.start(command)?;
        self.session = Some(id);
        self.stop_token.reset();
        self.machine.begin_recording();

        let mut effects = vec![
            UiEffect::DisableControls,
            UiEffect::Minimize,
            UiEffect::StartIndicator,
        ];
        if self.hotkeys {
            effects.push(UiEffect::StartKeyListener);
        }
        effects.push(UiEffect::Info(format!(
            "Recording {} to {}",
            geometry.video_size(),
            output.display()
        )));
        Ok(effects)
    }

    /// Route a stop trigger to the supervisor.
    ///
    /// During a selection this cancels it. Only the first trigger of a session
    /// reaches the encoder; later ones are no-ops.
    pub fn stop(&mut self, source: StopSource) -> Result<Vec<UiEffect>, RecorderError> {
        match self.machine.state() {
            SessionState::SelectingRegion => Ok(self.cancel_region_selection()),
            SessionState::Recording => {
                if !self.stop_token.trigger(source) {
                    log::debug!("Stop from {} ignored, already stopping", source);
                    return Ok(Vec::new());
                }
                match self.supervisor.stop() {
                    Ok(sent) => {
                        if !sent {
                            // The encoder is already on its way out
                            return Ok(Vec::new());
                        }
                        self.machine.begin_stopping();
                        log::info!("Stopping recording ({})", source);
                        Ok(vec![UiEffect::Info("Stopping recording...".to_string())])
                    }
                    Err(e) => {
                        self.stop_token.reset();
                        Err(e)
                    }
                }
            }
            state => {
                log::debug!("Stop from {} ignored while {}", source, state);
                Ok(Vec::new())
            }
        }
    }

    pub fn handle_key(&mut self, key: GlobalKey) -> Result<Vec<UiEffect>, RecorderError> {
        if key.stops_recording() {
            return self.stop(StopSource::Hotkey);
        }
        log::info!("Key '{}' pressed", key.name());
        Ok(Vec::new())
    }

    /// Decide whether the application may close.
    pub fn request_close(&mut self) -> (CloseDecision, Vec<UiEffect>) {
        match self.machine.state() {
            SessionState::Idle => (CloseDecision::Accept, vec![UiEffect::Close]),
            SessionState::SelectingRegion => {
                let mut effects = self.cancel_region_selection();
                effects.push(UiEffect::Close);
                (CloseDecision::Accept, effects)
            }
            SessionState::Stopping => {
                self.close_pending = true;
                (CloseDecision::Deferred, Vec::new())
            }
            SessionState::Recording => {
                self.close_pending = true;
                match self.stop(StopSource::WindowClose) {
                    Ok(effects) => (CloseDecision::Deferred, effects),
                    Err(e) => {
                        self.close_pending = false;
                        (CloseDecision::Rejected, vec![UiEffect::Error(e.to_string())])
                    }
                }
            }
        }
    }

    /// Apply a session's terminal notification.
    pub fn handle_outcome(&mut self, id: SessionId, outcome: SessionOutcome) -> Vec<UiEffect> {
        if self.session != Some(id) {
            log::debug!("Ignoring outcome of stale session {}", id);
            return Vec::new();
        }
        self.session = None;
        self.machine.finish();

        let message = match &outcome {
            SessionOutcome::Completed => UiEffect::Info(outcome.to_string()),
            SessionOutcome::Failed(_) => UiEffect::Error(outcome.to_string()),
        };
        let mut effects = vec![
            UiEffect::StopIndicator,
            UiEffect::StopKeyListener,
            UiEffect::Restore,
            UiEffect::EnableControls,
            message,
        ];
        if std::mem::take(&mut self.close_pending) {
            effects.push(UiEffect::Close);
        }
        effects
    }

    /// A stop that raced the encoder's launch could not be delivered.
    ///
    /// The recording is still running: go back to `Recording` so the stop can be
    /// retried, and drop any close that was waiting on it.
    pub fn handle_stop_failure(&mut self, id: SessionId, message: String) -> Vec<UiEffect> {
        if self.session != Some(id) {
            log::debug!("Ignoring stop failure of stale session {}", id);
            return Vec::new();
        }
        if !self.machine.resume_recording() {
            return Vec::new();
        }
        self.stop_token.reset();
        self.close_pending = false;
        vec![UiEffect::Error(message)]
    }

    /// Wait for the current monitor thread to exit.
    pub fn join(&mut self) {
        self.supervisor.join();
    }
}
