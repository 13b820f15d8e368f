//! Terminal front-end for the session controller.
//!
//! Reads console commands from stdin, consumes background notifications from the
//! event channel, and redraws the recording indicator once a second. All decisions
//! are made by the [`SessionController`]; this loop only applies its effects.

use std::io::Write;
use std::str::FromStr;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cancel::StopSource;
use crate::controller::{CloseDecision, SessionController, UiEffect};
use crate::error::RecorderError;
use crate::events::{AppEvent, EventReceiver, SessionOutcome};
use crate::geometry::{Rect, SelectedRegion};
use crate::hotkeys::KeyListener;
use crate::settings::RecordingSettings;

const HELP: &str = "Commands:
  start                  start recording
  stop                   stop recording (or abort a selection)
  select                 begin selecting a region
  region X1 Y1 X2 Y2     finish the selection with two corners in desktop coordinates
  cancel                 abandon the selection
  full                   forget the selected region and record the whole screen
  status                 show the session state
  quit                   exit (waits for a running recording to be saved)";

/// A line typed at the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Select,
    Region((i32, i32), (i32, i32)),
    Cancel,
    Full,
    Status,
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err("empty command".to_string());
        };
        let command = match name.to_ascii_lowercase().as_str() {
            "start" | "record" => ConsoleCommand::Start,
            "stop" => ConsoleCommand::Stop,
            "select" => ConsoleCommand::Select,
            "region" => {
                let coords: Vec<i32> = words
                    .by_ref()
                    .map(|w| w.parse::<i32>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| "region needs four integers: X1 Y1 X2 Y2".to_string())?;
                let [x1, y1, x2, y2] = coords[..] else {
                    return Err("region needs four integers: X1 Y1 X2 Y2".to_string());
                };
                ConsoleCommand::Region((x1, y1), (x2, y2))
            }
            "cancel" => ConsoleCommand::Cancel,
            "full" => ConsoleCommand::Full,
            "status" => ConsoleCommand::Status,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            other => return Err(format!("unknown command '{}', type 'help'", other)),
        };
        if words.next().is_some() {
            return Err(format!("unexpected arguments after '{}'", name));
        }
        Ok(command)
    }
}

/// Format elapsed time as `hh:mm:ss`.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Front-end state around the controller.
pub struct Console {
    controller: SessionController,
    listener: KeyListener,
    settings: RecordingSettings,
    /// Set while the REC indicator is shown
    indicator: Option<Instant>,
    last_outcome: Option<SessionOutcome>,
    /// Leave once the first session has ended
    exit_after_session: bool,
}

impl Console {
    pub fn new(
        controller: SessionController,
        listener: KeyListener,
        settings: RecordingSettings,
    ) -> Self {
        Self {
            controller,
            listener,
            settings,
            indicator: None,
            last_outcome: None,
            exit_after_session: false,
        }
    }

    /// Exit after the first recording finishes instead of waiting for `quit`.
    pub fn exit_after_session(mut self, exit: bool) -> Self {
        self.exit_after_session = exit;
        self
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn last_outcome(&self) -> Option<&SessionOutcome> {
        self.last_outcome.as_ref()
    }

    /// Run a console command. Returns true when the loop should end.
    pub fn handle_command(&mut self, command: ConsoleCommand) -> bool {
        let result = match command {
            ConsoleCommand::Start => self.controller.start_recording(&self.settings),
            ConsoleCommand::Stop => self.controller.stop(StopSource::UserAction),
            ConsoleCommand::Select => Ok(self.controller.begin_region_selection()),
            ConsoleCommand::Region(start, end) => Ok(self.select_region(start, end)),
            ConsoleCommand::Cancel => Ok(self.controller.cancel_region_selection()),
            ConsoleCommand::Full => {
                self.controller.clear_region();
                Ok(vec![UiEffect::Info("Recording the full screen".to_string())])
            }
            ConsoleCommand::Status => Ok(vec![UiEffect::Info(self.status())]),
            ConsoleCommand::Help => Ok(vec![UiEffect::Info(HELP.to_string())]),
            ConsoleCommand::Quit => return self.close(),
        };
        self.apply_result(result)
    }

    /// Handle a notification from a background context.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Session { id, outcome } => {
                let effects = self.controller.handle_outcome(id, outcome.clone());
                if effects.is_empty() {
                    return false;
                }
                self.last_outcome = Some(outcome);
                let close = self.apply(effects);
                close || self.exit_after_session
            }
            AppEvent::StopFailed { id, message } => {
                let effects = self.controller.handle_stop_failure(id, message);
                self.apply(effects)
            }
            AppEvent::Key(key) => {
                let result = self.controller.handle_key(key);
                self.apply_result(result)
            }
            AppEvent::CloseRequested => self.close(),
        }
    }

    /// Redraw the indicator if a recording is running.
    pub fn tick(&self) {
        if let Some(started) = self.indicator {
            print!("\r\u{25cf} REC {}", format_duration(started.elapsed()));
            let _ = std::io::stdout().flush();
        }
    }

    fn select_region(&mut self, start: (i32, i32), end: (i32, i32)) -> Vec<UiEffect> {
        let mut effects = self.controller.begin_region_selection();
        let display = self
            .controller
            .display(self.settings.screen_index, &self.settings);
        let region = SelectedRegion::from_global(Rect::from_corners(start, end), &display);
        effects.extend(self.controller.complete_region_selection(region));
        effects
    }

    fn close(&mut self) -> bool {
        let (decision, effects) = self.controller.request_close();
        if decision == CloseDecision::Deferred {
            println!("\nWaiting for the recording to be saved before exiting...");
        }
        self.apply(effects)
    }

    fn status(&self) -> String {
        let mut status = format!("State: {}", self.controller.state());
        if let Some(started) = self.indicator {
            status.push_str(&format!(", elapsed {}", format_duration(started.elapsed())));
        }
        if let Some(region) = self.controller.region() {
            status.push_str(&format!(", region {}", region.global));
        }
        status
    }

    fn apply_result(&mut self, result: Result<Vec<UiEffect>, RecorderError>) -> bool {
        match result {
            Ok(effects) => self.apply(effects),
            Err(e) => self.apply(vec![UiEffect::Error(e.to_string())]),
        }
    }

    /// Apply effects in order. Returns true if one of them closes the application.
    fn apply(&mut self, effects: Vec<UiEffect>) -> bool {
        let mut close = false;
        for effect in effects {
            match effect {
                UiEffect::DisableControls | UiEffect::EnableControls => {
                    log::debug!("{:?}", effect);
                }
                UiEffect::Minimize => log::debug!("Front-end hidden during capture"),
                UiEffect::Restore => log::debug!("Front-end restored"),
                UiEffect::StartIndicator => {
                    self.indicator = Some(Instant::now());
                    self.tick();
                }
                UiEffect::StopIndicator => {
                    if self.indicator.take().is_some() {
                        println!();
                    }
                }
                UiEffect::StartKeyListener => {
                    if let Err(e) = self.listener.start() {
                        log::error!("Failed to start the global key listener: {}", e);
                    } else {
                        println!("Press 's' anywhere to stop the recording.");
                    }
                }
                UiEffect::StopKeyListener => self.listener.stop(),
                UiEffect::Info(message) => println!("{}", message),
                UiEffect::Error(message) => eprintln!("Error: {}", message),
                UiEffect::Close => close = true,
            }
        }
        close
    }

    fn shutdown(&mut self) {
        self.listener.stop();
        self.controller.join();
    }
}

/// Async main event loop using tokio::select! for concurrent handling.
///
/// This loop handles three concurrent concerns:
/// 1. Console commands typed on stdin
/// 2. Session outcomes, global keys and close requests from the event channel
/// 3. The once-a-second recording indicator
///
/// Returns the outcome of the last recording, if any.
pub async fn run(
    mut console: Console,
    mut events: EventReceiver,
    start_immediately: bool,
) -> Option<SessionOutcome> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut indicator = tokio::time::interval(Duration::from_secs(1));
    indicator.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    if start_immediately {
        if console.handle_command(ConsoleCommand::Start) {
            console.shutdown();
            return console.last_outcome;
        }
        if console.controller().state() == crate::session::SessionState::Idle {
            // The start was refused; there is nothing to wait for
            console.shutdown();
            return console.last_outcome;
        }
    } else {
        println!("{}", HELP);
    }

    loop {
        let done = tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => false,
                Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                    Ok(command) => console.handle_command(command),
                    Err(message) => {
                        eprintln!("{}", message);
                        false
                    }
                },
                Ok(None) => {
                    stdin_open = false;
                    // End of input closes the console; a one-shot recording runs on
                    if start_immediately {
                        false
                    } else {
                        console.handle_event(AppEvent::CloseRequested)
                    }
                }
                Err(e) => {
                    log::error!("Failed to read console input: {}", e);
                    stdin_open = false;
                    console.handle_event(AppEvent::CloseRequested)
                }
            },

            event = events.recv() => match event {
                Some(event) => console.handle_event(event),
                None => true,
            },

            _ = indicator.tick() => {
                console.tick();
                false
            }
        };

        if done {
            break;
        }
    }

    console.shutdown();
    console.last_outcome
}
