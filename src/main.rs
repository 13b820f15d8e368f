use std::sync::Arc;

use clap::Parser;

use screen_recorder::cli::{self, Args, Command};
use screen_recorder::command::CaptureSource;
use screen_recorder::config::Config;
use screen_recorder::controller::SessionController;
use screen_recorder::devices;
use screen_recorder::error::RecorderError;
use screen_recorder::event_loop::{self, Console};
use screen_recorder::events::{self, SessionOutcome};
use screen_recorder::geometry::SelectedRegion;
use screen_recorder::hotkeys::KeyListener;
use screen_recorder::pipeline::{setup_ctrlc_handler, SystemHost};
use screen_recorder::supervisor::Supervisor;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Exit explicitly: a pending stdin read would otherwise hold up runtime shutdown
    match run(args).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when a one-shot recording failed.
async fn run(args: Args) -> Result<bool, RecorderError> {
    let config = Config::load(args.config.as_deref())?;

    // Encoder: CLI > config > default
    let program = args
        .recording
        .encoder
        .clone()
        .unwrap_or_else(|| config.encoder.program.clone());
    let backend = args.recording.backend.unwrap_or_else(|| config.backend());

    let one_shot = match args.command {
        Some(Command::ListDevices) => {
            cli::list_devices(&program, backend)?;
            return Ok(true);
        }
        Some(Command::Config { action }) => {
            cli::handle_config_action(action, args.config.as_deref(), &config)?;
            return Ok(true);
        }
        Some(Command::Record) => true,
        None => false,
    };

    devices::probe_encoder(&program)?;

    let (tx, rx) = events::channel();
    if let Err(e) = setup_ctrlc_handler(tx.clone()) {
        log::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let supervisor =
        Supervisor::new(Arc::new(SystemHost), tx.clone()).with_stop_timeout(config.stop_timeout());
    let mut controller = SessionController::new(supervisor, config.displays())
        .with_program(program)
        .with_source(CaptureSource::from_env(backend))
        .with_hotkeys(config.hotkeys.enabled && !args.recording.no_hotkeys);

    // Settings: CLI > config > built-in defaults
    let mut settings = config.recording_settings();
    args.recording.apply_to(&mut settings);
    if let Some(rect) = args.recording.region {
        let display = controller.display(settings.screen_index, &settings);
        controller.set_region(SelectedRegion::from_global(rect, &display));
    }
    log::debug!("Recording settings: {:?}", settings);

    let console = Console::new(controller, KeyListener::new(tx), settings).exit_after_session(one_shot);
    let outcome = event_loop::run(console, rx, one_shot).await;

    Ok(!(one_shot && !matches!(outcome, Some(SessionOutcome::Completed))))
}
