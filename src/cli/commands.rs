//! Subcommand handlers for list-devices and config actions.

use std::path::Path;

use super::args::ConfigAction;
use crate::command::CaptureBackend;
use crate::config::{self, Config};
use crate::devices;
use crate::error::RecorderError;

/// List available audio inputs and print them to stdout.
pub fn list_devices(program: &str, backend: CaptureBackend) -> Result<(), RecorderError> {
    let devices = devices::list_audio_devices(program, backend)?;
    devices::print_devices(&devices);
    if devices.len() == 1 {
        println!();
        println!("No audio inputs found for {}.", backend);
    } else {
        println!();
        println!("Use --audio <name> to record one of them.");
    }
    Ok(())
}

/// Human-readable summary of the effective configuration.
pub fn describe_config(config: &Config) -> String {
    let settings = config.recording_settings();
    let mut lines = vec![
        "Current configuration:".to_string(),
        format!("  Encoder: {}", config.encoder.program),
        format!("  Backend: {}", config.backend()),
        format!(
            "  Stop timeout: {}",
            config
                .stop_timeout()
                .map(|t| format!("{}s", t.as_secs()))
                .unwrap_or_else(|| "none".to_string())
        ),
        format!("  Screen: {}", settings.screen_index),
        format!("  Resolution: {}", settings.resolution),
        format!("  Frame rate: {} fps", settings.frame_rate),
        format!("  Audio device: {}", settings.audio_device),
        format!("  Audio bit rate: {}", settings.audio_bit_rate),
    ];
    if let Some(output) = &settings.output_path {
        lines.push(format!("  Output: {}", output.display()));
    }
    lines.push(format!(
        "  Hotkeys: {}",
        if config.hotkeys.enabled { "yes" } else { "no" }
    ));
    for display in config.displays() {
        lines.push(format!("  {}", display));
    }
    lines.join("\n")
}

/// Handle config subcommand actions.
///
/// `path` is the `--config` override, if any.
pub fn handle_config_action(
    action: ConfigAction,
    path: Option<&Path>,
    config: &Config,
) -> Result<(), RecorderError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_path);

    match action {
        ConfigAction::Show => {
            println!("{}", describe_config(config));
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            config::write_default(&config_path)?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_default_config() {
        let text = describe_config(&Config::default());
        assert!(text.contains("Encoder: ffmpeg"));
        assert!(text.contains("Stop timeout: 10s"));
        assert!(text.contains("Frame rate: 30 fps"));
        assert!(text.contains("Audio device: None"));
        assert!(text.contains("Hotkeys: yes"));
    }

    #[test]
    fn test_init_then_init_again_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::default();

        handle_config_action(ConfigAction::Init, Some(&path), &config).unwrap();
        assert!(path.exists());
        assert!(matches!(
            handle_config_action(ConfigAction::Init, Some(&path), &config),
            Err(RecorderError::Config(_))
        ));
    }
}
