//! Configuration file handling for screen-recorder.
//!
//! Loads configuration from `<config dir>/screen-recorder/config.toml` or a custom
//! path. Every key is optional; command-line options override what is loaded here.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::{CaptureBackend, DEFAULT_ENCODER};
use crate::error::ConfigError;
use crate::geometry::Display;
use crate::settings::{
    default_output_path, AudioBitRate, AudioDevice, FrameRate, RecordingSettings, Resolution,
    NO_AUDIO_DEVICE,
};
use crate::supervisor::DEFAULT_STOP_TIMEOUT;

/// Configuration file structure for screen-recorder.
#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub hotkeys: HotkeyConfig,
    /// Known displays, in screen order
    #[serde(default)]
    pub displays: Vec<DisplayConfig>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct EncoderConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// Screen grabber; the platform's own when unset
    #[serde(default)]
    pub backend: Option<CaptureBackend>,
    /// Seconds to wait after a stop before killing the encoder, 0 waits forever
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            backend: None,
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct RecordingConfig {
    #[serde(default)]
    pub screen: usize,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub frame_rate: FrameRate,
    #[serde(default)]
    pub audio_device: Option<String>,
    #[serde(default)]
    pub audio_bit_rate: AudioBitRate,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct HotkeyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct DisplayConfig {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

fn default_true() -> bool {
    true
}

fn default_program() -> String {
    DEFAULT_ENCODER.to_string()
}

fn default_stop_timeout_secs() -> u64 {
    DEFAULT_STOP_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            source: e,
        })?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn backend(&self) -> CaptureBackend {
        self.encoder.backend.unwrap_or_default()
    }

    pub fn stop_timeout(&self) -> Option<Duration> {
        match self.encoder.stop_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Configured displays with their screen indices.
    pub fn displays(&self) -> Vec<Display> {
        self.displays
            .iter()
            .enumerate()
            .map(|(index, d)| Display {
                index,
                x: d.x,
                y: d.y,
                width: d.width,
                height: d.height,
            })
            .collect()
    }

    /// Recording settings before command-line overrides.
    pub fn recording_settings(&self) -> RecordingSettings {
        let r = &self.recording;
        RecordingSettings {
            screen_index: r.screen,
            resolution: r.resolution,
            frame_rate: r.frame_rate,
            audio_device: r
                .audio_device
                .as_deref()
                .map(AudioDevice::from)
                .unwrap_or_default(),
            audio_bit_rate: r.audio_bit_rate,
            output_path: Some(r.output.clone().unwrap_or_else(default_output_path)),
            region: None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("screen-recorder")
        .join("config.toml")
}

/// Write the commented default configuration to `path`.
///
/// Refuses to overwrite an existing file.
pub fn write_default(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    let write_err = |e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    std::fs::write(path, default_config_text()).map_err(write_err)?;
    log::info!("Created config file at {}", path.display());
    Ok(())
}

/// Contents written by `config init`.
pub fn default_config_text() -> String {
    format!(
        r#"# screen-recorder configuration

[encoder]
# Encoder executable, looked up on the search path
program = "{program}"
# Screen grabber: "gdigrab" (Windows) or "x11grab" (X11). Defaults to the platform's.
# backend = "x11grab"
# Seconds to wait for the encoder to finish after a stop before killing it (0 = forever)
stop_timeout_secs = {timeout}

[recording]
# Screen index (0 = first display)
screen = 0
# Full-screen capture size when no display geometry is configured
resolution = "{resolution}"
# Frames per second, 10 to 60
frame_rate = {fps}
# Audio input name from `screen-recorder list-devices`; "{none}" records video only
# audio_device = "{none}"
# One of 96k, 128k, 160k, 192k, 256k, 320k
audio_bit_rate = "{bitrate}"
# output = "/path/to/screen_recording.mp4"

[hotkeys]
# Press "s" anywhere to stop a recording
enabled = true

# Display layout in desktop coordinates, one table per screen
# [[displays]]
# x = 0
# y = 0
# width = 1920
# height = 1080
"#,
        program = DEFAULT_ENCODER,
        timeout = DEFAULT_STOP_TIMEOUT.as_secs(),
        resolution = Resolution::default(),
        fps = FrameRate::default(),
        none = NO_AUDIO_DEVICE,
        bitrate = AudioBitRate::default(),
    )
}
