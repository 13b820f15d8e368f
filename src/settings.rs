//! Recording settings and their validated value types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::geometry::SelectedRegion;

/// Lowest frame rate accepted for screen capture.
pub const MIN_FRAME_RATE: u32 = 10;
/// Highest frame rate accepted for screen capture.
pub const MAX_FRAME_RATE: u32 = 60;

/// Audio device label meaning "record video only".
pub const NO_AUDIO_DEVICE: &str = "None";

/// Errors produced while validating settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid resolution format '{0}'. Use WIDTHxHEIGHT (e.g., 1920x1080)")]
    ResolutionFormat(String),

    #[error("Resolution width and height must be greater than 0")]
    ResolutionZero,

    #[error("Frame rate must be between 10 and 60 fps, got {0}")]
    FrameRateOutOfRange(u32),

    #[error("'{0}' is not a valid frame rate")]
    FrameRateFormat(String),

    #[error("Unknown audio bit rate '{0}'. Available: 96k, 128k, 160k, 192k, 256k, 320k")]
    BitRate(String),
}

/// Capture resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };

    /// Presets offered by the front-end.
    pub const PRESETS: [Resolution; 3] = [
        Resolution::FULL_HD,
        Resolution {
            width: 1280,
            height: 720,
        },
        Resolution {
            width: 640,
            height: 480,
        },
    ];
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once('x')
            .ok_or_else(|| SettingsError::ResolutionFormat(s.to_string()))?;
        let width: u32 = w
            .parse()
            .map_err(|_| SettingsError::ResolutionFormat(s.to_string()))?;
        let height: u32 = h
            .parse()
            .map_err(|_| SettingsError::ResolutionFormat(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(SettingsError::ResolutionZero);
        }
        Ok(Resolution { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = SettingsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.to_string()
    }
}

/// Capture frame rate, restricted to 10..=60 fps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct FrameRate(u32);

impl FrameRate {
    pub fn new(fps: u32) -> Result<Self, SettingsError> {
        if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&fps) {
            return Err(SettingsError::FrameRateOutOfRange(fps));
        }
        Ok(FrameRate(fps))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        FrameRate(30)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FrameRate {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fps: u32 = s
            .trim()
            .parse()
            .map_err(|_| SettingsError::FrameRateFormat(s.to_string()))?;
        FrameRate::new(fps)
    }
}

impl TryFrom<u32> for FrameRate {
    type Error = SettingsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        FrameRate::new(value)
    }
}

impl From<FrameRate> for u32 {
    fn from(f: FrameRate) -> Self {
        f.0
    }
}

/// AAC bit rate used when audio is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum AudioBitRate {
    #[default]
    #[value(name = "96k")]
    #[serde(rename = "96k")]
    K96,
    #[value(name = "128k")]
    #[serde(rename = "128k")]
    K128,
    #[value(name = "160k")]
    #[serde(rename = "160k")]
    K160,
    #[value(name = "192k")]
    #[serde(rename = "192k")]
    K192,
    #[value(name = "256k")]
    #[serde(rename = "256k")]
    K256,
    #[value(name = "320k")]
    #[serde(rename = "320k")]
    K320,
}

impl AudioBitRate {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioBitRate::K96 => "96k",
            AudioBitRate::K128 => "128k",
            AudioBitRate::K160 => "160k",
            AudioBitRate::K192 => "192k",
            AudioBitRate::K256 => "256k",
            AudioBitRate::K320 => "320k",
        }
    }
}

impl fmt::Display for AudioBitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioBitRate {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AudioBitRate::value_variants()
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SettingsError::BitRate(s.to_string()))
    }
}

/// Audio input selection. `None` records video only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AudioDevice {
    #[default]
    None,
    Named(String),
}

impl AudioDevice {
    pub fn is_enabled(&self) -> bool {
        matches!(self, AudioDevice::Named(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AudioDevice::None => None,
            AudioDevice::Named(name) => Some(name),
        }
    }
}

impl From<&str> for AudioDevice {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == NO_AUDIO_DEVICE {
            AudioDevice::None
        } else {
            AudioDevice::Named(s.to_string())
        }
    }
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioDevice::None => f.write_str(NO_AUDIO_DEVICE),
            AudioDevice::Named(name) => f.write_str(name),
        }
    }
}

/// Snapshot of the user's choices taken when a recording starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSettings {
    pub screen_index: usize,
    pub resolution: Resolution,
    pub frame_rate: FrameRate,
    pub audio_device: AudioDevice,
    pub audio_bit_rate: AudioBitRate,
    pub output_path: Option<PathBuf>,
    pub region: Option<SelectedRegion>,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            screen_index: 0,
            resolution: Resolution::default(),
            frame_rate: FrameRate::default(),
            audio_device: AudioDevice::None,
            audio_bit_rate: AudioBitRate::default(),
            output_path: Some(default_output_path()),
            region: None,
        }
    }
}

/// `<Downloads>/screen_recording.mp4`, falling back to the working directory.
pub fn default_output_path() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("screen_recording.mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        let r: Resolution = "1280x720".parse().unwrap();
        assert_eq!(r.width, 1280);
        assert_eq!(r.height, 720);
        assert_eq!(r.to_string(), "1280x720");
    }

    #[test]
    fn test_parse_resolution_invalid() {
        assert!(matches!(
            "1920".parse::<Resolution>(),
            Err(SettingsError::ResolutionFormat(_))
        ));
        assert!(matches!(
            "axb".parse::<Resolution>(),
            Err(SettingsError::ResolutionFormat(_))
        ));
        assert_eq!(
            "0x1080".parse::<Resolution>(),
            Err(SettingsError::ResolutionZero)
        );
    }

    #[test]
    fn test_frame_rate_bounds() {
        assert!(FrameRate::new(10).is_ok());
        assert!(FrameRate::new(60).is_ok());
        assert_eq!(
            FrameRate::new(9),
            Err(SettingsError::FrameRateOutOfRange(9))
        );
        assert_eq!(
            FrameRate::new(61),
            Err(SettingsError::FrameRateOutOfRange(61))
        );
        assert!(matches!(
            "fast".parse::<FrameRate>(),
            Err(SettingsError::FrameRateFormat(_))
        ));
    }

    #[test]
    fn test_bit_rate_parse_and_display() {
        let b: AudioBitRate = "192k".parse().unwrap();
        assert_eq!(b, AudioBitRate::K192);
        assert_eq!(b.to_string(), "192k");
        assert!("64k".parse::<AudioBitRate>().is_err());
    }

    #[test]
    fn test_audio_device_from_label() {
        assert_eq!(AudioDevice::from("None"), AudioDevice::None);
        assert_eq!(AudioDevice::from(""), AudioDevice::None);
        assert_eq!(
            AudioDevice::from("Microphone (Realtek Audio)"),
            AudioDevice::Named("Microphone (Realtek Audio)".to_string())
        );
        assert!(!AudioDevice::None.is_enabled());
        assert_eq!(AudioDevice::None.to_string(), "None");
    }

    #[test]
    fn test_default_settings() {
        let settings = RecordingSettings::default();
        assert_eq!(settings.screen_index, 0);
        assert_eq!(settings.resolution, Resolution::FULL_HD);
        assert_eq!(settings.frame_rate.get(), 30);
        assert_eq!(settings.audio_device, AudioDevice::None);
        assert!(settings
            .output_path
            .as_ref()
            .is_some_and(|p| p.ends_with("screen_recording.mp4")));
        assert!(settings.region.is_none());
    }
}
