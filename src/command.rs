//! Encoder command construction.
//!
//! Builds the ordered ffmpeg argument list for a recording. The builder is pure:
//! the same settings and geometry always produce the same arguments.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::geometry::CaptureGeometry;
use crate::settings::RecordingSettings;

/// Default encoder executable, looked up on the search path.
pub const DEFAULT_ENCODER: &str = "ffmpeg";

/// X server used when `DISPLAY` is unset.
pub const DEFAULT_X_DISPLAY: &str = ":0.0";

/// Screen and audio grabbers understood by ffmpeg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureBackend {
    /// Windows desktop via gdigrab, audio via DirectShow
    Gdigrab,
    /// X11 display via x11grab, audio via PulseAudio
    X11grab,
}

impl CaptureBackend {
    /// Backend for the platform this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            CaptureBackend::Gdigrab
        } else {
            CaptureBackend::X11grab
        }
    }

    /// ffmpeg input format used for audio devices on this backend.
    pub fn audio_format(self) -> &'static str {
        match self {
            CaptureBackend::Gdigrab => "dshow",
            CaptureBackend::X11grab => "pulse",
        }
    }

    fn screen_input_args(
        self,
        x_display: &str,
        frame_rate: u32,
        geometry: &CaptureGeometry,
    ) -> Vec<String> {
        match self {
            CaptureBackend::Gdigrab => vec![
                "-f".to_string(),
                "gdigrab".to_string(),
                "-framerate".to_string(),
                frame_rate.to_string(),
                "-video_size".to_string(),
                geometry.video_size(),
                "-offset_x".to_string(),
                geometry.offset_x.to_string(),
                "-offset_y".to_string(),
                geometry.offset_y.to_string(),
                "-i".to_string(),
                "desktop".to_string(),
            ],
            CaptureBackend::X11grab => {
                // The X root window starts at 0,0
                if geometry.offset_x < 0 || geometry.offset_y < 0 {
                    log::warn!(
                        "x11grab cannot capture at {},{}, clamping to the root window",
                        geometry.offset_x,
                        geometry.offset_y
                    );
                }
                vec![
                    "-f".to_string(),
                    "x11grab".to_string(),
                    "-framerate".to_string(),
                    frame_rate.to_string(),
                    "-video_size".to_string(),
                    geometry.video_size(),
                    "-i".to_string(),
                    format!(
                        "{}+{},{}",
                        x_display,
                        geometry.offset_x.max(0),
                        geometry.offset_y.max(0)
                    ),
                ]
            }
        }
    }

    fn audio_input_args(self, device: &str) -> Vec<String> {
        let input = match self {
            CaptureBackend::Gdigrab => format!("audio={}", device),
            CaptureBackend::X11grab => device.to_string(),
        };
        vec![
            "-f".to_string(),
            self.audio_format().to_string(),
            "-i".to_string(),
            input,
        ]
    }
}

impl Default for CaptureBackend {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for CaptureBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureBackend::Gdigrab => f.write_str("gdigrab"),
            CaptureBackend::X11grab => f.write_str("x11grab"),
        }
    }
}

/// Where the screen is grabbed from.
///
/// Resolved once at start-up so that building a command never consults the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSource {
    pub backend: CaptureBackend,
    /// X server display name, only used by x11grab
    pub x_display: String,
}

impl CaptureSource {
    pub fn new(backend: CaptureBackend) -> Self {
        Self {
            backend,
            x_display: DEFAULT_X_DISPLAY.to_string(),
        }
    }

    pub fn with_x_display(mut self, x_display: impl Into<String>) -> Self {
        self.x_display = x_display.into();
        self
    }

    /// Take the X display from `DISPLAY`.
    pub fn from_env(backend: CaptureBackend) -> Self {
        match std::env::var("DISPLAY") {
            Ok(display) if !display.is_empty() => Self::new(backend).with_x_display(display),
            _ => Self::new(backend),
        }
    }
}

impl Default for CaptureSource {
    fn default() -> Self {
        Self::new(CaptureBackend::default())
    }
}

/// A fully built encoder invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    program: String,
    args: Vec<String>,
}

impl EncoderCommand {
    /// Wrap an arbitrary invocation. Used for probes and by tests.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// True if `window` appears as consecutive arguments.
    pub fn contains_sequence(&self, window: &[&str]) -> bool {
        !window.is_empty()
            && self
                .args
                .windows(window.len())
                .any(|w| w.iter().zip(window).all(|(a, b)| a == b))
    }
}

impl fmt::Display for EncoderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Assemble the encoder command for one recording.
///
/// `output` is the destination file; it is always overwritten.
pub fn build(
    program: &str,
    source: &CaptureSource,
    settings: &RecordingSettings,
    geometry: &CaptureGeometry,
    output: &str,
) -> EncoderCommand {
    let backend = source.backend;
    let mut args =
        backend.screen_input_args(&source.x_display, settings.frame_rate.get(), geometry);

    let audio = settings.audio_device.name();
    if let Some(device) = audio {
        args.extend(backend.audio_input_args(device));
    }

    // Fastest preset keeps the encoder from starving the grabber
    args.extend(
        ["-vcodec", "libx264", "-pix_fmt", "yuv420p", "-preset", "ultrafast"]
            .iter()
            .map(|s| s.to_string()),
    );

    if audio.is_some() {
        args.extend([
            "-acodec".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            settings.audio_bit_rate.to_string(),
        ]);
    }

    args.push("-y".to_string());
    args.push(output.to_string());

    EncoderCommand::new(program, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AudioBitRate, AudioDevice};

    fn geometry() -> CaptureGeometry {
        CaptureGeometry {
            offset_x: 0,
            offset_y: 0,
            width: 1920,
            height: 1080,
        }
    }

    fn build_gdi(settings: &RecordingSettings) -> EncoderCommand {
        build(
            DEFAULT_ENCODER,
            &CaptureSource::new(CaptureBackend::Gdigrab),
            settings,
            &geometry(),
            "/tmp/out.mp4",
        )
    }

    #[test]
    fn test_video_only_command() {
        let cmd = build_gdi(&RecordingSettings::default());
        assert_eq!(cmd.program(), "ffmpeg");
        assert!(cmd.contains_sequence(&[
            "-framerate",
            "30",
            "-video_size",
            "1920x1080",
            "-offset_x",
            "0",
            "-offset_y",
            "0"
        ]));
        assert!(cmd.contains_sequence(&["-i", "desktop"]));
        assert!(cmd.args().ends_with(&["-y".to_string(), "/tmp/out.mp4".to_string()]));
        assert!(!cmd.args().iter().any(|a| a == "-acodec" || a == "-b:a" || a == "dshow"));
    }

    #[test]
    fn test_audio_stages_present_once() {
        let settings = RecordingSettings {
            audio_device: AudioDevice::Named("Microphone Array".to_string()),
            audio_bit_rate: AudioBitRate::K256,
            ..RecordingSettings::default()
        };
        let cmd = build_gdi(&settings);
        assert!(cmd.contains_sequence(&["-f", "dshow", "-i", "audio=Microphone Array"]));
        assert!(cmd.contains_sequence(&["-acodec", "aac", "-b:a", "256k"]));
        assert_eq!(cmd.args().iter().filter(|a| *a == "dshow").count(), 1);
        assert_eq!(cmd.args().iter().filter(|a| *a == "-acodec").count(), 1);
    }

    #[test]
    fn test_video_codec_always_fast() {
        let cmd = build_gdi(&RecordingSettings::default());
        assert!(cmd.contains_sequence(&[
            "-vcodec",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-preset",
            "ultrafast"
        ]));
    }

    #[test]
    fn test_build_is_deterministic() {
        let settings = RecordingSettings {
            audio_device: AudioDevice::Named("Mic".to_string()),
            ..RecordingSettings::default()
        };
        assert_eq!(build_gdi(&settings), build_gdi(&settings));
    }

    #[test]
    fn test_x11grab_puts_offset_in_input() {
        let geometry = CaptureGeometry {
            offset_x: 100,
            offset_y: 50,
            width: 202,
            height: 202,
        };
        let settings = RecordingSettings {
            audio_device: AudioDevice::Named("default".to_string()),
            ..RecordingSettings::default()
        };
        let source = CaptureSource::new(CaptureBackend::X11grab).with_x_display(":1");
        let cmd = build("ffmpeg", &source, &settings, &geometry, "out.mp4");
        assert!(cmd.contains_sequence(&["-i", ":1+100,50"]));
        assert!(cmd.contains_sequence(&["-video_size", "202x202"]));
        assert!(cmd.contains_sequence(&["-f", "pulse", "-i", "default"]));
        assert!(!cmd.args().iter().any(|a| a == "-offset_x"));
    }

    #[test]
    fn test_x11grab_ignores_environment() {
        let source = CaptureSource::new(CaptureBackend::X11grab);
        let settings = RecordingSettings::default();
        let first = build("ffmpeg", &source, &settings, &geometry(), "out.mp4");
        std::env::set_var("DISPLAY", ":7");
        let second = build("ffmpeg", &source, &settings, &geometry(), "out.mp4");
        assert_eq!(first, second);
        assert!(second.contains_sequence(&["-i", ":0.0+0,0"]));
    }

    #[test]
    fn test_x11grab_clamps_negative_offsets() {
        let geometry = CaptureGeometry {
            offset_x: -1280,
            offset_y: -20,
            width: 1280,
            height: 720,
        };
        let source = CaptureSource::new(CaptureBackend::X11grab);
        let cmd = build("ffmpeg", &source, &RecordingSettings::default(), &geometry, "out.mp4");
        assert!(cmd.contains_sequence(&["-i", ":0.0+0,0"]));
        assert!(!cmd.args().iter().any(|a| a.contains("+-")));
    }

    #[test]
    fn test_display_quotes_spaces() {
        let cmd = EncoderCommand::new(
            "ffmpeg",
            vec!["-i".to_string(), "audio=Line In".to_string()],
        );
        assert_eq!(cmd.to_string(), "ffmpeg -i \"audio=Line In\"");
    }
}
