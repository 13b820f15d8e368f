//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::command::CaptureBackend;
use crate::geometry::Rect;
use crate::settings::{AudioBitRate, AudioDevice, FrameRate, RecordingSettings, Resolution};

/// Screen recorder driving ffmpeg, with a console front-end and a global stop key
#[derive(Parser, Debug)]
#[command(name = "screen-recorder")]
#[command(version, about = "Record the screen and microphone with ffmpeg", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Interactive console
    screen-recorder

    # Record the second screen at 60 fps straight away
    screen-recorder record --screen 1 --framerate 60

    # Record a region with a microphone
    screen-recorder record --region 100,50,900,650 --audio \"Microphone (USB)\" --bitrate 192k

    # List audio inputs
    screen-recorder list-devices")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub recording: RecordingArgs,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

/// Options that override the `[recording]` and `[encoder]` config sections.
#[derive(clap::Args, Debug, Default)]
pub struct RecordingArgs {
    /// Screen index (0 = first display)
    #[arg(long, global = true)]
    pub screen: Option<usize>,

    /// Full-screen capture size, WIDTHxHEIGHT
    #[arg(long, global = true)]
    pub resolution: Option<Resolution>,

    /// Frames per second (10-60)
    #[arg(long, short = 'r', global = true)]
    pub framerate: Option<FrameRate>,

    /// Audio input name from list-devices, or "None"
    #[arg(long, short, global = true)]
    pub audio: Option<String>,

    /// Audio bit rate
    #[arg(long, short, value_enum, global = true)]
    pub bitrate: Option<AudioBitRate>,

    /// Output file
    #[arg(long, short, global = true)]
    pub output: Option<PathBuf>,

    /// Capture region as two desktop corners: X1,Y1,X2,Y2
    #[arg(long, value_parser = parse_region, allow_hyphen_values = true, global = true)]
    pub region: Option<Rect>,

    /// Screen grabber
    #[arg(long, value_enum, global = true)]
    pub backend: Option<CaptureBackend>,

    /// Encoder executable
    #[arg(long, global = true)]
    pub encoder: Option<String>,

    /// Do not listen for the global stop key
    #[arg(long, global = true)]
    pub no_hotkeys: bool,
}

impl RecordingArgs {
    /// Apply the options that were given on top of `settings`.
    ///
    /// The region is not applied here; it needs the display it lies on.
    pub fn apply_to(&self, settings: &mut RecordingSettings) {
        if let Some(screen) = self.screen {
            settings.screen_index = screen;
        }
        if let Some(resolution) = self.resolution {
            settings.resolution = resolution;
        }
        if let Some(frame_rate) = self.framerate {
            settings.frame_rate = frame_rate;
        }
        if let Some(audio) = &self.audio {
            settings.audio_device = AudioDevice::from(audio.as_str());
        }
        if let Some(bit_rate) = self.bitrate {
            settings.audio_bit_rate = bit_rate;
        }
        if let Some(output) = &self.output {
            settings.output_path = Some(output.clone());
        }
    }
}

/// Parse `X1,Y1,X2,Y2` into a normalized rectangle.
fn parse_region(s: &str) -> Result<Rect, String> {
    let coords: Vec<i32> = s
        .split(',')
        .map(|part| part.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("'{}' is not X1,Y1,X2,Y2", s))?;
    match coords[..] {
        [x1, y1, x2, y2] => Ok(Rect::from_corners((x1, y1), (x2, y2))),
        _ => Err(format!("'{}' is not X1,Y1,X2,Y2", s)),
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start recording immediately and exit when it ends
    Record,
    /// List audio input devices
    ListDevices,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["screen-recorder"]);
        assert!(args.command.is_none());
        assert!(args.config.is_none());
        assert!(args.recording.screen.is_none());
        assert!(args.recording.framerate.is_none());
        assert!(args.recording.region.is_none());
        assert!(!args.recording.no_hotkeys);
    }

    #[test]
    fn test_args_recording_options() {
        let args = Args::parse_from([
            "screen-recorder",
            "record",
            "--screen",
            "1",
            "--resolution",
            "1280x720",
            "--framerate",
            "60",
            "--audio",
            "Microphone (USB)",
            "--bitrate",
            "192k",
            "--output",
            "/tmp/out.mp4",
        ]);
        assert!(matches!(args.command, Some(Command::Record)));

        let mut settings = RecordingSettings::default();
        args.recording.apply_to(&mut settings);
        assert_eq!(settings.screen_index, 1);
        assert_eq!(settings.resolution.to_string(), "1280x720");
        assert_eq!(settings.frame_rate.get(), 60);
        assert_eq!(
            settings.audio_device,
            AudioDevice::Named("Microphone (USB)".to_string())
        );
        assert_eq!(settings.audio_bit_rate, AudioBitRate::K192);
        assert_eq!(settings.output_path, Some(PathBuf::from("/tmp/out.mp4")));
    }

    #[test]
    fn test_args_framerate_out_of_range() {
        assert!(Args::try_parse_from(["screen-recorder", "--framerate", "5"]).is_err());
        assert!(Args::try_parse_from(["screen-recorder", "--framerate", "61"]).is_err());
    }

    #[test]
    fn test_args_bad_bitrate() {
        assert!(Args::try_parse_from(["screen-recorder", "--bitrate", "100k"]).is_err());
    }

    #[test]
    fn test_args_region() {
        let args = Args::parse_from(["screen-recorder", "--region", "301,251,100,50"]);
        assert_eq!(args.recording.region, Some(Rect::new(100, 50, 201, 201)));

        let args = Args::parse_from(["screen-recorder", "--region", "-1280,0,-640,480"]);
        assert_eq!(args.recording.region, Some(Rect::new(-1280, 0, 640, 480)));

        assert!(Args::try_parse_from(["screen-recorder", "--region", "1,2,3"]).is_err());
    }

    #[test]
    fn test_args_backend() {
        let args = Args::parse_from(["screen-recorder", "--backend", "gdigrab"]);
        assert_eq!(args.recording.backend, Some(CaptureBackend::Gdigrab));
    }

    #[test]
    fn test_args_no_audio() {
        let args = Args::parse_from(["screen-recorder", "--audio", "None"]);
        let mut settings = RecordingSettings::default();
        args.recording.apply_to(&mut settings);
        assert_eq!(settings.audio_device, AudioDevice::None);
    }

    #[test]
    fn test_args_config_option() {
        let args = Args::parse_from(["screen-recorder", "--config", "/tmp/config.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));

        let args = Args::parse_from(["screen-recorder", "config", "show", "-c", "/tmp/test.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
    }

    #[test]
    fn test_args_list_devices_subcommand() {
        let args = Args::parse_from(["screen-recorder", "list-devices"]);
        assert!(matches!(args.command, Some(Command::ListDevices)));
    }

    #[test]
    fn test_args_config_init_subcommand() {
        let args = Args::parse_from(["screen-recorder", "config", "init"]);
        assert!(matches!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init
            })
        ));
    }
}
