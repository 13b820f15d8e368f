//! Integration tests from recorded settings to the encoder argument list.

use screen_recorder::command::{self, CaptureBackend, CaptureSource};
use screen_recorder::config::Config;
use screen_recorder::geometry::{self, Display, Rect, SelectedRegion};
use screen_recorder::settings::{AudioBitRate, AudioDevice, FrameRate, RecordingSettings};
use std::io::Write;
use tempfile::NamedTempFile;

fn primary() -> Display {
    Display {
        index: 0,
        x: 0,
        y: 0,
        width: 1920,
        height: 1080,
    }
}

#[test]
fn test_full_screen_video_only() {
    let settings = RecordingSettings {
        frame_rate: FrameRate::new(30).unwrap(),
        output_path: Some("out.mp4".into()),
        ..RecordingSettings::default()
    };
    let geometry = geometry::resolve(None, &primary());
    let cmd = command::build(
        "ffmpeg",
        &CaptureSource::new(CaptureBackend::Gdigrab),
        &settings,
        &geometry,
        "out.mp4",
    );

    let expected: Vec<String> = [
        "-f", "gdigrab", "-framerate", "30", "-video_size", "1920x1080", "-offset_x", "0",
        "-offset_y", "0", "-i", "desktop", "-vcodec", "libx264", "-pix_fmt", "yuv420p",
        "-preset", "ultrafast", "-y", "out.mp4",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(cmd.program(), "ffmpeg");
    assert_eq!(cmd.args(), &expected[..]);
}

#[test]
fn test_region_on_secondary_display_with_audio() {
    let secondary = Display {
        index: 1,
        x: 1920,
        y: 0,
        width: 2560,
        height: 1440,
    };
    let region = SelectedRegion::from_global(
        Rect::from_corners((2000, 100), (2333, 347)),
        &secondary,
    );
    assert_eq!(region.local.x, 80);

    let settings = RecordingSettings {
        screen_index: 1,
        audio_device: AudioDevice::from("Microphone (USB)"),
        audio_bit_rate: AudioBitRate::K128,
        region: Some(region),
        ..RecordingSettings::default()
    };
    let geometry = geometry::resolve(settings.region.as_ref(), &secondary);
    assert_eq!((geometry.width, geometry.height), (334, 248));

    let cmd = command::build(
        "ffmpeg",
        &CaptureSource::new(CaptureBackend::Gdigrab),
        &settings,
        &geometry,
        "/tmp/clip.mp4",
    );
    assert!(cmd.contains_sequence(&["-offset_x", "2000", "-offset_y", "100"]));
    assert!(cmd.contains_sequence(&["-f", "dshow", "-i", "audio=Microphone (USB)"]));
    assert!(cmd.contains_sequence(&["-acodec", "aac", "-b:a", "128k"]));
    assert_eq!(cmd.args().last().map(String::as_str), Some("/tmp/clip.mp4"));
}

#[test]
fn test_config_drives_command() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[encoder]
program = "/opt/ffmpeg/bin/ffmpeg"
backend = "gdigrab"

[recording]
screen = 1
frame_rate = 15
output = "/tmp/configured.mp4"

[[displays]]
width = 1920
height = 1080

[[displays]]
x = -1280
width = 1280
height = 1024
"#
    )
    .unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    let settings = config.recording_settings();
    let displays = config.displays();
    let display = displays[settings.screen_index];
    let geometry = geometry::resolve(None, &display);
    let output = settings.output_path.clone().unwrap();
    let cmd = command::build(
        &config.encoder.program,
        &CaptureSource::new(config.backend()),
        &settings,
        &geometry,
        &output.to_string_lossy(),
    );

    assert_eq!(cmd.program(), "/opt/ffmpeg/bin/ffmpeg");
    assert!(cmd.contains_sequence(&["-framerate", "15"]));
    assert!(cmd.contains_sequence(&["-video_size", "1280x1024"]));
    assert!(cmd.contains_sequence(&["-offset_x", "-1280"]));
    assert!(!cmd.args().iter().any(|a| a == "-acodec"));
    assert_eq!(
        cmd.args().last().map(String::as_str),
        Some("/tmp/configured.mp4")
    );
}
