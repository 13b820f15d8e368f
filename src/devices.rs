//! Encoder probe and audio device discovery.
//!
//! Both run the encoder in a listing mode and read what it prints. ffmpeg writes
//! DirectShow device lists to stderr and `-sources` output to stdout.

use std::io;
use std::sync::OnceLock;

use regex::Regex;

use crate::command::CaptureBackend;
use crate::error::RecorderError;
use crate::pipeline::run_to_completion;
use crate::settings::NO_AUDIO_DEVICE;

fn spawn_error(program: &str, e: io::Error) -> RecorderError {
    let message = if e.kind() == io::ErrorKind::NotFound {
        "not found on the search path. Install ffmpeg or set encoder.program in the config"
            .to_string()
    } else {
        e.to_string()
    };
    RecorderError::SpawnFailure {
        program: program.to_string(),
        message,
    }
}

/// Check that the encoder runs, returning its version line.
pub fn probe_encoder(program: &str) -> Result<String, RecorderError> {
    let (exit, stdout, _) =
        run_to_completion(program, &["-version"]).map_err(|e| spawn_error(program, e))?;
    let version = stdout.lines().next().unwrap_or("").trim().to_string();
    if exit.code != Some(0) || version.is_empty() {
        return Err(RecorderError::SpawnFailure {
            program: program.to_string(),
            message: "did not report a version".to_string(),
        });
    }
    log::info!("{}", version);
    Ok(version)
}

/// List audio inputs for `backend`. The first entry is always `"None"`.
pub fn list_audio_devices(
    program: &str,
    backend: CaptureBackend,
) -> Result<Vec<String>, RecorderError> {
    let devices = match backend {
        CaptureBackend::Gdigrab => {
            // Exits non-zero because "dummy" is not a real input
            let (_, _, stderr) =
                run_to_completion(program, &["-list_devices", "true", "-f", "dshow", "-i", "dummy"])
                    .map_err(|e| spawn_error(program, e))?;
            parse_dshow_audio(&stderr)
        }
        CaptureBackend::X11grab => {
            let (_, stdout, stderr) = run_to_completion(program, &["-hide_banner", "-sources", "pulse"])
                .map_err(|e| spawn_error(program, e))?;
            let mut devices = parse_pulse_sources(&stdout);
            if devices.is_empty() {
                devices = parse_pulse_sources(&stderr);
            }
            devices
        }
    };
    log::debug!("Found {} audio device(s)", devices.len());
    Ok(with_none_first(devices))
}

fn dshow_audio_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""(.+?)" \(audio\)"#).expect("valid regex"))
}

/// Pull DirectShow audio device names out of ffmpeg's listing.
pub fn parse_dshow_audio(stderr: &str) -> Vec<String> {
    dshow_audio_pattern()
        .captures_iter(stderr)
        .map(|c| c[1].to_string())
        .collect()
}

/// Pull PulseAudio source names out of `ffmpeg -sources pulse`.
///
/// Lines look like `* alsa_input.pci-0000_00_1f.3.analog-stereo [Built-in Audio]`,
/// with `*` marking the default source.
pub fn parse_pulse_sources(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Auto-detected"))
        .filter_map(|line| {
            let line = line.trim_start_matches('*').trim_start();
            let name = line.split(" [").next()?.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

fn with_none_first(devices: Vec<String>) -> Vec<String> {
    let mut all = Vec::with_capacity(devices.len() + 1);
    all.push(NO_AUDIO_DEVICE.to_string());
    all.extend(devices.into_iter().filter(|d| d != NO_AUDIO_DEVICE));
    all
}

/// Print the device list to stdout.
pub fn print_devices(devices: &[String]) {
    println!("Audio Devices:");
    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {}", index, device);
    }
}
