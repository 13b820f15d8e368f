//! Error types for recording sessions.

use std::path::PathBuf;

/// Errors surfaced by the session controller and the process supervisor.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// The encoder executable is missing or could not be launched
    #[error("Failed to launch {program}: {message}")]
    SpawnFailure { program: String, message: String },

    /// The encoder exited with a status that is not considered benign
    #[error("Encoder exited with code {}{}", describe_code(*code), describe_diagnostics(diagnostics))]
    EncoderFailure {
        code: Option<i32>,
        diagnostics: String,
    },

    /// The graceful interrupt could not be delivered to a live encoder
    #[error("Failed to stop the encoder: {0}")]
    SignalFailure(#[source] std::io::Error),

    /// Recording was requested without a destination file
    #[error("No output file selected for the recording")]
    NoOutputSelected,

    /// A recording is already running
    #[error("A recording is already in progress")]
    AlreadyRunning,

    /// Recording settings failed validation
    #[error("Invalid recording settings: {0}")]
    InvalidSettings(#[from] crate::settings::SettingsError),

    /// Configuration could not be loaded or written
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn describe_code(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn describe_diagnostics(diagnostics: &str) -> String {
    if diagnostics.is_empty() {
        String::new()
    } else {
        format!(":\n{}", diagnostics)
    }
}

/// Errors that can occur when loading or writing the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_failure_display() {
        let err = RecorderError::EncoderFailure {
            code: Some(1),
            diagnostics: "Unknown input format: 'gdigrab'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Encoder exited with code 1:\n"));
        assert!(msg.contains("gdigrab"));
    }

    #[test]
    fn test_encoder_failure_without_code() {
        let err = RecorderError::EncoderFailure {
            code: None,
            diagnostics: String::new(),
        };
        assert_eq!(err.to_string(), "Encoder exited with code unknown");
    }

    #[test]
    fn test_spawn_failure_names_program() {
        let err = RecorderError::SpawnFailure {
            program: "ffmpeg".to_string(),
            message: "No such file or directory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_config_error_mentions_path() {
        let err = ConfigError::AlreadyExists {
            path: PathBuf::from("/tmp/screen-recorder/config.toml"),
        };
        assert!(err.to_string().contains("/tmp/screen-recorder/config.toml"));
    }
}
