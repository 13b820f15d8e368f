//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing and subcommand handlers.

mod args;
mod commands;

pub use args::{Args, Command, ConfigAction, RecordingArgs};
pub use commands::{describe_config, handle_config_action, list_devices};
