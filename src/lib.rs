//! screen-recorder library crate.
//!
//! Controls screen recording sessions backed by an external ffmpeg process. This
//! module exposes the components for the binary and for integration testing.

pub mod cancel;
pub mod cli;
pub mod command;
pub mod config;
pub mod controller;
pub mod devices;
pub mod error;
pub mod event_loop;
pub mod events;
pub mod geometry;
pub mod hotkeys;
pub mod pipeline;
pub mod session;
pub mod settings;
pub mod supervisor;
