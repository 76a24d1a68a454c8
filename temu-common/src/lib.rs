//! # TEmu Common Library
//!
//! Shared code between the TEmu audio subsystem and the emulator's device-I/O layer:
//! - Error type for configuration and event plumbing
//! - Configuration file resolution
//! - Playback-state event types and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{AudioEvent, EventBus, PlaybackState};
