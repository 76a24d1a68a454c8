//! Error types for temu-audio
//!
//! I/O and format errors abort the current play request only. Hardware errors
//! abort `enable()`/`attach()` and leave the component retryable.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for temu-audio
#[derive(Error, Debug)]
pub enum Error {
    /// Sample file path could not be resolved
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Malformed WAV header or unsupported channel/depth combination
    #[error("Format error: {0}")]
    Format(String),

    /// Format negotiation or sample rate conversion failure
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Output endpoint, resource or start failure
    #[error("Audio hardware error: {0}")]
    Hardware(String),

    /// Looping requires at least one byte of source material
    #[error("Cannot loop an empty sample")]
    EmptySource,

    /// Requested sample length exceeds what a single buffer may hold
    #[error("Requested {requested} bytes of sample data, limit is {limit}")]
    TooLong { requested: usize, limit: usize },

    /// A buffer is already in flight and the session rejects replacement
    #[error("Playback session busy: a buffer is already in flight")]
    Busy,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from shared infrastructure
    #[error(transparent)]
    Common(#[from] temu_common::Error),
}

/// Convenience Result type using temu-audio Error
pub type Result<T> = std::result::Result<T, Error>;
