//! # TEmu Audio (temu-audio)
//!
//! Audio output for the TEmu console emulator.
//!
//! **Purpose:** Turn the console's low-fidelity 8-bit PCM samples and beep
//! commands into sound on the host.
//!
//! **Architecture:** Two independent pipelines sharing one cpal output layer:
//! - Sample playback: WAV codec → shaper → rubato format converter →
//!   streaming player, driven by a [`PlaybackSession`](playback::PlaybackSession)
//! - Tone synthesis: atomic parameters read by a sine renderer inside the
//!   hardware callback ([`ToneSynthesizer`](tone::ToneSynthesizer))

pub mod audio;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod playback;
pub mod tone;

pub use config::AudioConfig;
pub use dispatch::{AudioCommand, AudioUnit};
pub use error::{Error, Result};
