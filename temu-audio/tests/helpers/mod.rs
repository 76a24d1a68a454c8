//! Test helpers for temu-audio integration tests
//!
//! - MockPlayer: StreamingPlayer that records buffers and exposes completion
//! - MockTone: ToneDevice without hardware
//! - fixtures: temporary raw and WAV sample files

#![allow(dead_code)]

pub mod fixtures;
pub mod mock_player;
pub mod mock_tone;

pub use fixtures::{raw_console_sample, sawtooth_pcm8, wav_sample, write_fixture};
pub use mock_player::MockPlayer;
pub use mock_tone::MockTone;
