//! Configuration for the audio subsystem
//!
//! Loaded from TOML. Every field has a built-in default, so an absent file or
//! an empty one yields a working configuration.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--config`, per-command flags)
//! 2. `TEMU_AUDIO_CONFIG` environment variable (path to the TOML file)
//! 3. `<config dir>/temu/audio.toml`
//! 4. Built-in defaults

use crate::audio::shaper::Envelope;
use crate::audio::PcmFormat;
use crate::error::{Error, Result};
use crate::playback::{BusyPolicy, SessionSettings};
use crate::tone::ToneSettings;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Longest accepted `target_duration_secs`
pub const MAX_TARGET_DURATION_SECS: f64 = 600.0;

/// Top-level audio configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name; unknown names fall back to the default device
    pub device: Option<String>,
    pub playback: PlaybackConfig,
    pub envelope: Envelope,
    pub tone: ToneConfig,
    pub logging: LoggingConfig,
}

/// Sample playback settings
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Samples are looped or truncated to this length
    #[serde(default = "default_target_duration")]
    pub target_duration_secs: f64,

    /// Rate assumed for raw (headerless) samples
    #[serde(default = "default_raw_sample_rate")]
    pub raw_sample_rate: f64,

    #[serde(default = "default_raw_channels")]
    pub raw_channels: u16,

    #[serde(default = "default_output_sample_rate")]
    pub output_sample_rate: u32,

    #[serde(default)]
    pub busy_policy: BusyPolicy,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            target_duration_secs: default_target_duration(),
            raw_sample_rate: default_raw_sample_rate(),
            raw_channels: default_raw_channels(),
            output_sample_rate: default_output_sample_rate(),
            busy_policy: BusyPolicy::default(),
        }
    }
}

/// Tone synthesizer settings
#[derive(Debug, Clone, Deserialize)]
pub struct ToneConfig {
    #[serde(default = "default_output_sample_rate")]
    pub sample_rate: u32,

    /// Initial frequency in Hz
    #[serde(default = "default_tone_frequency")]
    pub frequency: f64,

    /// Initial loudness, 0.0..=1.0
    #[serde(default = "default_tone_volume")]
    pub volume: f64,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_output_sample_rate(),
            frequency: default_tone_frequency(),
            volume: default_tone_volume(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_target_duration() -> f64 {
    9.0
}

fn default_raw_sample_rate() -> f64 {
    8000.0
}

fn default_raw_channels() -> u16 {
    2
}

fn default_output_sample_rate() -> u32 {
    44100
}

fn default_tone_frequency() -> f64 {
    880.0
}

fn default_tone_volume() -> f64 {
    0.5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AudioConfig {
    /// Resolve and load the configuration file, falling back to defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let config: Self = temu_common::config::load_or_default(cli_path)?;
        config.validate()?;
        info!(
            "Audio config: target {}s, raw {}Hz x{}, output {}Hz, busy policy {:?}",
            config.playback.target_duration_secs,
            config.playback.raw_sample_rate,
            config.playback.raw_channels,
            config.playback.output_sample_rate,
            config.playback.busy_policy
        );
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid audio config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;
        if !(0.0..=MAX_TARGET_DURATION_SECS).contains(&playback.target_duration_secs) {
            return Err(Error::Config(format!(
                "target_duration_secs must be within 0..={}, got {}",
                MAX_TARGET_DURATION_SECS, playback.target_duration_secs
            )));
        }
        if !playback.raw_sample_rate.is_finite() || playback.raw_sample_rate <= 0.0 {
            return Err(Error::Config(format!(
                "raw_sample_rate must be positive, got {}",
                playback.raw_sample_rate
            )));
        }
        if !(1..=2).contains(&playback.raw_channels) {
            return Err(Error::Config(format!(
                "raw_channels must be 1 or 2, got {}",
                playback.raw_channels
            )));
        }
        if playback.output_sample_rate == 0 || self.tone.sample_rate == 0 {
            return Err(Error::Config("sample rates must be non-zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.tone.volume) {
            return Err(Error::Config(format!(
                "tone volume must be within 0.0..=1.0, got {}",
                self.tone.volume
            )));
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            target_duration: self.playback.target_duration_secs,
            raw_format: PcmFormat::pcm8(self.playback.raw_sample_rate, self.playback.raw_channels),
            output_format: PcmFormat::float_planar(self.playback.output_sample_rate as f64, 2),
            envelope: self.envelope,
            busy_policy: self.playback.busy_policy,
        }
    }

    pub fn tone_settings(&self) -> ToneSettings {
        ToneSettings {
            sample_rate: self.tone.sample_rate,
            frequency: self.tone.frequency,
            volume: self.tone.volume,
            device: self.device.clone(),
        }
    }
}
