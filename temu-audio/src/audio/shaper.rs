//! Sample shaping: duration conversion, looping and envelope application
//!
//! All functions are pure and operate on unsigned 8-bit PCM, whose silence
//! level is 128.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Unsigned 8-bit PCM zero crossing
const PCM8_CENTER: f32 = 128.0;

/// Default flat attenuation applied when no time-varying shape is configured
pub const DEFAULT_FLAT_GAIN: f32 = 0.5;

/// Largest looped sample, in bytes (about 17 minutes of 8 kHz stereo)
pub const MAX_LOOP_LEN: usize = 1 << 24;

/// Seconds of audio held in `byte_count` bytes of 8-bit PCM
pub fn duration_seconds(byte_count: usize, sample_rate: f64, channels: u16) -> f64 {
    if sample_rate <= 0.0 || channels == 0 {
        return 0.0;
    }
    (byte_count as f64 / channels as f64) / sample_rate
}

/// Bytes of 8-bit PCM needed for `duration` seconds, rounded to the nearest byte
pub fn byte_size(duration: f64, sample_rate: f64, channels: u16) -> usize {
    let bytes = (duration * sample_rate * channels as f64).round();
    if bytes.is_finite() && bytes > 0.0 {
        bytes as usize
    } else {
        0
    }
}

/// Repeat `source` end-to-end until exactly `target_len` bytes, truncating the
/// final repetition.
///
/// # Errors
/// `Error::EmptySource` when `source` is empty and `target_len > 0`.
/// `Error::TooLong` when `target_len` exceeds [`MAX_LOOP_LEN`].
pub fn loop_to_len(source: &[u8], target_len: usize) -> Result<Vec<u8>> {
    if target_len == 0 {
        return Ok(Vec::new());
    }
    if target_len > MAX_LOOP_LEN {
        return Err(Error::TooLong {
            requested: target_len,
            limit: MAX_LOOP_LEN,
        });
    }
    if source.is_empty() {
        return Err(Error::EmptySource);
    }

    let mut looped = Vec::with_capacity(target_len);
    while looped.len() < target_len {
        let take = source.len().min(target_len - looped.len());
        looped.extend_from_slice(&source[..take]);
    }
    Ok(looped)
}

/// Loop `source` to `target_duration` seconds of PCM at the given rate and
/// channel count. The result is exactly `byte_size(target_duration, ..)` long.
pub fn loop_to_duration(
    source: &[u8],
    target_duration: f64,
    sample_rate: f64,
    channels: u16,
) -> Result<Vec<u8>> {
    loop_to_len(source, byte_size(target_duration, sample_rate, channels))
}

/// How the envelope maps time to gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeShape {
    /// Constant attenuation, ignores the ADSR times
    #[default]
    Flat,
    /// Time-varying attack/decay/sustain/release
    Adsr,
}

/// Amplitude envelope.
///
/// `attack`, `decay` and `release` are in seconds; `sustain` is a level in
/// 0.0..=1.0. With the default `Flat` shape every sample is scaled by
/// [`DEFAULT_FLAT_GAIN`] regardless of the ADSR parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub shape: EnvelopeShape,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
            shape: EnvelopeShape::Flat,
        }
    }
}

impl Envelope {
    /// ADSR envelope
    pub fn adsr(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
            shape: EnvelopeShape::Adsr,
        }
    }

    /// Gain at `t` seconds into a note lasting `total` seconds
    pub fn gain_at(&self, t: f64, total: f64) -> f32 {
        match self.shape {
            EnvelopeShape::Flat => DEFAULT_FLAT_GAIN,
            EnvelopeShape::Adsr => self.adsr_gain(t, total) as f32,
        }
    }

    fn adsr_gain(&self, t: f64, total: f64) -> f64 {
        let sustain = self.sustain.clamp(0.0, 1.0);
        let release_start = (total - self.release.max(0.0)).max(0.0);

        let level = if self.attack > 0.0 && t < self.attack {
            t / self.attack
        } else if self.decay > 0.0 && t < self.attack.max(0.0) + self.decay {
            let progress = (t - self.attack.max(0.0)) / self.decay;
            1.0 - (1.0 - sustain) * progress
        } else {
            sustain
        };

        if t >= release_start && self.release > 0.0 {
            let remaining = ((total - t) / self.release).clamp(0.0, 1.0);
            level * remaining
        } else {
            level
        }
    }
}

/// Map every unsigned 8-bit sample through the envelope's gain.
///
/// Gain scales the excursion from the 128 midpoint, so silence stays silence.
/// Output length always equals input length.
pub fn apply_envelope(source: &[u8], envelope: &Envelope, sample_rate: f64, channels: u16) -> Vec<u8> {
    let channels = channels.max(1) as usize;
    let total = duration_seconds(source.len(), sample_rate, channels as u16);

    source
        .iter()
        .enumerate()
        .map(|(i, &sample)| {
            let t = if sample_rate > 0.0 {
                (i / channels) as f64 / sample_rate
            } else {
                0.0
            };
            let gain = envelope.gain_at(t, total);
            let shaped = PCM8_CENTER + (sample as f32 - PCM8_CENTER) * gain;
            shaped.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}
