//! Tone parameters shared between the control thread and the render callback
//!
//! Frequency and amplitude are f64 values stored as raw bits in `AtomicU64`;
//! the remaining-sample count is an `AtomicI32` consumed by the renderer with
//! `fetch_update`. Setters never block or allocate. A parameter update may land
//! mid-buffer, which costs at most one buffer of staleness.
//!
//! Phase is not here: it belongs to [`ToneRenderer`](super::ToneRenderer).

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

/// Full-scale amplitude for 16-bit output
pub const MAX_AMPLITUDE: f64 = 32767.0;

/// Atomic parameter cell
#[derive(Debug)]
pub struct ToneParams {
    frequency: AtomicU64,
    amplitude: AtomicU64,
    remaining: AtomicI32,
    sample_rate: f64,
}

impl ToneParams {
    pub fn new(sample_rate: f64, frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency: AtomicU64::new(valid_frequency(frequency).unwrap_or(0.0).to_bits()),
            amplitude: AtomicU64::new(clamp_amplitude(amplitude).to_bits()),
            remaining: AtomicI32::new(0),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn frequency(&self) -> f64 {
        f64::from_bits(self.frequency.load(Ordering::Relaxed))
    }

    pub fn amplitude(&self) -> f64 {
        f64::from_bits(self.amplitude.load(Ordering::Relaxed))
    }

    pub fn remaining(&self) -> i32 {
        self.remaining.load(Ordering::Acquire)
    }

    fn set_frequency(&self, hz: f64) {
        if let Some(hz) = valid_frequency(hz) {
            self.frequency.store(hz.to_bits(), Ordering::Relaxed);
        }
    }

    fn set_amplitude(&self, amplitude: f64) {
        self.amplitude
            .store(clamp_amplitude(amplitude).to_bits(), Ordering::Relaxed);
    }

    fn set_remaining(&self, samples: i32) {
        self.remaining.store(samples.max(0), Ordering::Release);
    }

    /// Take up to `frames` samples from the remaining count.
    /// Returns how many were granted. Called from the render callback.
    pub fn claim(&self, frames: usize) -> usize {
        let wanted = i32::try_from(frames).unwrap_or(i32::MAX);
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                (left > 0).then(|| left - left.min(wanted))
            }) {
            Ok(previous) => previous.min(wanted) as usize,
            Err(_) => 0,
        }
    }
}

fn valid_frequency(hz: f64) -> Option<f64> {
    (hz.is_finite() && hz >= 0.0).then_some(hz)
}

fn clamp_amplitude(amplitude: f64) -> f64 {
    if amplitude.is_finite() {
        amplitude.clamp(0.0, MAX_AMPLITUDE)
    } else {
        0.0
    }
}

/// Cloneable control handle for the tone parameters.
///
/// `Send + Sync`, unlike the hardware stream, so an emulator thread can drive
/// the tone without owning the synthesizer.
#[derive(Debug, Clone)]
pub struct ToneControls {
    params: Arc<ToneParams>,
}

impl ToneControls {
    pub fn new(params: Arc<ToneParams>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Arc<ToneParams> {
        &self.params
    }

    /// Set the sine frequency in Hz. Negative or non-finite values are ignored.
    pub fn set_frequency(&self, hz: f64) {
        self.params.set_frequency(hz);
    }

    /// Set loudness as a fraction of full scale (0.0..=1.0)
    pub fn set_volume(&self, volume: f64) {
        self.params.set_amplitude(volume.clamp(0.0, 1.0) * MAX_AMPLITUDE);
    }

    /// Set the raw 16-bit amplitude (0..=32767)
    pub fn set_amplitude(&self, amplitude: f64) {
        self.params.set_amplitude(amplitude);
    }

    /// Sound for `seconds` from now, replacing any remaining duration.
    /// Does not touch phase.
    pub fn set_duration(&self, seconds: f64) {
        let samples = (seconds * self.params.sample_rate).round();
        let samples = if samples.is_finite() && samples > 0.0 {
            samples.min(i32::MAX as f64) as i32
        } else {
            0
        };
        self.params.set_remaining(samples);
    }

    /// Silence the tone without stopping the stream
    pub fn silence(&self) {
        self.params.set_remaining(0);
    }

    pub fn frequency(&self) -> f64 {
        self.params.frequency()
    }

    pub fn amplitude(&self) -> f64 {
        self.params.amplitude()
    }

    pub fn volume(&self) -> f64 {
        self.params.amplitude() / MAX_AMPLITUDE
    }

    pub fn remaining_samples(&self) -> i32 {
        self.params.remaining()
    }

    pub fn is_sounding(&self) -> bool {
        self.params.remaining() > 0 && self.params.amplitude() > 0.0
    }
}
