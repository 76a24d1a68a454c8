//! Real-time sine renderer
//!
//! Runs inside the hardware pull callback: no locks, no allocation, no logging.
//! The phase accumulator lives here and nowhere else. It starts at zero on
//! construction and is carried across tone invocations so consecutive tones
//! join without a discontinuity.

use super::params::ToneParams;
use std::f64::consts::TAU;
use std::sync::Arc;

pub struct ToneRenderer {
    params: Arc<ToneParams>,
    phase: f64,
}

impl ToneRenderer {
    pub fn new(params: Arc<ToneParams>) -> Self {
        Self { params, phase: 0.0 }
    }

    /// Current phase in radians, within [0, 2π)
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Fill interleaved 16-bit output. Channels past the first two are silent.
    pub fn render_i16(&mut self, out: &mut [i16], channels: usize) {
        let channels = channels.max(1);
        let sounding = self.sounding_frames(out.len() / channels);

        for (i, frame) in out.chunks_mut(channels).enumerate() {
            let sample = if i < sounding { self.next_sample() as i16 } else { 0 };
            for (ch, slot) in frame.iter_mut().enumerate() {
                *slot = if ch < 2 { sample } else { 0 };
            }
        }
    }

    /// Fill interleaved f32 output scaled to [-1.0, 1.0]
    pub fn render_f32(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let sounding = self.sounding_frames(out.len() / channels);

        for (i, frame) in out.chunks_mut(channels).enumerate() {
            let sample = if i < sounding {
                (self.next_sample() / i16::MAX as f64) as f32
            } else {
                0.0
            };
            for (ch, slot) in frame.iter_mut().enumerate() {
                *slot = if ch < 2 { sample } else { 0.0 };
            }
        }
    }

    /// Frames of this period that carry tone
    fn sounding_frames(&self, frames: usize) -> usize {
        if self.params.amplitude() > 0.0 {
            self.params.claim(frames)
        } else {
            0
        }
    }

    /// Rounded sample at the current phase, then advance
    fn next_sample(&mut self) -> f64 {
        let sample = (self.params.amplitude() * self.phase.sin()).round();
        let delta = TAU * self.params.frequency() / self.params.sample_rate();
        let next = if delta.is_finite() { self.phase + delta } else { self.phase };
        self.phase = if next.is_finite() { next.rem_euclid(TAU) } else { 0.0 };
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::ToneControls;

    fn renderer(frequency: f64, amplitude: f64) -> (ToneRenderer, ToneControls) {
        let params = Arc::new(ToneParams::new(44100.0, frequency, amplitude));
        (ToneRenderer::new(Arc::clone(&params)), ToneControls::new(params))
    }

    #[test]
    fn test_silent_without_duration() {
        let (mut r, _c) = renderer(440.0, 32767.0);
        let mut out = vec![7i16; 512];
        r.render_i16(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0));
        assert_eq!(r.phase(), 0.0);
    }

    #[test]
    fn test_silent_without_amplitude() {
        let (mut r, c) = renderer(440.0, 0.0);
        c.set_duration(1.0);
        let mut out = vec![7i16; 512];
        r.render_i16(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0));
        assert_eq!(c.remaining_samples(), 44100);
    }

    #[test]
    fn test_both_channels_identical() {
        let (mut r, c) = renderer(1000.0, 20000.0);
        c.set_duration(1.0);
        let mut out = vec![0i16; 256];
        r.render_i16(&mut out, 2);
        for frame in out.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(out.iter().any(|&s| s != 0));
    }

    #[test]
    fn test_tone_ends_mid_buffer() {
        let (mut r, c) = renderer(1000.0, 20000.0);
        c.set_duration(10.0 / 44100.0);
        let mut out = vec![0i16; 64];
        r.render_i16(&mut out, 2);
        assert!(out[20..].iter().all(|&s| s == 0));
        assert_eq!(c.remaining_samples(), 0);
    }

    #[test]
    fn test_f32_matches_i16_scale() {
        let (mut a, ca) = renderer(440.0, 32767.0);
        let (mut b, cb) = renderer(440.0, 32767.0);
        ca.set_duration(1.0);
        cb.set_duration(1.0);

        let mut ints = vec![0i16; 64];
        let mut floats = vec![0f32; 64];
        a.render_i16(&mut ints, 2);
        b.render_f32(&mut floats, 2);
        for (i, f) in ints.iter().zip(&floats) {
            assert!((*i as f32 / 32767.0 - f).abs() < 1e-6);
        }
    }
}
