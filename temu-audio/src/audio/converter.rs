//! Format conversion from console PCM to host float audio
//!
//! Adapts 8-bit interleaved PCM at a low fixed rate into de-interleaved f32 at
//! the host rate, resampling with rubato.
//!
//! Conversion is one-shot and pull-based: the converter requests frames from
//! an [`InputProvider`], which supplies one fixed buffer and then reports
//! end-of-stream. There is no incremental streaming.

use crate::audio::types::{HostBuffer, PcmFormat, SampleBuffer};
use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Upper bound on zero-input passes used to drain the resampler tail
const MAX_FLUSH_PASSES: usize = 64;

/// Answer to a converter pull request
#[derive(Debug, PartialEq)]
pub enum InputStatus<'a> {
    /// Interleaved input bytes
    HaveData(&'a [u8]),
    /// No more input will follow
    EndOfStream,
}

/// Source of converter input
pub trait InputProvider {
    /// Supply input for up to `requested_frames` output frames
    fn pull(&mut self, requested_frames: usize) -> InputStatus<'_>;
}

/// Supplies a single owned buffer once, then end-of-stream.
///
/// Owns its buffer, so the input outlives the conversion call and is released
/// with the provider.
#[derive(Debug)]
pub struct OneShotInput {
    buffer: SampleBuffer,
    delivered: bool,
}

impl OneShotInput {
    pub fn new(buffer: SampleBuffer) -> Self {
        Self {
            buffer,
            delivered: false,
        }
    }

    pub fn format(&self) -> &PcmFormat {
        &self.buffer.format
    }
}

impl InputProvider for OneShotInput {
    fn pull(&mut self, _requested_frames: usize) -> InputStatus<'_> {
        if self.delivered {
            InputStatus::EndOfStream
        } else {
            self.delivered = true;
            InputStatus::HaveData(&self.buffer.bytes)
        }
    }
}

/// Input frames in a payload, excluding a container header if present
pub fn input_frame_count(payload_bytes: usize, header_bytes: usize, format: &PcmFormat) -> usize {
    format.frames_in(payload_bytes.saturating_sub(header_bytes))
}

/// Output frames produced for `input_frames` at the given rates
pub fn output_frame_capacity(input_frames: usize, input_rate: f64, output_rate: f64) -> usize {
    if input_rate <= 0.0 {
        return 0;
    }
    (input_frames as f64 * output_rate / input_rate).ceil() as usize
}

/// Negotiated 8-bit → float converter
#[derive(Debug, Clone)]
pub struct FormatConverter {
    input: PcmFormat,
    output: PcmFormat,
}

impl FormatConverter {
    /// Negotiate a conversion between `input` and `output`.
    ///
    /// # Errors
    /// `Error::Conversion` if either side is not a supported layout: input must
    /// be interleaved unsigned 8-bit mono/stereo, output must be planar f32 with
    /// at least as many channels as the input.
    pub fn new(input: PcmFormat, output: PcmFormat) -> Result<Self> {
        if input.is_float || input.bits_per_sample != 8 || !input.is_interleaved {
            return Err(Error::Conversion(format!(
                "Unsupported input layout: {} bits, float={}, interleaved={}",
                input.bits_per_sample, input.is_float, input.is_interleaved
            )));
        }
        if !(1..=2).contains(&input.channel_count) {
            return Err(Error::Conversion(format!(
                "Unsupported input channel count: {}",
                input.channel_count
            )));
        }
        if !output.is_float || output.bits_per_sample != 32 || output.is_interleaved {
            return Err(Error::Conversion(format!(
                "Unsupported output layout: {} bits, float={}, interleaved={}",
                output.bits_per_sample, output.is_float, output.is_interleaved
            )));
        }
        if output.channel_count != input.channel_count && output.channel_count != 2 {
            return Err(Error::Conversion(format!(
                "Cannot map {} input channels to {} output channels",
                input.channel_count, output.channel_count
            )));
        }
        for rate in [input.sample_rate, output.sample_rate] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::Conversion(format!("Invalid sample rate: {}", rate)));
            }
        }

        debug!(
            "Converter negotiated: {}Hz x{} u8 -> {}Hz x{} f32 planar",
            input.sample_rate, input.channel_count, output.sample_rate, output.channel_count
        );
        Ok(Self { input, output })
    }

    pub fn input_format(&self) -> &PcmFormat {
        &self.input
    }

    pub fn output_format(&self) -> &PcmFormat {
        &self.output
    }

    /// Output frames produced for `input_frames` input frames
    pub fn output_capacity(&self, input_frames: usize) -> usize {
        output_frame_capacity(input_frames, self.input.sample_rate, self.output.sample_rate)
    }

    /// Convert a buffer already in hand
    pub fn convert_buffer(&mut self, buffer: SampleBuffer) -> Result<HostBuffer> {
        if buffer.format != self.input {
            return Err(Error::Conversion(format!(
                "Buffer format {:?} does not match negotiated input {:?}",
                buffer.format, self.input
            )));
        }
        let capacity = self.output_capacity(buffer.frame_count());
        self.convert(&mut OneShotInput::new(buffer), capacity)
    }

    /// Pull one input buffer from `provider` and produce `capacity` output frames.
    pub fn convert(&mut self, provider: &mut dyn InputProvider, capacity: usize) -> Result<HostBuffer> {
        let planar = match provider.pull(capacity) {
            InputStatus::HaveData(bytes) => self.decode_planar(bytes),
            InputStatus::EndOfStream => vec![Vec::new(); self.output.channel_count as usize],
        };
        if let InputStatus::HaveData(_) = provider.pull(capacity) {
            return Err(Error::Conversion(
                "Input provider supplied more than one buffer".to_string(),
            ));
        }

        let input_frames = planar.first().map_or(0, Vec::len);
        let mut channels = if input_frames == 0 || self.input.sample_rate == self.output.sample_rate {
            planar
        } else {
            self.resample(&planar, input_frames, capacity)?
        };

        for channel in &mut channels {
            channel.resize(capacity, 0.0);
        }

        debug!("Converted {} input frames to {} output frames", input_frames, capacity);
        Ok(HostBuffer::new(self.output, channels))
    }

    /// Unsigned 8-bit interleaved → f32 planar in the output channel layout
    fn decode_planar(&self, bytes: &[u8]) -> Vec<Vec<f32>> {
        let in_channels = self.input.channel_count as usize;
        let out_channels = self.output.channel_count as usize;
        let frames = self.input.frames_in(bytes.len());

        let mut planar = vec![Vec::with_capacity(frames); out_channels];
        for frame in bytes.chunks_exact(in_channels) {
            for (ch_idx, channel) in planar.iter_mut().enumerate() {
                let sample = frame[ch_idx.min(in_channels - 1)];
                channel.push(pcm8_to_f32(sample));
            }
        }
        planar
    }

    /// Resample to at least `capacity` frames aligned with the input: the
    /// resampler's output delay is trimmed and its tail flushed with silence.
    fn resample(&self, planar: &[Vec<f32>], input_frames: usize, capacity: usize) -> Result<Vec<Vec<f32>>> {
        let mut resampler = FastFixedIn::<f32>::new(
            self.output.sample_rate / self.input.sample_rate,
            1.0,
            PolynomialDegree::Septic,
            input_frames,
            planar.len(),
        )
        .map_err(|e| Error::Conversion(format!("Failed to create resampler: {}", e)))?;

        let delay = resampler.output_delay();
        let wanted = delay + capacity;

        let mut channels = resampler
            .process(planar, None)
            .map_err(|e| Error::Conversion(format!("Resampling failed: {}", e)))?;

        for _ in 0..MAX_FLUSH_PASSES {
            if channels.first().map_or(0, Vec::len) >= wanted {
                break;
            }
            let tail = resampler
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| Error::Conversion(format!("Resampler flush failed: {}", e)))?;
            for (channel, rest) in channels.iter_mut().zip(tail) {
                channel.extend(rest);
            }
        }

        for channel in &mut channels {
            channel.drain(..delay.min(channel.len()));
        }
        debug!("Resampler delay {} frames trimmed", delay);
        Ok(channels)
    }
}

/// Unsigned 8-bit sample to [-1.0, 1.0)
pub fn pcm8_to_f32(sample: u8) -> f32 {
    (sample as f32 - 128.0) / 128.0
}
