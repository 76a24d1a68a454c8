//! Core audio data types
//!
//! Defines the PCM format descriptor and the buffers handed between the
//! pipeline stages (codec → shaper → converter → player).

/// Sample rate the emulated console produces PCM at
pub const CONSOLE_SAMPLE_RATE: f64 = 8000.0;

/// Native host output rate
pub const HOST_SAMPLE_RATE: f64 = 44100.0;

/// Describes a PCM stream layout.
///
/// `bytes_per_frame()` is derived, never stored, so every buffer built from
/// the same format agrees on frame size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcmFormat {
    /// Frames per second
    pub sample_rate: f64,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channel_count: u16,

    /// Bits per channel sample
    pub bits_per_sample: u16,

    /// IEEE float samples (otherwise integer PCM)
    pub is_float: bool,

    /// Channel samples alternate LRLR (otherwise planar)
    pub is_interleaved: bool,
}

impl PcmFormat {
    /// Unsigned 8-bit interleaved PCM, the console's native sample layout
    pub fn pcm8(sample_rate: f64, channel_count: u16) -> Self {
        Self {
            sample_rate,
            channel_count,
            bits_per_sample: 8,
            is_float: false,
            is_interleaved: true,
        }
    }

    /// 32-bit float planar PCM, the host's native processing layout
    pub fn float_planar(sample_rate: f64, channel_count: u16) -> Self {
        Self {
            sample_rate,
            channel_count,
            bits_per_sample: 32,
            is_float: true,
            is_interleaved: false,
        }
    }

    /// Raw console sample format: 8 kHz stereo unsigned 8-bit
    pub fn console() -> Self {
        Self::pcm8(CONSOLE_SAMPLE_RATE, 2)
    }

    /// Host output format: 44.1 kHz stereo float planar
    pub fn host() -> Self {
        Self::float_planar(HOST_SAMPLE_RATE, 2)
    }

    /// Bytes occupied by one frame (one sample per channel)
    pub fn bytes_per_frame(&self) -> usize {
        self.channel_count as usize * self.bits_per_sample as usize / 8
    }

    /// Whole frames contained in `byte_count` bytes
    pub fn frames_in(&self, byte_count: usize) -> usize {
        match self.bytes_per_frame() {
            0 => 0,
            bpf => byte_count / bpf,
        }
    }
}

/// Integer PCM bytes plus the format describing them.
///
/// Owned by exactly one pipeline stage at a time; stages take it by value.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    pub format: PcmFormat,
    pub bytes: Vec<u8>,
}

impl SampleBuffer {
    pub fn new(format: PcmFormat, bytes: Vec<u8>) -> Self {
        Self { format, bytes }
    }

    /// Number of complete frames
    pub fn frame_count(&self) -> usize {
        self.format.frames_in(self.bytes.len())
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.format.sample_rate <= 0.0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.format.sample_rate
    }
}

/// Play-ready float audio in planar layout, one `Vec` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer {
    pub format: PcmFormat,
    pub channels: Vec<Vec<f32>>,
}

impl HostBuffer {
    pub fn new(format: PcmFormat, channels: Vec<Vec<f32>>) -> Self {
        Self { format, channels }
    }

    /// Frames per channel
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Stereo frame at `index`; mono buffers are duplicated to both sides
    pub fn frame(&self, index: usize) -> Option<AudioFrame> {
        match self.channels.as_slice() {
            [mono] => mono.get(index).map(|&s| AudioFrame::from_mono(s)),
            [left, right, ..] => match (left.get(index), right.get(index)) {
                (Some(&l), Some(&r)) => Some(AudioFrame::from_stereo(l, r)),
                _ => None,
            },
            [] => None,
        }
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.format.sample_rate <= 0.0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.format.sample_rate
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
///
/// Used for passing audio data between the player and the output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from mono sample (duplicate to both channels)
    pub fn from_mono(sample: f32) -> Self {
        AudioFrame { left: sample, right: sample }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }
}
