//! Offline buffer preparation: WAV codec, sample shaping, format conversion,
//! plus the output endpoint glue shared with the tone synthesizer.

pub mod converter;
pub mod output;
pub mod shaper;
pub mod types;
pub mod wav;

pub use converter::{FormatConverter, InputProvider, InputStatus, OneShotInput};
pub use shaper::{Envelope, EnvelopeShape};
pub use types::{AudioFrame, HostBuffer, PcmFormat, SampleBuffer};
