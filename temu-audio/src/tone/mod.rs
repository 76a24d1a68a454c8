//! Real-time sine tone synthesis
//!
//! Control side: [`ToneControls`] setters write atomics. Render side:
//! [`ToneRenderer`] runs inside the hardware callback owned by
//! [`ToneSynthesizer`]. The two meet only in [`ToneParams`].

pub mod params;
pub mod renderer;
pub mod synth;

pub use params::{ToneControls, ToneParams, MAX_AMPLITUDE};
pub use renderer::ToneRenderer;
pub use synth::{ToneDevice, ToneSettings, ToneSynthesizer};
