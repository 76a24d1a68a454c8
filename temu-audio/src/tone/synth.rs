//! Tone synthesizer: owns the hardware stream that drives a [`ToneRenderer`]

use super::params::{ToneControls, ToneParams, MAX_AMPLITUDE};
use super::renderer::ToneRenderer;
use crate::audio::output::{negotiate_config, open_device};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Synthesizer construction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSettings {
    pub sample_rate: u32,
    /// Initial frequency in Hz
    pub frequency: f64,
    /// Initial loudness, fraction of full scale
    pub volume: f64,
    /// Output device name (None = default device)
    pub device: Option<String>,
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            frequency: 880.0,
            volume: 0.5,
            device: None,
        }
    }
}

/// Tone generator as seen by the device dispatch layer
pub trait ToneDevice {
    fn controls(&self) -> &ToneControls;

    /// Make sure hardware output is running
    fn enable(&mut self) -> Result<()>;

    /// Halt hardware output. Idempotent.
    fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;
}

/// Sine synthesizer on a cpal output stream.
///
/// The stream is built lazily on the first `enable()` and kept for the life of
/// the synthesizer; it keeps running through silence so phase carries over
/// between tones.
pub struct ToneSynthesizer {
    settings: ToneSettings,
    controls: ToneControls,
    stream: Option<Stream>,
    running: bool,
    error_flag: Arc<AtomicBool>,
}

impl ToneSynthesizer {
    pub fn new(settings: ToneSettings) -> Self {
        let params = Arc::new(ToneParams::new(
            settings.sample_rate as f64,
            settings.frequency,
            settings.volume.clamp(0.0, 1.0) * MAX_AMPLITUDE,
        ));
        Self {
            settings,
            controls: ToneControls::new(params),
            stream: None,
            running: false,
            error_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> &ToneSettings {
        &self.settings
    }

    /// Whether the stream error callback has reported a failure
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    fn build_stream(&self) -> Result<Stream> {
        let device = open_device(self.settings.device.as_deref())?;
        let (config, sample_format) = negotiate_config(
            &device,
            self.settings.sample_rate,
            2,
            &[SampleFormat::I16, SampleFormat::F32],
        )?
        .ok_or_else(|| {
            Error::Hardware(format!(
                "Output device cannot accept {}Hz stereo i16/f32",
                self.settings.sample_rate
            ))
        })?;

        let channels = config.channels as usize;
        let mut renderer = ToneRenderer::new(Arc::clone(self.controls.params()));
        let error_flag = Arc::clone(&self.error_flag);
        let on_error = move |err: cpal::StreamError| {
            error!("Tone stream error: {}", err);
            error_flag.store(true, Ordering::SeqCst);
        };

        let stream = match sample_format {
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| renderer.render_i16(data, channels),
                on_error,
                None,
            ),
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.render_f32(data, channels),
                on_error,
                None,
            ),
            other => {
                return Err(Error::Hardware(format!("Unsupported sample format: {:?}", other)));
            }
        }
        .map_err(|e| Error::Hardware(format!("Failed to build tone stream: {}", e)))?;

        info!(
            "Tone stream ready: {}Hz, {} channels, {:?}",
            config.sample_rate.0, config.channels, sample_format
        );
        Ok(stream)
    }
}

impl ToneDevice for ToneSynthesizer {
    fn controls(&self) -> &ToneControls {
        &self.controls
    }

    /// Build the stream if needed and start it.
    ///
    /// # Errors
    /// `Error::Hardware` on endpoint, format or start failure. Nothing is kept
    /// from a failed attempt, so `enable()` may simply be retried.
    fn enable(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }

        if self.stream.is_none() {
            self.stream = Some(self.build_stream()?);
        }

        let started = match self.stream.as_ref() {
            Some(stream) => stream.play(),
            None => Ok(()),
        };
        if let Err(e) = started {
            self.stream = None;
            return Err(Error::Hardware(format!("Failed to start tone stream: {}", e)));
        }

        self.running = true;
        debug!("Tone output enabled");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.controls.silence();
        if !self.running {
            return Ok(());
        }
        self.running = false;

        match self.stream.as_ref() {
            Some(stream) => stream.pause().map_err(|e| {
                warn!("Failed to pause tone stream: {}", e);
                Error::Hardware(format!("Failed to pause tone stream: {}", e))
            }),
            None => Ok(()),
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

impl Drop for ToneSynthesizer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
