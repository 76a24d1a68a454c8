//! Audio output endpoint selection using cpal
//!
//! Shared by the streaming player and the tone synthesizer: both need a device
//! and a stream configuration at a fixed rate before building their stream.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use tracing::{debug, info, warn};

/// List available audio output devices.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .output_devices()
        .map_err(|e| Error::Hardware(format!("Failed to enumerate devices: {}", e)))?
        .filter_map(|device| device.name().ok())
        .collect();

    debug!("Found {} output devices", devices.len());
    Ok(devices)
}

/// Open an output device.
///
/// A named device that cannot be found falls back to the default device.
///
/// # Errors
/// `Error::Hardware` if no device is available at all.
pub fn open_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::Hardware(format!("Failed to enumerate devices: {}", e)))?;

        if let Some(device) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Found requested audio device: {}", name);
            return Ok(device);
        }
        warn!("Requested device '{}' not found, falling back to default device", name);
    }

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Hardware("No default output device found".to_string()))?;

    info!(
        "Using default audio device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );
    Ok(device)
}

/// Find a stream configuration with exactly `channels` channels at
/// `sample_rate`, trying `formats` in order of preference.
///
/// Returns `Ok(None)` when the device supports none of them.
pub fn negotiate_config(
    device: &Device,
    sample_rate: u32,
    channels: u16,
    formats: &[SampleFormat],
) -> Result<Option<(StreamConfig, SampleFormat)>> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| Error::Hardware(format!("Failed to get device configs: {}", e)))?
        .collect();

    for &format in formats {
        let candidate = supported.iter().find(|config| {
            config.channels() == channels
                && config.min_sample_rate().0 <= sample_rate
                && config.max_sample_rate().0 >= sample_rate
                && config.sample_format() == format
        });

        if let Some(range) = candidate {
            let config = range.clone().with_sample_rate(cpal::SampleRate(sample_rate)).config();
            debug!(
                "Negotiated stream config: sample_rate={}, channels={}, format={:?}",
                sample_rate, channels, format
            );
            return Ok(Some((config, format)));
        }
    }

    warn!(
        "Device offers no {}Hz {}-channel config in any of {:?}",
        sample_rate, channels, formats
    );
    Ok(None)
}
