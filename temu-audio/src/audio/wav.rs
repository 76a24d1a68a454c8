//! Minimal RIFF/WAVE container codec
//!
//! Only the canonical 44-byte layout is supported: a single `fmt ` chunk at
//! offset 12 followed by a single `data` chunk at offset 36. No chunk skipping.
//!
//! ```text
//! 0x00 "RIFF"(4)        0x08 "WAVE"(4)        0x0C "fmt "(4)
//! 0x10 subchunk1Size=16 0x14 audioFormat=1    0x16 numChannels
//! 0x18 sampleRate(4)    0x1C byteRate(4)      0x20 blockAlign(2)
//! 0x22 bitsPerSample(2) 0x24 "data"(4)        0x28 dataSize(4)
//! 0x2C payload...
//! ```

use crate::audio::types::{PcmFormat, SampleBuffer};
use crate::error::{Error, Result};

/// Size of the canonical header in bytes
pub const HEADER_LEN: usize = 44;

/// RIFF size field counts everything after itself except the payload
const RIFF_OVERHEAD: u32 = 36;

const FMT_CHUNK_LEN: u32 = 16;
const FORMAT_PCM: u16 = 1;

/// Encode `payload` as a WAV file.
///
/// The payload is copied unmodified after the 44-byte header. The header's
/// sample rate is taken from `format` as given; callers must pass the rate the
/// payload was actually produced at.
pub fn encode(payload: &[u8], format: &PcmFormat) -> Result<Vec<u8>> {
    check_supported(format.channel_count, format.bits_per_sample)?;
    if format.is_float || !format.is_interleaved {
        return Err(Error::Format(
            "WAV encoding supports interleaved integer PCM only".to_string(),
        ));
    }
    let sample_rate = header_rate(format.sample_rate)?;

    let data_size = u32::try_from(payload.len())
        .ok()
        .filter(|size| size.checked_add(RIFF_OVERHEAD).is_some())
        .ok_or_else(|| Error::Format(format!("Payload too large for WAV: {} bytes", payload.len())))?;

    let block_align = format.bytes_per_frame() as u16;
    let byte_rate = checked_byte_rate(sample_rate, block_align).ok_or_else(|| {
        Error::Format(format!(
            "Byte rate overflows: {} Hz x {} bytes per frame",
            sample_rate, block_align
        ))
    })?;

    let mut wav = Vec::with_capacity(HEADER_LEN + payload.len());

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(data_size + RIFF_OVERHEAD).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    wav.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    wav.extend_from_slice(&format.channel_count.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    // data sub-chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(payload);

    Ok(wav)
}

/// Encode console PCM: stereo, 8 bits per channel, at `sample_rate`
pub fn encode_pcm8(payload: &[u8], sample_rate: f64) -> Result<Vec<u8>> {
    encode(payload, &PcmFormat::pcm8(sample_rate, 2))
}

/// Decode a canonical WAV file into its format and payload.
pub fn decode(bytes: &[u8]) -> Result<SampleBuffer> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::Format(format!(
            "WAV too small for header: {} bytes",
            bytes.len()
        )));
    }

    expect_tag(bytes, 0x00, b"RIFF")?;
    expect_tag(bytes, 0x08, b"WAVE")?;
    expect_tag(bytes, 0x0C, b"fmt ")?;
    expect_tag(bytes, 0x24, b"data")?;

    let fmt_len = read_u32(bytes, 0x10);
    if fmt_len != FMT_CHUNK_LEN {
        return Err(Error::Format(format!("Unsupported fmt chunk size: {}", fmt_len)));
    }

    let audio_format = read_u16(bytes, 0x14);
    if audio_format != FORMAT_PCM {
        return Err(Error::Format(format!(
            "Unsupported audio format {} (only PCM = 1)",
            audio_format
        )));
    }

    let channels = read_u16(bytes, 0x16);
    let sample_rate = read_u32(bytes, 0x18);
    let byte_rate = read_u32(bytes, 0x1C);
    let block_align = read_u16(bytes, 0x20);
    let bits_per_sample = read_u16(bytes, 0x22);
    let riff_size = read_u32(bytes, 0x04);
    let data_size = read_u32(bytes, 0x28);

    check_supported(channels, bits_per_sample)?;
    if sample_rate == 0 {
        return Err(Error::Format("Sample rate is zero".to_string()));
    }

    let format = PcmFormat::pcm8(sample_rate as f64, channels);
    let expected_align = format.bytes_per_frame() as u16;
    if block_align != expected_align {
        return Err(Error::Format(format!(
            "Block align {} does not match {} channels x {} bits",
            block_align, channels, bits_per_sample
        )));
    }
    if checked_byte_rate(sample_rate, expected_align) != Some(byte_rate) {
        return Err(Error::Format(format!(
            "Byte rate {} does not match sample rate {} x block align {}",
            byte_rate, sample_rate, block_align
        )));
    }
    if data_size.checked_add(RIFF_OVERHEAD) != Some(riff_size) {
        return Err(Error::Format(format!(
            "RIFF size {} does not match data size {} + {}",
            riff_size, data_size, RIFF_OVERHEAD
        )));
    }

    let payload = &bytes[HEADER_LEN..];
    let data_size = data_size as usize;
    if payload.len() < data_size {
        return Err(Error::Format(format!(
            "Truncated payload: header declares {} bytes, found {}",
            data_size,
            payload.len()
        )));
    }

    Ok(SampleBuffer::new(format, payload[..data_size].to_vec()))
}

fn check_supported(channels: u16, bits_per_sample: u16) -> Result<()> {
    if !(1..=2).contains(&channels) {
        return Err(Error::Format(format!("Unsupported channel count: {}", channels)));
    }
    if bits_per_sample != 8 {
        return Err(Error::Format(format!(
            "Unsupported bit depth: {} (only 8-bit PCM)",
            bits_per_sample
        )));
    }
    Ok(())
}

fn checked_byte_rate(sample_rate: u32, block_align: u16) -> Option<u32> {
    sample_rate.checked_mul(block_align as u32)
}

fn header_rate(sample_rate: f64) -> Result<u32> {
    if !sample_rate.is_finite() || sample_rate < 1.0 || sample_rate > u32::MAX as f64 {
        return Err(Error::Format(format!("Invalid sample rate: {}", sample_rate)));
    }
    Ok(sample_rate.round() as u32)
}

fn expect_tag(bytes: &[u8], offset: usize, tag: &[u8; 4]) -> Result<()> {
    let found = &bytes[offset..offset + 4];
    if found != tag {
        return Err(Error::Format(format!(
            "Expected {:?} at offset {:#04x}, found {:?}",
            String::from_utf8_lossy(tag),
            offset,
            String::from_utf8_lossy(found)
        )));
    }
    Ok(())
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
