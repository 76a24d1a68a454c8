//! On-disk sample fixtures
//!
//! Deterministic 8-bit PCM written into a temporary directory that lives as
//! long as the returned `TempDir`.

use std::path::PathBuf;
use tempfile::TempDir;
use temu_audio::audio::{wav, PcmFormat};

/// `seconds` of 8-bit interleaved PCM: a sawtooth centred on 128
pub fn sawtooth_pcm8(seconds: f64, sample_rate: f64, channels: u16) -> Vec<u8> {
    let frames = (seconds * sample_rate).round() as usize;
    let mut bytes = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let value = 64 + (i % 128) as u8;
        for _ in 0..channels {
            bytes.push(value);
        }
    }
    bytes
}

/// Write `bytes` as `name` in a fresh temp directory
pub fn write_fixture(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}

/// Raw console sample file (8 kHz stereo)
pub fn raw_console_sample(seconds: f64) -> (TempDir, PathBuf) {
    write_fixture("sample.raw", &sawtooth_pcm8(seconds, 8000.0, 2))
}

/// WAV-wrapped sample file
pub fn wav_sample(seconds: f64, format: PcmFormat) -> (TempDir, PathBuf) {
    let payload = sawtooth_pcm8(seconds, format.sample_rate, format.channel_count);
    write_fixture("sample.wav", &wav::encode(&payload, &format).unwrap())
}
