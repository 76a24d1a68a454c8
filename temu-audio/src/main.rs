//! TEmu audio tool - manual playback, tone and WAV wrapping
//!
//! Drives the same session and synthesizer the emulator uses, so samples can
//! be auditioned without running a console program.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use temu_audio::audio::{output, wav, PcmFormat};
use temu_audio::playback::{CpalPlayer, PlaybackSession};
use temu_audio::tone::{ToneDevice, ToneSynthesizer};
use temu_audio::config::MAX_TARGET_DURATION_SECS;
use temu_audio::AudioConfig;
use temu_common::events::{AudioEvent, EventBus};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Extra wait beyond the nominal buffer length before giving up on completion
const COMPLETION_GRACE: Duration = Duration::from_secs(2);

/// Command-line arguments for temu-audio
#[derive(Parser, Debug)]
#[command(name = "temu-audio")]
#[command(about = "Audio output tool for the TEmu emulator")]
#[command(version = version_string())]
struct Args {
    /// Configuration file (overrides TEMU_AUDIO_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a sample file through a playback session
    Play {
        path: PathBuf,

        /// Treat the file as headerless console PCM
        #[arg(long)]
        raw: bool,

        /// Loop or truncate to this many seconds
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Play a sine tone
    Tone {
        #[arg(short, long)]
        frequency: Option<f64>,

        /// Loudness, 0.0..=1.0
        #[arg(short, long)]
        volume: Option<f64>,

        /// Seconds
        #[arg(short, long, default_value = "1.0")]
        duration: f64,
    },

    /// Wrap a raw console sample in a WAV header
    Wrap {
        raw: PathBuf,
        out: PathBuf,

        #[arg(long, default_value = "8000")]
        rate: f64,

        #[arg(long, default_value = "2")]
        channels: u16,
    },

    /// List audio output devices
    Devices,
}

const fn version_string() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_HASH"),
        ", built ",
        env!("BUILD_TIMESTAMP"),
        ")"
    )
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = AudioConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    let default_filter = format!(
        "temu_audio={level},temu_common={level}",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Command::Play { path, raw, duration } => play(&config, &path, raw, duration),
        Command::Tone {
            frequency,
            volume,
            duration,
        } => tone(&config, frequency, volume, duration),
        Command::Wrap {
            raw,
            out,
            rate,
            channels,
        } => wrap(&raw, &out, rate, channels),
        Command::Devices => devices(),
    }
}

fn play(config: &AudioConfig, path: &Path, raw: bool, duration: Option<f64>) -> Result<()> {
    let mut settings = config.session_settings();
    if let Some(duration) = duration {
        settings.target_duration = duration;
    }
    let wait = duration_arg(settings.target_duration)? + COMPLETION_GRACE;

    let events = EventBus::default();
    let mut rx = events.subscribe();
    let player = CpalPlayer::new(config.device.clone(), config.playback.output_sample_rate);
    let mut session = PlaybackSession::new(player, settings, events);

    let result = session
        .play(path, raw)
        .with_context(|| format!("Failed to play {}", path.display()));
    print_events(&mut rx);
    result?;

    let state = session.wait_for_completion(wait);
    print_events(&mut rx);
    info!("Playback finished in state {}", state);

    session.stop().context("Failed to stop playback")?;
    print_events(&mut rx);
    Ok(())
}

fn tone(config: &AudioConfig, frequency: Option<f64>, volume: Option<f64>, duration: f64) -> Result<()> {
    let length = duration_arg(duration)?;
    let mut synth = ToneSynthesizer::new(config.tone_settings());
    let controls = synth.controls().clone();
    if let Some(frequency) = frequency {
        controls.set_frequency(frequency);
    }
    if let Some(volume) = volume {
        controls.set_volume(volume);
    }

    synth.enable().context("Failed to enable tone output")?;
    controls.set_duration(duration);
    info!(
        "Playing {}Hz at volume {:.2} for {}s",
        controls.frequency(),
        controls.volume(),
        duration
    );

    std::thread::sleep(length + Duration::from_millis(100));
    synth.stop().context("Failed to stop tone output")?;
    Ok(())
}

/// Validate a `--duration` value in seconds
fn duration_arg(secs: f64) -> Result<Duration> {
    let length = Duration::try_from_secs_f64(secs)
        .with_context(|| format!("Invalid duration: {}", secs))?;
    anyhow::ensure!(
        secs <= MAX_TARGET_DURATION_SECS,
        "Duration {}s exceeds the {}s limit",
        secs,
        MAX_TARGET_DURATION_SECS
    );
    Ok(length)
}

fn wrap(raw: &Path, out: &Path, rate: f64, channels: u16) -> Result<()> {
    let payload = std::fs::read(raw).with_context(|| format!("Failed to read {}", raw.display()))?;
    let bytes = wav::encode(&payload, &PcmFormat::pcm8(rate, channels))
        .with_context(|| format!("Cannot wrap {}", raw.display()))?;
    std::fs::write(out, bytes).with_context(|| format!("Failed to write {}", out.display()))?;

    info!(
        "Wrote {} ({} bytes of {}Hz x{} PCM)",
        out.display(),
        payload.len(),
        rate,
        channels
    );
    Ok(())
}

fn devices() -> Result<()> {
    let names = output::list_devices().context("Failed to list audio devices")?;
    if names.is_empty() {
        println!("No output devices found");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

/// Print pending session events as JSON lines
fn print_events(rx: &mut broadcast::Receiver<AudioEvent>) {
    loop {
        match rx.try_recv() {
            Ok(event) => match event.to_json() {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!("Unprintable event: {}", e),
            },
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Missed {} playback events", skipped);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_arg_bounds() {
        assert_eq!(duration_arg(1.5).unwrap(), Duration::from_millis(1500));
        assert_eq!(duration_arg(0.0).unwrap(), Duration::ZERO);
        for bad in [-1.0, f64::NAN, f64::INFINITY, 1e30, MAX_TARGET_DURATION_SECS + 1.0] {
            assert!(duration_arg(bad).is_err(), "accepted {}", bad);
        }
    }
}
