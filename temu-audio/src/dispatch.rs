//! Audio device dispatch
//!
//! Entry point for the emulator's device-I/O layer. Commands are routed either
//! to the tone synthesizer or to the playback session; the two never interact.

use crate::error::Result;
use crate::playback::{PlaybackSession, StreamingPlayer};
use crate::tone::ToneDevice;
use std::path::PathBuf;
use temu_common::events::PlaybackState;
use tracing::{debug, info};

/// Audio status port (read side not emulated)
pub const PORT_STATUS: u8 = 0x2;

/// "Play a sound" port
pub const PORT_PLAY: u8 = 0xF;

/// Fixed parameters of the console's built-in beep
pub const BEEP_FREQUENCY: f64 = 500.0;
pub const BEEP_AMPLITUDE: f64 = 8000.0;
pub const BEEP_GATE_TIME: f64 = 1.0;

/// Command from the emulator core
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    /// `volume` is a raw 16-bit amplitude (0..=32767); `gate_time` in seconds
    PlayTone {
        frequency: f64,
        volume: f64,
        gate_time: f64,
    },
    PlaySample { path: PathBuf, raw: bool },
    StopTone,
    StopSample,
}

impl AudioCommand {
    /// Decode a write to an audio port
    pub fn from_port(port: u8, value: u8) -> Option<Self> {
        match (port, value) {
            (PORT_PLAY, v) if v != 0 => Some(AudioCommand::PlayTone {
                frequency: BEEP_FREQUENCY,
                volume: BEEP_AMPLITUDE,
                gate_time: BEEP_GATE_TIME,
            }),
            (PORT_STATUS, 0) => {
                debug!("Audio status port 0x{:X} is not emulated", PORT_STATUS);
                None
            }
            _ => None,
        }
    }
}

/// The console's audio hardware: one tone generator plus one sample stream
pub struct AudioUnit<T: ToneDevice, P: StreamingPlayer> {
    tone: T,
    session: PlaybackSession<P>,
}

impl<T: ToneDevice, P: StreamingPlayer> AudioUnit<T, P> {
    pub fn new(tone: T, session: PlaybackSession<P>) -> Self {
        Self { tone, session }
    }

    pub fn tone(&self) -> &T {
        &self.tone
    }

    pub fn session(&self) -> &PlaybackSession<P> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PlaybackSession<P> {
        &mut self.session
    }

    /// Current sample playback state
    pub fn playback_state(&mut self) -> PlaybackState {
        self.session.refresh()
    }

    pub fn dispatch(&mut self, command: AudioCommand) -> Result<()> {
        match command {
            AudioCommand::PlayTone {
                frequency,
                volume,
                gate_time,
            } => {
                debug!("Tone {}Hz amplitude {} for {}s", frequency, volume, gate_time);
                let controls = self.tone.controls();
                controls.set_frequency(frequency);
                controls.set_amplitude(volume);
                self.tone.enable()?;
                self.tone.controls().set_duration(gate_time);
                Ok(())
            }
            AudioCommand::PlaySample { path, raw } => {
                info!("Sample requested: {} (raw={})", path.display(), raw);
                self.session.play(&path, raw)
            }
            AudioCommand::StopTone => self.tone.stop(),
            AudioCommand::StopSample => self.session.stop(),
        }
    }

    /// Handle a CPU write to an audio port. Unrecognised writes are ignored.
    pub fn port_write(&mut self, port: u8, value: u8) -> Result<()> {
        match AudioCommand::from_port(port, value) {
            Some(command) => self.dispatch(command),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_port_decodes_beep() {
        assert_eq!(
            AudioCommand::from_port(0xF, 1),
            Some(AudioCommand::PlayTone {
                frequency: 500.0,
                volume: 8000.0,
                gate_time: 1.0
            })
        );
        assert_eq!(AudioCommand::from_port(0xF, 0), None);
    }

    #[test]
    fn test_other_ports_ignored() {
        assert_eq!(AudioCommand::from_port(0x2, 0), None);
        assert_eq!(AudioCommand::from_port(0x2, 5), None);
        assert_eq!(AudioCommand::from_port(0x7, 1), None);
    }
}
