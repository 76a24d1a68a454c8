//! Playback session: load → shape → convert → schedule → play
//!
//! One session owns one streaming player and carries at most one buffer in
//! flight. Preparation runs synchronously on the control thread and may block
//! on file I/O; only the completion notification crosses from the render
//! thread, through an atomic state cell.
//!
//! States: Idle → Loading → Converting → Scheduled → Playing → Idle, with
//! Stopped reachable from any state via `stop()` or a failed request.

use crate::audio::shaper::{self, Envelope};
use crate::audio::{wav, FormatConverter, HostBuffer, PcmFormat, SampleBuffer};
use crate::error::{Error, Result};
use crate::playback::player::{Completion, StreamingPlayer};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use temu_common::events::{AudioEvent, EventBus, PlaybackState};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Poll interval used while waiting for completion
const COMPLETION_POLL: Duration = Duration::from_millis(10);

/// What `play()` does when a buffer is already in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Fail the new request with `Error::Busy`
    #[default]
    Reject,
    /// Stop the in-flight buffer and play the new one
    Replace,
}

/// Pipeline parameters for a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Every sample is looped or truncated to this many seconds
    pub target_duration: f64,
    /// Layout assumed for raw (headerless) sample files
    pub raw_format: PcmFormat,
    /// Play-ready layout handed to the player
    pub output_format: PcmFormat,
    pub envelope: Envelope,
    pub busy_policy: BusyPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            target_duration: 9.0,
            raw_format: PcmFormat::console(),
            output_format: PcmFormat::host(),
            envelope: Envelope::default(),
            busy_policy: BusyPolicy::Reject,
        }
    }
}

/// State cell shared with the completion handler
#[derive(Debug)]
struct SessionShared {
    state: AtomicU8,
    completions: AtomicU64,
}

impl SessionShared {
    fn load(&self) -> PlaybackState {
        state_from_u8(self.state.load(Ordering::Acquire))
    }

    fn store(&self, state: PlaybackState) {
        self.state.store(state_to_u8(state), Ordering::Release);
    }

    fn compare_exchange(&self, from: PlaybackState, to: PlaybackState) -> bool {
        self.state
            .compare_exchange(state_to_u8(from), state_to_u8(to), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Runs on the render thread: atomics only
    fn complete(&self, completion: Completion) {
        self.completions.fetch_add(1, Ordering::AcqRel);
        if completion == Completion::PlayedBack
            && !self.compare_exchange(PlaybackState::Playing, PlaybackState::Idle)
        {
            self.compare_exchange(PlaybackState::Scheduled, PlaybackState::Idle);
        }
    }
}

fn state_to_u8(state: PlaybackState) -> u8 {
    match state {
        PlaybackState::Idle => 0,
        PlaybackState::Loading => 1,
        PlaybackState::Converting => 2,
        PlaybackState::Scheduled => 3,
        PlaybackState::Playing => 4,
        PlaybackState::Stopped => 5,
    }
}

fn state_from_u8(value: u8) -> PlaybackState {
    match value {
        0 => PlaybackState::Idle,
        1 => PlaybackState::Loading,
        2 => PlaybackState::Converting,
        3 => PlaybackState::Scheduled,
        4 => PlaybackState::Playing,
        _ => PlaybackState::Stopped,
    }
}

/// Explicitly owned playback handle, one per concurrent stream
pub struct PlaybackSession<P: StreamingPlayer> {
    id: Uuid,
    player: P,
    settings: SessionSettings,
    shared: Arc<SessionShared>,
    /// Last state published on the event bus
    reported: PlaybackState,
    events: EventBus,
    source_path: Option<PathBuf>,
    is_raw: bool,
    input_format: Option<PcmFormat>,
}

impl<P: StreamingPlayer> PlaybackSession<P> {
    pub fn new(player: P, settings: SessionSettings, events: EventBus) -> Self {
        let id = Uuid::new_v4();
        debug!("Playback session {} created", id);
        Self {
            id,
            player,
            settings,
            shared: Arc::new(SessionShared {
                state: AtomicU8::new(state_to_u8(PlaybackState::Idle)),
                completions: AtomicU64::new(0),
            }),
            reported: PlaybackState::Idle,
            events,
            source_path: None,
            is_raw: false,
            input_format: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Path of the most recent play request
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn is_raw(&self) -> bool {
        self.is_raw
    }

    /// Format of the most recently loaded sample
    pub fn input_format(&self) -> Option<&PcmFormat> {
        self.input_format.as_ref()
    }

    pub fn output_format(&self) -> &PcmFormat {
        &self.settings.output_format
    }

    /// Completion notifications received so far (played back or flushed)
    pub fn completions(&self) -> u64 {
        self.shared.completions.load(Ordering::Acquire)
    }

    /// Current state. Publishes any transition made by the render thread.
    pub fn state(&mut self) -> PlaybackState {
        self.refresh()
    }

    /// Reconcile the published state with the shared cell
    pub fn refresh(&mut self) -> PlaybackState {
        let actual = self.shared.load();
        if actual != self.reported {
            self.publish(actual);
        }
        actual
    }

    /// Load, prepare and start playing `path`.
    ///
    /// `is_raw` selects headerless console PCM in the session's raw format;
    /// otherwise the file must be a canonical WAV.
    ///
    /// # Errors
    /// - `Error::Busy` if a buffer is in flight and the policy is `Reject`
    /// - `Error::FileNotFound`, `Error::Format`, `Error::EmptySource`,
    ///   `Error::Conversion`, `Error::Hardware` abort the request and leave the
    ///   session Stopped
    pub fn play(&mut self, path: impl AsRef<Path>, is_raw: bool) -> Result<()> {
        let path = path.as_ref();
        let current = self.refresh();

        if !current.accepts_request() {
            match self.settings.busy_policy {
                BusyPolicy::Reject => {
                    warn!("Session {} busy ({}), rejecting {}", self.id, current, path.display());
                    return Err(Error::Busy);
                }
                BusyPolicy::Replace => {
                    info!("Session {} replacing in-flight buffer", self.id);
                    self.stop()?;
                }
            }
        }

        // Stopped is terminal for the previous request
        if self.reported == PlaybackState::Stopped {
            self.transition(PlaybackState::Idle);
        }

        self.source_path = Some(path.to_path_buf());
        self.is_raw = is_raw;
        self.transition(PlaybackState::Loading);

        let buffer = match self.prepare(path, is_raw) {
            Ok(buffer) => buffer,
            Err(e) => return Err(self.fail(e)),
        };

        if let Err(e) = self.schedule(buffer) {
            return Err(self.fail(e));
        }

        if let Err(e) = self.player.play() {
            return Err(self.fail(e));
        }

        if self.shared.compare_exchange(PlaybackState::Scheduled, PlaybackState::Playing) {
            self.publish(PlaybackState::Playing);
        } else {
            // Already played out before we got here
            self.refresh();
        }
        info!("Session {} playing {}", self.id, path.display());
        Ok(())
    }

    /// Halt output immediately. Idempotent from any state.
    pub fn stop(&mut self) -> Result<()> {
        let result = self.player.stop();
        self.refresh();
        if self.reported != PlaybackState::Stopped {
            self.transition(PlaybackState::Stopped);
            info!("Session {} stopped", self.id);
        }
        result
    }

    /// Block until the in-flight buffer completes or `timeout` elapses.
    /// Returns the state at return.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> PlaybackState {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.refresh();
            if !state.is_in_flight() || Instant::now() >= deadline {
                return state;
            }
            std::thread::sleep(COMPLETION_POLL);
        }
    }

    /// Loading and Converting stages
    fn prepare(&mut self, path: &Path, is_raw: bool) -> Result<HostBuffer> {
        let bytes = load_file(path)?;
        let sample = if is_raw {
            SampleBuffer::new(self.settings.raw_format, bytes)
        } else {
            wav::decode(&bytes)?
        };
        debug!(
            "Loaded {} bytes of {}Hz x{} PCM from {}",
            sample.bytes.len(),
            sample.format.sample_rate,
            sample.format.channel_count,
            path.display()
        );
        self.input_format = Some(sample.format);

        self.transition(PlaybackState::Converting);
        let format = sample.format;
        let looped = shaper::loop_to_duration(
            &sample.bytes,
            self.settings.target_duration,
            format.sample_rate,
            format.channel_count,
        )?;
        let shaped = shaper::apply_envelope(
            &looped,
            &self.settings.envelope,
            format.sample_rate,
            format.channel_count,
        );

        let mut converter = FormatConverter::new(format, self.settings.output_format)?;
        converter.convert_buffer(SampleBuffer::new(format, shaped))
    }

    /// Converting → Scheduled
    fn schedule(&mut self, buffer: HostBuffer) -> Result<()> {
        if !self.player.is_attached() {
            self.player.attach()?;
        }

        // Scheduled must be visible before the render thread can complete it
        self.transition(PlaybackState::Scheduled);
        let shared = Arc::clone(&self.shared);
        self.player
            .schedule(buffer, Box::new(move |completion| shared.complete(completion)))
    }

    /// Abort the current request: flush anything handed to the player and
    /// leave the session Stopped.
    fn fail(&mut self, error: Error) -> Error {
        warn!("Session {} play request failed: {}", self.id, error);
        if self.reported.is_in_flight() {
            if let Err(e) = self.player.stop() {
                warn!("Session {} could not stop player after failure: {}", self.id, e);
            }
        }
        self.transition(PlaybackState::Stopped);
        self.events.emit_lossy(AudioEvent::failed(self.id, error.to_string()));
        error
    }

    fn transition(&mut self, to: PlaybackState) {
        self.shared.store(to);
        self.publish(to);
    }

    fn publish(&mut self, to: PlaybackState) {
        debug!("Session {} {} -> {}", self.id, self.reported, to);
        self.events
            .emit_lossy(AudioEvent::state_changed(self.id, self.reported, to));
        self.reported = to;
    }
}

impl<P: StreamingPlayer> Drop for PlaybackSession<P> {
    fn drop(&mut self) {
        let _ = self.player.stop();
    }
}

fn load_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => Error::Io(e),
    })
}
