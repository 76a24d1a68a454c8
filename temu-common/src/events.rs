//! Event types for the TEmu audio subsystem
//!
//! The audio core exposes playback-state transitions only; rendering itself is
//! opaque to the device-I/O layer. Events are broadcast via [`EventBus`].

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Playback session state
///
/// Idle → Loading → Converting → Scheduled → Playing, with Stopped reachable
/// from any state. Stopped is terminal for a request; the next play request
/// starts over from Loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Loading,
    Converting,
    Scheduled,
    Playing,
    Stopped,
}

impl PlaybackState {
    /// Whether a buffer is currently owned by the output stage
    pub fn is_in_flight(self) -> bool {
        matches!(self, PlaybackState::Scheduled | PlaybackState::Playing)
    }

    /// Whether a new play request may start without displacing anything
    pub fn accepts_request(self) -> bool {
        matches!(self, PlaybackState::Idle | PlaybackState::Stopped)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Converting => write!(f, "converting"),
            PlaybackState::Scheduled => write!(f, "scheduled"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Audio subsystem events
///
/// Serializable so the device-I/O layer can forward them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AudioEvent {
    /// Playback session moved between states
    PlaybackStateChanged {
        /// Session that changed state
        session_id: Uuid,
        /// State before change
        old_state: PlaybackState,
        /// State after change
        new_state: PlaybackState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A play request was aborted; the session is Stopped
    PlaybackFailed {
        /// Session whose request failed
        session_id: Uuid,
        /// Human readable error
        error: String,
        /// When the failure happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AudioEvent {
    /// Build a state change event stamped with the current time
    pub fn state_changed(session_id: Uuid, old_state: PlaybackState, new_state: PlaybackState) -> Self {
        AudioEvent::PlaybackStateChanged {
            session_id,
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Build a failure event stamped with the current time
    pub fn failed(session_id: Uuid, error: impl Into<String>) -> Self {
        AudioEvent::PlaybackFailed {
            session_id,
            error: error.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Session this event belongs to
    pub fn session_id(&self) -> Uuid {
        match self {
            AudioEvent::PlaybackStateChanged { session_id, .. } => *session_id,
            AudioEvent::PlaybackFailed { session_id, .. } => *session_id,
        }
    }

    /// Serialize as a single JSON line
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Broadcast bus for [`AudioEvent`]s
///
/// Cloning shares the same channel. Emission never blocks and must only be
/// done from the control context, never from a render callback.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AudioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers lose old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<AudioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: AudioEvent) -> Result<usize, broadcast::error::SendError<AudioEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: AudioEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
