//! Sample playback: session state machine and streaming output

pub mod player;
pub mod session;

pub use player::{Completion, CompletionHandler, CompletionTicket, CpalPlayer, StreamingPlayer};
pub use session::{BusyPolicy, PlaybackSession, SessionSettings};
