//! Hardware-free streaming player
//!
//! Records every scheduled buffer and keeps the latest completion ticket so a
//! test can finish (or race) playback on its own schedule.

use std::sync::Arc;
use temu_audio::audio::HostBuffer;
use temu_audio::error::{Error, Result};
use temu_audio::playback::{Completion, CompletionHandler, CompletionTicket, StreamingPlayer};

#[derive(Debug, Default)]
pub struct MockPlayer {
    pub attached: bool,
    pub running: bool,
    /// Make `attach()` fail with a hardware error
    pub fail_attach: bool,
    pub attach_calls: usize,
    pub stop_calls: usize,
    pub buffers: Vec<HostBuffer>,
    ticket: Option<Arc<CompletionTicket>>,
}

impl MockPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_attach: true,
            ..Self::default()
        }
    }

    /// Ticket of the most recently scheduled buffer
    pub fn last_ticket(&self) -> Option<Arc<CompletionTicket>> {
        self.ticket.clone()
    }

    /// Simulate the render thread playing the buffer out
    pub fn complete(&self) -> bool {
        self.ticket
            .as_ref()
            .is_some_and(|t| t.fire(Completion::PlayedBack))
    }
}

impl StreamingPlayer for MockPlayer {
    fn attach(&mut self) -> Result<()> {
        self.attach_calls += 1;
        if self.fail_attach {
            return Err(Error::Hardware("mock device unavailable".to_string()));
        }
        self.attached = true;
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn schedule(&mut self, buffer: HostBuffer, on_complete: CompletionHandler) -> Result<()> {
        if !self.attached {
            return Err(Error::Hardware("Player is not attached".to_string()));
        }
        self.buffers.push(buffer);
        self.ticket = Some(CompletionTicket::new(on_complete));
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if !self.attached {
            return Err(Error::Hardware("Player is not attached".to_string()));
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.stop_calls += 1;
        self.running = false;
        if let Some(ticket) = self.ticket.as_ref() {
            ticket.fire(Completion::Flushed);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
