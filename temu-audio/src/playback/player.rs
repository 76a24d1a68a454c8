//! Streaming player abstraction and its cpal implementation
//!
//! A player is attached to an output endpoint once, then accepts one
//! play-ready buffer at a time: attach → schedule → play → stop.
//!
//! **Real-time handoff:** `CpalPlayer` never shares a lock with its data
//! callback. Scheduled buffers travel control → render through a ringbuf SPSC
//! queue; finished or discarded buffers travel back render → control so they
//! are deallocated off the audio thread.

use crate::audio::output::{negotiate_config, open_device};
use crate::audio::{AudioFrame, HostBuffer};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Buffers that may be queued toward the render thread at once
const PENDING_DEPTH: usize = 4;

/// Spent buffers the render thread can hand back before control drains them.
///
/// `schedule` drains before every push, so at most `PENDING_DEPTH` queued
/// voices plus the one playing can be retired between drains.
const SPENT_DEPTH: usize = PENDING_DEPTH + 1;

/// How a scheduled buffer left the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every frame was rendered
    PlayedBack,
    /// Discarded by `stop()` before playing out
    Flushed,
}

/// Invoked once per scheduled buffer, possibly on the render thread.
///
/// Must not block or allocate.
pub type CompletionHandler = Box<dyn Fn(Completion) + Send + Sync + 'static>;

/// Guarantees a completion handler fires exactly once even when `stop()` on
/// the control thread races the render thread finishing the buffer.
pub struct CompletionTicket {
    fired: AtomicBool,
    handler: CompletionHandler,
}

impl CompletionTicket {
    pub fn new(handler: CompletionHandler) -> Arc<Self> {
        Arc::new(Self {
            fired: AtomicBool::new(false),
            handler,
        })
    }

    /// Fire the handler unless already fired. Returns whether this call fired it.
    pub fn fire(&self, completion: Completion) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        (self.handler)(completion);
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for CompletionTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTicket")
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// Output stage of a playback session
pub trait StreamingPlayer {
    /// Connect to the output endpoint. Called once before the first schedule.
    fn attach(&mut self) -> Result<()>;

    fn is_attached(&self) -> bool;

    /// Hand one buffer to the output stage. `on_complete` fires exactly once.
    fn schedule(&mut self, buffer: HostBuffer, on_complete: CompletionHandler) -> Result<()>;

    /// Start (or keep) the output running
    fn play(&mut self) -> Result<()>;

    /// Halt output immediately and flush any scheduled buffer. Idempotent.
    fn stop(&mut self) -> Result<()>;

    fn is_running(&self) -> bool;
}

/// A buffer as seen by the render thread
struct Voice {
    buffer: HostBuffer,
    cursor: usize,
    generation: u64,
    ticket: Arc<CompletionTicket>,
}

/// State owned exclusively by the cpal data callback
struct RenderState {
    pending: HeapCons<Voice>,
    spent: HeapProd<Voice>,
    current: Option<Voice>,
    generation: Arc<AtomicU64>,
}

impl RenderState {
    /// Drop stale voices and pick up the next pending one
    fn begin_period(&mut self) {
        let live = self.generation.load(Ordering::Acquire);

        if self.current.as_ref().is_some_and(|v| v.generation != live) {
            self.retire_current();
        }

        while self.current.is_none() {
            match self.pending.try_pop() {
                Some(voice) if voice.generation == live => self.current = Some(voice),
                Some(stale) => self.retire(stale),
                None => break,
            }
        }
    }

    fn next_frame(&mut self) -> AudioFrame {
        let Some(voice) = self.current.as_mut() else {
            return AudioFrame::zero();
        };

        if let Some(mut frame) = voice.buffer.frame(voice.cursor) {
            voice.cursor += 1;
            frame.clamp();
            return frame;
        }

        voice.ticket.fire(Completion::PlayedBack);
        self.retire_current();
        self.begin_period();
        if self.current.is_some() {
            self.next_frame()
        } else {
            AudioFrame::zero()
        }
    }

    fn retire_current(&mut self) {
        if let Some(voice) = self.current.take() {
            self.retire(voice);
        }
    }

    fn retire(&mut self, voice: Voice) {
        // Never full: SPENT_DEPTH covers every voice alive between drains
        let _ = self.spent.try_push(voice);
    }

    fn render_f32(&mut self, data: &mut [f32], channels: usize) {
        self.begin_period();
        for frame in data.chunks_mut(channels) {
            let audio_frame = self.next_frame();
            frame[0] = audio_frame.left;
            if channels > 1 {
                frame[1] = audio_frame.right;
            }
            for extra in frame.iter_mut().skip(2) {
                *extra = 0.0;
            }
        }
    }

    fn render_i16(&mut self, data: &mut [i16], channels: usize) {
        self.begin_period();
        for frame in data.chunks_mut(channels) {
            let audio_frame = self.next_frame();
            frame[0] = (audio_frame.left * i16::MAX as f32) as i16;
            if channels > 1 {
                frame[1] = (audio_frame.right * i16::MAX as f32) as i16;
            }
            for extra in frame.iter_mut().skip(2) {
                *extra = 0;
            }
        }
    }
}

/// Streaming player backed by a cpal output stream.
///
/// Not `Send`: the cpal stream must stay on the control thread that built it.
pub struct CpalPlayer {
    device_name: Option<String>,
    sample_rate: u32,
    stream: Option<Stream>,
    pending: Option<HeapProd<Voice>>,
    spent: Option<HeapCons<Voice>>,
    generation: Arc<AtomicU64>,
    in_flight: Option<Arc<CompletionTicket>>,
    running: bool,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
}

impl CpalPlayer {
    /// Player for `device_name` (None = default device) at `sample_rate`.
    /// No hardware is touched until `attach()`.
    pub fn new(device_name: Option<String>, sample_rate: u32) -> Self {
        Self {
            device_name,
            sample_rate,
            stream: None,
            pending: None,
            spent: None,
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
            running: false,
            error_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the stream error callback has reported a failure
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// Deallocate buffers handed back by the render thread
    fn drain_spent(&mut self) {
        if let Some(spent) = self.spent.as_mut() {
            let mut drained = 0;
            while spent.try_pop().is_some() {
                drained += 1;
            }
            if drained > 0 {
                debug!("Released {} spent buffers", drained);
            }
        }
        if self.in_flight.as_ref().is_some_and(|t| t.has_fired()) {
            self.in_flight = None;
        }
    }

    fn build_stream(
        &self,
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        mut render: RenderState,
    ) -> Result<Stream> {
        let channels = config.channels as usize;
        let error_flag = Arc::clone(&self.error_flag);
        let on_error = move |err: cpal::StreamError| {
            error!("Playback stream error: {}", err);
            error_flag.store(true, Ordering::SeqCst);
        };

        let stream = match sample_format {
            SampleFormat::F32 => device.build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| render.render_f32(data, channels),
                on_error,
                None,
            ),
            SampleFormat::I16 => device.build_output_stream(
                config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| render.render_i16(data, channels),
                on_error,
                None,
            ),
            other => {
                return Err(Error::Conversion(format!("Unsupported sample format: {:?}", other)));
            }
        };

        stream.map_err(|e| Error::Hardware(format!("Failed to build stream: {}", e)))
    }
}

impl StreamingPlayer for CpalPlayer {
    fn attach(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let device = open_device(self.device_name.as_deref())?;
        let (config, sample_format) = negotiate_config(
            &device,
            self.sample_rate,
            2,
            &[SampleFormat::F32, SampleFormat::I16],
        )?
        .ok_or_else(|| {
            Error::Conversion(format!(
                "Output device cannot accept {}Hz stereo f32/i16",
                self.sample_rate
            ))
        })?;

        let (pending_prod, pending_cons) = HeapRb::<Voice>::new(PENDING_DEPTH).split();
        let (spent_prod, spent_cons) = HeapRb::<Voice>::new(SPENT_DEPTH).split();
        let render = RenderState {
            pending: pending_cons,
            spent: spent_prod,
            current: None,
            generation: Arc::clone(&self.generation),
        };

        let stream = self.build_stream(&device, &config, sample_format, render)?;
        // Some hosts start streams immediately; stay silent until play()
        if let Err(e) = stream.pause() {
            debug!("Stream pause after build not supported: {}", e);
        }

        info!(
            "Player attached: {}Hz, {} channels, {:?}",
            config.sample_rate.0, config.channels, sample_format
        );
        self.stream = Some(stream);
        self.pending = Some(pending_prod);
        self.spent = Some(spent_cons);
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.stream.is_some()
    }

    fn schedule(&mut self, buffer: HostBuffer, on_complete: CompletionHandler) -> Result<()> {
        self.drain_spent();

        let ticket = CompletionTicket::new(on_complete);
        let voice = Voice {
            buffer,
            cursor: 0,
            generation: self.generation.load(Ordering::Acquire),
            ticket: Arc::clone(&ticket),
        };

        let pending = self
            .pending
            .as_mut()
            .ok_or_else(|| Error::Hardware("Player is not attached".to_string()))?;

        if pending.try_push(voice).is_err() {
            return Err(Error::Hardware("Player queue is full".to_string()));
        }

        debug!("Buffer scheduled");
        self.in_flight = Some(ticket);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| Error::Hardware("Player is not attached".to_string()))?;

        stream
            .play()
            .map_err(|e| Error::Hardware(format!("Failed to start stream: {}", e)))?;

        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        // Render thread discards anything stamped with an older generation
        self.generation.fetch_add(1, Ordering::AcqRel);

        let result = match self.stream.as_ref() {
            Some(stream) if self.running => stream
                .pause()
                .map_err(|e| Error::Hardware(format!("Failed to pause stream: {}", e))),
            _ => Ok(()),
        };
        self.running = false;

        if let Some(ticket) = self.in_flight.take() {
            if ticket.fire(Completion::Flushed) {
                debug!("In-flight buffer flushed by stop");
            }
        }
        self.drain_spent();

        if let Err(ref e) = result {
            warn!("Stop did not pause cleanly: {}", e);
        }
        result
    }

    fn is_running(&self) -> bool {
        self.running && self.stream.is_some()
    }
}

impl Drop for CpalPlayer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
