//! Control-side handle of the realtime renderer.
//!
//! ```text
//!   RealtimeContext (clone per voice)            Renderer (audio callback)
//!   ─────────────────────────────────            ─────────────────────────
//!   schedule / set_waveform / create_chain       drain ring buffer
//!        │                                       render blocks
//!        └──► Mutex<Producer> ──► rtrb ──►──►──  publish frames rendered
//!                                                       │
//!   current_time() ◄──────────── AtomicU64 ◄────────────┘
//! ```
//!
//! The mutex only serializes producers on the control side; the render side
//! never takes a lock.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rtrb::{Producer, PushError, RingBuffer};

use super::chain::VoiceChain;
use super::message::RenderCommand;
use super::Renderer;
use crate::audio::{
    AudioContext, AutomationEvent, ChainId, ContextState, ImpulseResponse, ParamId, VoiceUnits,
};
use crate::dsp::OscillatorWaveform;
use crate::error::{Error, Result};

/// Slots in the control → render ring buffer.
pub const COMMAND_CAPACITY: usize = 1024;

const SUSPENDED: u8 = 0;
const RUNNING: u8 = 1;
const CLOSED: u8 = 2;

pub(crate) struct Shared {
    producer: Mutex<Producer<RenderCommand>>,
    frames: AtomicU64,
    state: AtomicU8,
    next_chain: AtomicUsize,
    sample_rate: f32,
}

impl Shared {
    pub(crate) fn state(&self) -> ContextState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => ContextState::Running,
            CLOSED => ContextState::Closed,
            _ => ContextState::Suspended,
        }
    }

    pub(crate) fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub(crate) fn publish_frames(&self, frames: u64) {
        self.frames.store(frames, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct RealtimeContext {
    shared: Arc<Shared>,
}

impl RealtimeContext {
    /// A suspended context and the renderer it feeds.
    pub fn new(sample_rate: f32) -> (Self, Renderer) {
        let (producer, consumer) = RingBuffer::new(COMMAND_CAPACITY);
        let shared = Arc::new(Shared {
            producer: Mutex::new(producer),
            frames: AtomicU64::new(0),
            state: AtomicU8::new(SUSPENDED),
            next_chain: AtomicUsize::new(0),
            sample_rate,
        });
        let renderer = Renderer::new(consumer, shared.clone());
        (Self { shared }, renderer)
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.shared.frames.load(Ordering::Acquire)
    }

    /// Stop for good. The renderer outputs silence from here on.
    pub fn close(&self) {
        self.shared.state.store(CLOSED, Ordering::Release);
        tracing::debug!("realtime context closed");
    }

    fn push(&self, command: RenderCommand) -> Result<()> {
        let mut producer = self
            .shared
            .producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if producer.is_abandoned() {
            return Err(Error::RendererDisconnected);
        }
        producer
            .push(command)
            .map_err(|PushError::Full(_)| Error::CommandQueueFull)
    }

    fn transition(&self, to: u8) -> Result<()> {
        if self.shared.state() == ContextState::Closed {
            return Err(Error::Closed);
        }
        let abandoned = self
            .shared
            .producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_abandoned();
        if abandoned {
            return Err(Error::RendererDisconnected);
        }
        self.shared.state.store(to, Ordering::Release);
        Ok(())
    }
}

impl AudioContext for RealtimeContext {
    fn current_time(&self) -> f64 {
        self.frames() as f64 / self.shared.sample_rate as f64
    }

    fn sample_rate(&self) -> f32 {
        self.shared.sample_rate
    }

    fn state(&self) -> ContextState {
        self.shared.state()
    }

    fn resume(&self) -> Result<()> {
        self.transition(RUNNING)?;
        tracing::debug!("realtime context running");
        Ok(())
    }

    fn suspend(&self) -> Result<()> {
        self.transition(SUSPENDED)
    }

    fn create_voice_chain(&self, impulse: ImpulseResponse) -> Result<VoiceUnits> {
        let chain = ChainId(self.shared.next_chain.fetch_add(1, Ordering::Relaxed));
        let voice = VoiceChain::new(chain, self.shared.sample_rate, &impulse);
        self.push(RenderCommand::AddChain(Box::new(voice)))?;
        tracing::debug!(chain = chain.0, impulse_len = impulse.len(), "voice chain sent to renderer");
        Ok(VoiceUnits::new(chain))
    }

    fn schedule(&self, param: ParamId, event: AutomationEvent) -> Result<()> {
        self.push(RenderCommand::Automate { param, event })
    }

    fn set_waveform(&self, chain: ChainId, waveform: OscillatorWaveform) -> Result<()> {
        self.push(RenderCommand::SetWaveform { chain, waveform })
    }
}
