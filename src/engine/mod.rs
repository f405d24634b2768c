//! Composition root: master bus, the three voices, and the clock that plays
//! them.
//!
//! [`Engine`] turns transport steps into notes. [`Transport`] decides when a
//! step is due, and [`Sequencer`] runs both on a dedicated control thread.

pub mod events;
pub mod scheduler;
pub mod transport;

pub use events::{EventBus, Subscription, SubscriptionId, TransportEvent, TransportListener};
pub use scheduler::{Sequencer, SequencerHandle};
pub use transport::{Transport, TransportSnapshot};

use crate::audio::{AudioContext, AutomationEvent, ContextState};
use crate::error::{Error, Result};
use crate::synth::{Voice, VoiceParam, VoicePreset, DEFAULT_PRESETS};
use crate::VOICE_COUNT;

/// Trigger velocity of an accented step.
pub const ACCENT_VELOCITY: f32 = 1.0;
/// Trigger velocity of a plain step.
pub const NORMAL_VELOCITY: f32 = 0.7;

pub struct Engine<C: AudioContext> {
    ctx: C,
    voices: Vec<Voice<C>>,
    master_volume: f32,
    initialized: bool,
}

impl<C: AudioContext> Engine<C> {
    /// Engine with the default preset for each voice.
    pub fn new(ctx: C) -> Result<Self> {
        Self::with_presets(ctx, &DEFAULT_PRESETS)
    }

    pub fn with_presets(ctx: C, presets: &[VoicePreset; VOICE_COUNT]) -> Result<Self> {
        let voices = presets
            .iter()
            .enumerate()
            .map(|(index, preset)| Voice::new(ctx.clone(), preset, index as u32 + 1))
            .collect::<Result<Vec<_>>>()?;

        let mut engine = Self {
            ctx,
            voices,
            master_volume: 1.0,
            initialized: false,
        };
        engine.set_master_volume(1.0)?;
        tracing::debug!(voices = VOICE_COUNT, "engine constructed");
        Ok(engine)
    }

    /// Bring the audio subsystem to the running state.
    ///
    /// Only the first successful call does any work. A failure is logged,
    /// returned, and leaves the engine uninitialized so a later call can retry.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        if self.ctx.state() != ContextState::Running {
            if let Err(err) = self.ctx.resume() {
                tracing::error!(error = %err, "failed to initialize audio context");
                return Err(err);
            }
        }
        self.initialized = true;
        tracing::info!(sample_rate = self.ctx.sample_rate(), "audio context initialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn voice(&self, index: usize) -> Result<&Voice<C>> {
        self.voices.get(index).ok_or(Error::VoiceIndex {
            index,
            count: VOICE_COUNT,
        })
    }

    pub fn voice_mut(&mut self, index: usize) -> Result<&mut Voice<C>> {
        self.voices.get_mut(index).ok_or(Error::VoiceIndex {
            index,
            count: VOICE_COUNT,
        })
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn set_master_volume(&mut self, volume: f32) -> Result<()> {
        self.master_volume = volume;
        let time = self.ctx.current_time();
        self.ctx
            .schedule(self.ctx.master(), AutomationEvent::SetValue { value: volume, time })
    }

    /// Set a voice parameter by knob name (`"cutoff"`, `"envMod"`, ...).
    ///
    /// Unknown names are logged and ignored.
    pub fn set_parameter(&mut self, voice: usize, name: &str, value: f32) -> Result<()> {
        let target = self.voice_mut(voice)?;
        match name.parse::<VoiceParam>() {
            Ok(param) => target.set(param, value),
            Err(_) => {
                tracing::warn!(voice, name, value, "unknown voice parameter");
                Ok(())
            }
        }
    }
}

impl<C: AudioContext> TransportListener for Engine<C> {
    fn on_event(&mut self, event: &TransportEvent) {
        let TransportEvent::Step { voice, step } = *event else {
            return;
        };
        // not running yet: the note is skipped, the next step retries
        if !self.initialized && self.initialize().is_err() {
            return;
        }

        let velocity = if step.accent {
            ACCENT_VELOCITY
        } else {
            NORMAL_VELOCITY
        };
        let result = self
            .voice_mut(voice)
            .and_then(|target| target.note_on(step.note, velocity));
        if let Err(err) = result {
            tracing::warn!(voice, note = step.note, error = %err, "step trigger failed");
        }
    }
}
