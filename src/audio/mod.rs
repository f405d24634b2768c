//! Boundary to the audio subsystem.
//!
//! The synth core never touches samples. It creates voice chains, then talks to
//! them exclusively through timestamped automation commands ("set this value at
//! time T", "ramp to this value by time T"). Whatever renders the audio owns the
//! realtime thread and evaluates those commands sample by sample.
//!
//! ```text
//!   control thread                          render thread
//!   ──────────────                          ─────────────
//!   Voice::note_on ──► AudioContext::schedule ──► ParamTimeline ──► DSP units
//! ```
//!
//! Two implementations ship with the crate: [`crate::render::RealtimeContext`]
//! (lock-free ring buffer into a [`crate::render::Renderer`]) and
//! [`ManualContext`] (manually clocked, records and evaluates automation).

pub mod automation;
pub mod impulse;
pub mod manual;

pub use automation::{AutomationEvent, ParamTimeline};
pub use impulse::ImpulseResponse;
pub use manual::ManualContext;

use crate::dsp::oscillator::OscillatorWaveform;
use crate::error::Result;

/// Parameters exposed by one voice chain.
///
/// The wiring between the units is fixed; these are the only knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitParam {
    /// Oscillator frequency in Hz
    Frequency,
    /// Low-pass cutoff in Hz
    Cutoff,
    /// Low-pass resonance (dB, like a Web Audio low-pass biquad)
    Resonance,
    /// Amplitude envelope gain
    Envelope,
    /// Delay time in seconds
    DelayTime,
    /// Gain of the delay feedback path
    DelayFeedback,
    /// Gain of the delay return into the voice output
    DelayMix,
    /// Gain of the reverb return into the voice output
    ReverbGain,
    /// Gain of the dry path into the voice output
    DryGain,
    /// Voice output gain
    Output,
}

impl UnitParam {
    pub const ALL: [UnitParam; 10] = [
        UnitParam::Frequency,
        UnitParam::Cutoff,
        UnitParam::Resonance,
        UnitParam::Envelope,
        UnitParam::DelayTime,
        UnitParam::DelayFeedback,
        UnitParam::DelayMix,
        UnitParam::ReverbGain,
        UnitParam::DryGain,
        UnitParam::Output,
    ];

    /// Dense index, used to lay out per-chain parameter storage.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Value a freshly created unit holds before any automation.
    pub fn initial_value(self) -> f32 {
        match self {
            UnitParam::Frequency => 440.0,
            UnitParam::Cutoff => 1000.0,
            UnitParam::Resonance => 10.0,
            UnitParam::Envelope => 0.0,
            UnitParam::DelayTime => 0.25,
            UnitParam::DelayFeedback => 0.3,
            UnitParam::DelayMix => 0.0,
            UnitParam::ReverbGain => 0.0,
            UnitParam::DryGain => 1.0,
            UnitParam::Output => 0.7,
        }
    }
}

/// Identifies a voice chain created by [`AudioContext::create_voice_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub usize);

/// Handle to one automatable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// Master output gain
    Master,
    /// A parameter of one voice chain
    Voice { chain: ChainId, param: UnitParam },
}

/// The handles of one voice chain: oscillator → low-pass → envelope →
/// (dry | delay | reverb) → output gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceUnits {
    pub chain: ChainId,
    pub frequency: ParamId,
    pub cutoff: ParamId,
    pub resonance: ParamId,
    pub envelope: ParamId,
    pub delay_time: ParamId,
    pub delay_feedback: ParamId,
    pub delay_mix: ParamId,
    pub reverb_gain: ParamId,
    pub dry_gain: ParamId,
    pub output: ParamId,
}

impl VoiceUnits {
    pub fn new(chain: ChainId) -> Self {
        let param = |param| ParamId::Voice { chain, param };
        Self {
            chain,
            frequency: param(UnitParam::Frequency),
            cutoff: param(UnitParam::Cutoff),
            resonance: param(UnitParam::Resonance),
            envelope: param(UnitParam::Envelope),
            delay_time: param(UnitParam::DelayTime),
            delay_feedback: param(UnitParam::DelayFeedback),
            delay_mix: param(UnitParam::DelayMix),
            reverb_gain: param(UnitParam::ReverbGain),
            dry_gain: param(UnitParam::DryGain),
            output: param(UnitParam::Output),
        }
    }
}

/// Run state of the audio subsystem.
///
/// Hosts commonly start audio suspended until a user gesture allows playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
    Closed,
}

/// Control-side handle to an audio subsystem.
///
/// Implementations are cheap to clone; every voice keeps its own copy. All
/// times are in seconds on the context's own clock (see
/// [`AudioContext::current_time`]).
pub trait AudioContext: Clone + Send + 'static {
    /// Current render time in seconds. Does not advance while suspended.
    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> f32;

    fn state(&self) -> ContextState;

    /// Start (or continue) rendering.
    fn resume(&self) -> Result<()>;

    /// Pause rendering; the clock stops until the next [`AudioContext::resume`].
    fn suspend(&self) -> Result<()>;

    /// Build a voice chain wired into the master bus.
    fn create_voice_chain(&self, impulse: ImpulseResponse) -> Result<VoiceUnits>;

    /// Schedule an automation event on a parameter.
    fn schedule(&self, param: ParamId, event: AutomationEvent) -> Result<()>;

    /// Change the oscillator waveform of a chain immediately.
    fn set_waveform(&self, chain: ChainId, waveform: OscillatorWaveform) -> Result<()>;

    fn master(&self) -> ParamId {
        ParamId::Master
    }
}
