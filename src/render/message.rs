use crate::audio::{AutomationEvent, ChainId, ParamId};
use crate::dsp::OscillatorWaveform;

use super::chain::VoiceChain;

/// Control → render messages carried by the ring buffer.
pub enum RenderCommand {
    /// A fully built chain; the render side only takes ownership.
    AddChain(Box<VoiceChain>),
    Automate { param: ParamId, event: AutomationEvent },
    SetWaveform { chain: ChainId, waveform: OscillatorWaveform },
}
