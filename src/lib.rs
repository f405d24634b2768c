pub mod audio; // Boundary to the audio subsystem and automation timelines
pub mod dsp;
pub mod engine; // Transport, sequencer thread and voice triggering
pub mod error;
pub mod render; // Realtime renderer behind the audio boundary
pub mod sequencing; // Notes and step patterns
pub mod synth; // Acid voices and their parameters

pub use audio::{AudioContext, ManualContext};
pub use engine::{Engine, Sequencer, SequencerHandle, TransportEvent};
pub use error::{Error, Result};
pub use render::{RealtimeContext, Renderer};
pub use sequencing::{Pattern, PatternStore, Step};
pub use synth::{Voice, VoiceParam, VoicePreset};

pub const MAX_BLOCK_SIZE: usize = 2048;
/// Voices (and patterns) per engine.
pub const VOICE_COUNT: usize = 3;
