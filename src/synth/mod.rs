// Purpose: one acid voice per sequencer track and the parameters that shape it
// This layer sits above the audio boundary and only issues automation

pub mod params;
pub mod voice;

pub use params::{ImmediateParams, LatchedParams, VoiceParam, VoiceParameters, VoicePreset, DEFAULT_PRESETS};
pub use voice::Voice;
