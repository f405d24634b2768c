//! Voice parameters and presets.
//!
//! Parameters fall in two groups with different timing:
//!
//! - [`ImmediateParams`] are pushed to the audio side the moment they are set.
//! - [`LatchedParams`] are only stored; the next trigger reads them.
//!
//! Keeping them in separate structs makes it obvious at every call site which
//! of the two timings a change gets.

use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::OscillatorWaveform;
use crate::VOICE_COUNT;

/// Upper bound on the delay feedback so the echo loop always decays.
pub const MAX_DELAY_FEEDBACK: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImmediateParams {
    pub cutoff_hz: f32,
    /// Filter resonance in dB
    pub resonance_q: f32,
    pub delay_time_sec: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    pub reverb_mix: f32,
    pub volume: f32,
    pub waveform: OscillatorWaveform,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatchedParams {
    pub env_mod: f32,
    /// Scaled ×2 into seconds at trigger time
    pub decay: f32,
    pub accent: f32,
    /// Portamento time in seconds; 0 jumps straight to the new pitch
    pub glide: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceParameters {
    pub immediate: ImmediateParams,
    pub latched: LatchedParams,
}

impl From<&VoicePreset> for VoiceParameters {
    fn from(preset: &VoicePreset) -> Self {
        Self {
            immediate: ImmediateParams {
                cutoff_hz: preset.cutoff,
                resonance_q: preset.resonance,
                delay_time_sec: preset.delay_time,
                delay_feedback: preset.delay_feedback.clamp(0.0, MAX_DELAY_FEEDBACK),
                delay_mix: preset.delay_mix.clamp(0.0, 1.0),
                reverb_mix: preset.reverb_mix.clamp(0.0, 1.0),
                volume: preset.volume,
                waveform: preset.waveform,
            },
            latched: LatchedParams {
                env_mod: preset.env_mod,
                decay: preset.decay,
                accent: preset.accent,
                glide: preset.glide,
            },
        }
    }
}

/// Flat description of a voice's sound, as the knobs show it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct VoicePreset {
    pub cutoff: f32,
    pub resonance: f32,
    pub env_mod: f32,
    pub decay: f32,
    pub accent: f32,
    pub glide: f32,
    pub delay_time: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    pub reverb_mix: f32,
    pub volume: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub waveform: OscillatorWaveform,
}

impl VoicePreset {
    pub const BASS: Self = Self {
        cutoff: 2000.0,
        resonance: 8.0,
        env_mod: 0.6,
        decay: 0.3,
        accent: 0.4,
        glide: 0.2,
        delay_time: 0.25,
        delay_feedback: 0.3,
        delay_mix: 0.2,
        reverb_mix: 0.15,
        volume: 0.7,
        waveform: OscillatorWaveform::Saw,
    };

    pub const MID: Self = Self {
        cutoff: 3000.0,
        resonance: 6.0,
        env_mod: 0.4,
        decay: 0.2,
        accent: 0.3,
        glide: 0.1,
        delay_time: 0.375,
        delay_feedback: 0.25,
        delay_mix: 0.15,
        reverb_mix: 0.1,
        volume: 0.7,
        waveform: OscillatorWaveform::Saw,
    };

    pub const LEAD: Self = Self {
        cutoff: 4000.0,
        resonance: 4.0,
        env_mod: 0.3,
        decay: 0.15,
        accent: 0.2,
        glide: 0.0,
        delay_time: 0.5,
        delay_feedback: 0.2,
        delay_mix: 0.1,
        reverb_mix: 0.05,
        volume: 0.7,
        waveform: OscillatorWaveform::Saw,
    };
}

impl Default for VoicePreset {
    fn default() -> Self {
        Self::BASS
    }
}

/// Presets for voices 0, 1 and 2.
pub const DEFAULT_PRESETS: [VoicePreset; VOICE_COUNT] =
    [VoicePreset::BASS, VoicePreset::MID, VoicePreset::LEAD];

/// A settable voice parameter, addressable by its knob name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceParam {
    Cutoff,
    Resonance,
    EnvMod,
    Decay,
    Accent,
    Glide,
    DelayTime,
    DelayFeedback,
    DelayMix,
    ReverbMix,
    Volume,
}

impl VoiceParam {
    pub const ALL: [VoiceParam; 11] = [
        VoiceParam::Cutoff,
        VoiceParam::Resonance,
        VoiceParam::EnvMod,
        VoiceParam::Decay,
        VoiceParam::Accent,
        VoiceParam::Glide,
        VoiceParam::DelayTime,
        VoiceParam::DelayFeedback,
        VoiceParam::DelayMix,
        VoiceParam::ReverbMix,
        VoiceParam::Volume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VoiceParam::Cutoff => "cutoff",
            VoiceParam::Resonance => "resonance",
            VoiceParam::EnvMod => "envMod",
            VoiceParam::Decay => "decay",
            VoiceParam::Accent => "accent",
            VoiceParam::Glide => "glide",
            VoiceParam::DelayTime => "delayTime",
            VoiceParam::DelayFeedback => "delayFeedback",
            VoiceParam::DelayMix => "delayMix",
            VoiceParam::ReverbMix => "reverbMix",
            VoiceParam::Volume => "volume",
        }
    }

    /// Whether a change waits for the next trigger.
    pub fn is_latched(self) -> bool {
        matches!(
            self,
            VoiceParam::EnvMod | VoiceParam::Decay | VoiceParam::Accent | VoiceParam::Glide
        )
    }
}

impl fmt::Display for VoiceParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VoiceParam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoiceParam::ALL
            .into_iter()
            .find(|param| param.name() == s)
            .ok_or_else(|| format!("unknown voice parameter: {s}"))
    }
}
