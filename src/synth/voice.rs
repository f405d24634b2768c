/*
Acid Voice
==========

One monophonic subtractive voice. The units themselves live on the audio
side; a `Voice` only holds their handles and schedules automation on them.

    oscillator ──► low-pass ──► envelope ──┬──► dry gain ───────┐
                                           ├──► delay ──► mix ──┼──► output ──► master
                                           └──► reverb ──► gain ┘

Trigger (`note_on`)
-------------------

    amplitude   accented ┤  /\
                         │ /   ‾‾‾‾‾-----_______   exponential to 0.001
                       0 ┼/────────────────────────
                         now  +10ms           +decay·2

    cutoff  base+env·5000 ┤\
                          │  ‾‾--___            exponential back to base
                     base ┼────────‾‾‾‾‾‾‾‾‾‾‾‾
                          now        +0.8·decay·2

    accented = velocity · (1 + accent)

Envelope amount, decay, accent and glide are read at trigger time; changing
them never touches a note that is already sounding.
*/

use tracing::debug;

use crate::audio::{AudioContext, AutomationEvent, ImpulseResponse, ParamId, VoiceUnits};
use crate::dsp::OscillatorWaveform;
use crate::error::Result;
use crate::sequencing::notes::midi_note_to_freq;
use crate::synth::params::{VoiceParam, VoiceParameters, VoicePreset, MAX_DELAY_FEEDBACK};

/// Amplitude attack time in seconds.
pub const ATTACK_SECONDS: f64 = 0.010;
/// Release time of `note_off` in seconds.
pub const RELEASE_SECONDS: f64 = 0.100;
/// Level exponential ramps head for instead of zero.
pub const ENV_FLOOR: f32 = 0.001;
/// Cutoff offset in Hz at full envelope amount.
pub const FILTER_ENV_RANGE_HZ: f32 = 5000.0;
/// Knob decay → seconds.
pub const DECAY_SCALE: f32 = 2.0;
/// Filter envelope length relative to the amplitude decay.
pub const FILTER_DECAY_RATIO: f32 = 0.8;

/// Pitch the oscillator is heading for, and since when.
#[derive(Debug, Clone, Copy)]
struct Pitch {
    from: f32,
    to: f32,
    start: f64,
    end: f64,
}

impl Pitch {
    fn fixed(freq: f32) -> Self {
        Self {
            from: freq,
            to: freq,
            start: 0.0,
            end: 0.0,
        }
    }

    fn at(&self, t: f64) -> f32 {
        if t >= self.end || self.end <= self.start {
            return self.to;
        }
        let frac = ((t - self.start) / (self.end - self.start)).max(0.0) as f32;
        self.from + (self.to - self.from) * frac
    }
}

pub struct Voice<C: AudioContext> {
    ctx: C,
    units: VoiceUnits,
    params: VoiceParameters,
    pitch: Pitch,
}

impl<C: AudioContext> Voice<C> {
    /// Build the voice's chain on `ctx` and apply `preset`.
    ///
    /// `seed` picks the reverb impulse noise, so voices built with different
    /// seeds get decorrelated tails.
    pub fn new(ctx: C, preset: &VoicePreset, seed: u32) -> Result<Self> {
        let impulse = ImpulseResponse::default_tail(ctx.sample_rate(), seed);
        let units = ctx.create_voice_chain(impulse)?;

        let mut voice = Self {
            ctx,
            units,
            params: VoiceParameters::from(preset),
            pitch: Pitch::fixed(440.0),
        };
        voice.apply_preset(preset)?;
        Ok(voice)
    }

    pub fn units(&self) -> &VoiceUnits {
        &self.units
    }

    pub fn params(&self) -> &VoiceParameters {
        &self.params
    }

    /// Oscillator frequency right now (mid-glide values included).
    pub fn frequency(&self) -> f32 {
        self.pitch.at(self.ctx.current_time())
    }

    /// Frequency of the last note played.
    pub fn target_frequency(&self) -> f32 {
        self.pitch.to
    }

    pub fn apply_preset(&mut self, preset: &VoicePreset) -> Result<()> {
        self.set_cutoff(preset.cutoff)?;
        self.set_resonance(preset.resonance)?;
        self.set_env_mod(preset.env_mod);
        self.set_decay(preset.decay);
        self.set_accent(preset.accent);
        self.set_glide(preset.glide);
        self.set_delay_time(preset.delay_time)?;
        self.set_delay_feedback(preset.delay_feedback)?;
        self.set_delay_mix(preset.delay_mix)?;
        self.set_reverb_mix(preset.reverb_mix)?;
        self.set_volume(preset.volume)?;
        self.set_waveform(preset.waveform)
    }

    /// Play `note` (MIDI number): set or glide the pitch, then retrigger.
    pub fn note_on(&mut self, note: u8, velocity: f32) -> Result<()> {
        self.set_frequency(midi_note_to_freq(note))?;
        self.trigger_envelope(velocity)
    }

    fn set_frequency(&mut self, freq: f32) -> Result<()> {
        let now = self.ctx.current_time();
        let glide = self.params.latched.glide;
        let param = self.units.frequency;

        self.schedule(param, AutomationEvent::CancelScheduled { time: now })?;

        if glide > 0.0 {
            let current = self.pitch.at(now);
            let end = now + glide as f64;
            self.schedule(param, AutomationEvent::SetValue { value: current, time: now })?;
            self.schedule(param, AutomationEvent::LinearRamp { value: freq, end_time: end })?;
            self.pitch = Pitch {
                from: current,
                to: freq,
                start: now,
                end,
            };
        } else {
            self.schedule(param, AutomationEvent::SetValue { value: freq, time: now })?;
            self.pitch = Pitch::fixed(freq);
        }
        Ok(())
    }

    /// Restart both envelopes at the current time.
    pub fn trigger_envelope(&mut self, velocity: f32) -> Result<()> {
        let now = self.ctx.current_time();
        let latched = self.params.latched;
        let decay = (latched.decay * DECAY_SCALE) as f64;

        let peak = velocity * (1.0 + latched.accent);
        let attack_end = now + ATTACK_SECONDS;
        let env = self.units.envelope;
        self.schedule(env, AutomationEvent::CancelScheduled { time: now })?;
        self.schedule(env, AutomationEvent::SetValue { value: 0.0, time: now })?;
        self.schedule(env, AutomationEvent::LinearRamp { value: peak, end_time: attack_end })?;
        self.schedule(
            env,
            AutomationEvent::ExponentialRamp {
                value: ENV_FLOOR,
                end_time: attack_end + decay,
            },
        )?;

        let base = self.params.immediate.cutoff_hz;
        let cutoff = self.units.cutoff;
        self.schedule(cutoff, AutomationEvent::CancelScheduled { time: now })?;
        self.schedule(
            cutoff,
            AutomationEvent::SetValue {
                value: base + latched.env_mod * FILTER_ENV_RANGE_HZ,
                time: now,
            },
        )?;
        self.schedule(
            cutoff,
            AutomationEvent::ExponentialRamp {
                value: base,
                end_time: now + FILTER_DECAY_RATIO as f64 * decay,
            },
        )
    }

    /// Fade out from wherever the envelope is.
    pub fn note_off(&mut self) -> Result<()> {
        let now = self.ctx.current_time();
        let env = self.units.envelope;
        self.schedule(env, AutomationEvent::CancelAndHold { time: now })?;
        self.schedule(
            env,
            AutomationEvent::ExponentialRamp {
                value: ENV_FLOOR,
                end_time: now + RELEASE_SECONDS,
            },
        )
    }

    pub fn set_cutoff(&mut self, hz: f32) -> Result<()> {
        self.params.immediate.cutoff_hz = hz;
        let now = self.ctx.current_time();
        // drops a running filter sweep, which ends on the old base
        self.schedule(self.units.cutoff, AutomationEvent::CancelScheduled { time: now })?;
        self.set_now(self.units.cutoff, hz)
    }

    pub fn set_resonance(&mut self, db: f32) -> Result<()> {
        self.params.immediate.resonance_q = db;
        self.set_now(self.units.resonance, db)
    }

    pub fn set_env_mod(&mut self, amount: f32) {
        self.params.latched.env_mod = amount;
    }

    pub fn set_decay(&mut self, decay: f32) {
        self.params.latched.decay = decay;
    }

    pub fn set_accent(&mut self, accent: f32) {
        self.params.latched.accent = accent;
    }

    pub fn set_glide(&mut self, seconds: f32) {
        self.params.latched.glide = seconds;
    }

    pub fn set_delay_time(&mut self, seconds: f32) -> Result<()> {
        self.params.immediate.delay_time_sec = seconds;
        self.set_now(self.units.delay_time, seconds)
    }

    pub fn set_delay_feedback(&mut self, feedback: f32) -> Result<()> {
        let feedback = feedback.clamp(0.0, MAX_DELAY_FEEDBACK);
        self.params.immediate.delay_feedback = feedback;
        self.set_now(self.units.delay_feedback, feedback)
    }

    pub fn set_delay_mix(&mut self, mix: f32) -> Result<()> {
        let mix = mix.clamp(0.0, 1.0);
        self.params.immediate.delay_mix = mix;
        self.set_now(self.units.delay_mix, mix)
    }

    /// Reverb send in, dry path partially ducked: `dry = 1 - mix / 2`.
    pub fn set_reverb_mix(&mut self, mix: f32) -> Result<()> {
        let mix = mix.clamp(0.0, 1.0);
        self.params.immediate.reverb_mix = mix;
        self.set_now(self.units.reverb_gain, mix)?;
        self.set_now(self.units.dry_gain, 1.0 - mix * 0.5)
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.params.immediate.volume = volume;
        self.set_now(self.units.output, volume)
    }

    pub fn set_waveform(&mut self, waveform: OscillatorWaveform) -> Result<()> {
        self.params.immediate.waveform = waveform;
        self.ctx.set_waveform(self.units.chain, waveform)
    }

    /// Set a parameter by its knob identity.
    pub fn set(&mut self, param: VoiceParam, value: f32) -> Result<()> {
        debug!(chain = self.units.chain.0, %param, value, "set voice parameter");
        match param {
            VoiceParam::Cutoff => self.set_cutoff(value)?,
            VoiceParam::Resonance => self.set_resonance(value)?,
            VoiceParam::EnvMod => self.set_env_mod(value),
            VoiceParam::Decay => self.set_decay(value),
            VoiceParam::Accent => self.set_accent(value),
            VoiceParam::Glide => self.set_glide(value),
            VoiceParam::DelayTime => self.set_delay_time(value)?,
            VoiceParam::DelayFeedback => self.set_delay_feedback(value)?,
            VoiceParam::DelayMix => self.set_delay_mix(value)?,
            VoiceParam::ReverbMix => self.set_reverb_mix(value)?,
            VoiceParam::Volume => self.set_volume(value)?,
        }
        Ok(())
    }

    fn set_now(&self, param: ParamId, value: f32) -> Result<()> {
        let time = self.ctx.current_time();
        self.schedule(param, AutomationEvent::SetValue { value, time })
    }

    #[inline]
    fn schedule(&self, param: ParamId, event: AutomationEvent) -> Result<()> {
        self.ctx.schedule(param, event)
    }
}
