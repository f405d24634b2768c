/*
Audio Oscillator
================

The sound source of every voice. Phase runs from 0.0 to 1.0 once per cycle;
each waveform is a function of that phase.

  Sine      sin(2π·phase)                   pure, no harmonics
  Sawtooth  2·phase - 1                     all harmonics, 1/n  (the acid default)
  Square    phase < 0.5 ? 1 : -1            odd harmonics only
  Triangle  1 - 4·|phase - 0.5|             odd harmonics, 1/n²

Aliasing
--------

The naive saw and square jump instantly, which puts energy above Nyquist that
folds back as inharmonic whine. PolyBLEP subtracts a tiny two-sample
polynomial "step" around each discontinuity:

    naive:     ╱│╱│╱│         blep'd:   ╱╲╱╲╱
                                        (rounded corners)

Frequency arrives per sample so glides and vibrato come for free.
*/

use std::f32::consts::TAU;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorWaveform {
    Sine,
    #[default]
    Saw,
    Square,
    Triangle,
}

impl FromStr for OscillatorWaveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sine" => Ok(Self::Sine),
            "saw" | "sawtooth" => Ok(Self::Saw),
            "square" => Ok(Self::Square),
            "triangle" => Ok(Self::Triangle),
            other => Err(format!("unknown waveform: {other}")),
        }
    }
}

pub struct Oscillator {
    waveform: OscillatorWaveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn sawtooth() -> Self {
        Self::new(OscillatorWaveform::Saw)
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    /// Switch waveform without resetting phase (no click on change).
    pub fn set_waveform(&mut self, waveform: OscillatorWaveform) {
        self.waveform = waveform;
    }

    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let dt = (frequency / sample_rate).clamp(-0.5, 0.5);
        let phase = self.phase;
        let blep_dt = dt.abs();

        let sample = match self.waveform {
            OscillatorWaveform::Sine => (TAU * phase).sin(),
            OscillatorWaveform::Saw => 2.0 * phase - 1.0 - poly_blep(phase, blep_dt),
            OscillatorWaveform::Square => {
                let naive = if phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(phase, blep_dt) - poly_blep((phase + 0.5).fract(), blep_dt)
            }
            OscillatorWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        };

        self.phase = (phase + dt).rem_euclid(1.0);
        sample
    }

    /// Render one block, reading the frequency for each sample from `frequencies`.
    pub fn render(&mut self, frequencies: &[f32], sample_rate: f32, out: &mut [f32]) {
        for (sample, &frequency) in out.iter_mut().zip(frequencies) {
            *sample = self.next_sample(frequency, sample_rate);
        }
    }
}

/// Two-sample polynomial band-limited step correction.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let t = t / dt;
        t + t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + t + t + 1.0
    } else {
        0.0
    }
}
