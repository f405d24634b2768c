use std::f32::consts::PI;

/*
Resonant Low-Pass (TPT State-Variable Filter)
=============================================

| output   | passes          | rejects      |
| -------- | --------------- | ------------ |
| low-pass | below cutoff    | above cutoff |

The trapezoidal (topology-preserving) SVF stays stable while the cutoff is
swept every sample, which is exactly what the filter envelope does.

    g = tan(π · cutoff / sample_rate)
    k = 1 / Q                               (damping)

Resonance is given in dB, the way a Web Audio low-pass biquad reads its Q:

    Q = 10^(resonance_db / 20)

so 0 dB is a flat Butterworth-ish corner and 8 dB is a clear squelchy peak.
Coefficients are only recomputed when cutoff or resonance actually change.
*/

/// Lowest and highest (relative to sample rate) cutoff the math tolerates.
const MIN_CUTOFF_HZ: f32 = 1.0;
const MAX_CUTOFF_RATIO: f32 = 0.49;

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    cutoff_hz: f32,
    resonance_db: f32,
    g: f32,
    k: f32,
    coefficient_rate: f32,
}

impl SVFilter {
    pub fn lowpass(cutoff_hz: f32, resonance_db: f32) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            resonance_db,
            g: 0.0,
            k: 1.0,
            coefficient_rate: 0.0,
        }
    }

    fn update_coefficients(&mut self, sample_rate: f32) {
        let cutoff = self
            .cutoff_hz
            .max(MIN_CUTOFF_HZ)
            .min(sample_rate * MAX_CUTOFF_RATIO);
        let cutoff = if cutoff.is_finite() { cutoff } else { 1000.0 };
        self.g = (PI * cutoff / sample_rate).tan();

        let q = 10.0_f32.powf(self.resonance_db / 20.0);
        self.k = if q.is_finite() && q > 0.0 { 1.0 / q } else { 1.0 };
        self.coefficient_rate = sample_rate;
    }

    /// Filter one sample with the given cutoff (Hz) and resonance (dB).
    #[inline]
    pub fn process(&mut self, sample: f32, cutoff_hz: f32, resonance_db: f32, sample_rate: f32) -> f32 {
        if cutoff_hz != self.cutoff_hz
            || resonance_db != self.resonance_db
            || sample_rate != self.coefficient_rate
        {
            self.cutoff_hz = cutoff_hz;
            self.resonance_db = resonance_db;
            self.update_coefficients(sample_rate);
        }

        let g = self.g;
        let k = self.k;
        let h = 1.0 / (1.0 + g * (g + k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + g * v3);
        let v2 = self.ic2eq + g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        v2
    }

    /// Filter a block, reading cutoff and resonance per sample.
    pub fn render(&mut self, buffer: &mut [f32], cutoff: &[f32], resonance: &[f32], sample_rate: f32) {
        for ((sample, &fc), &q) in buffer.iter_mut().zip(cutoff).zip(resonance) {
            *sample = self.process(*sample, fc, q, sample_rate);
        }
    }
}
