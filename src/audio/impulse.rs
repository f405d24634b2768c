//! Synthetic reverb impulse responses.
//!
//! A convincing small-hall tail is just white noise under an exponential
//! decay:
//!
//! ```text
//! h[n] = noise[n] * exp(-decay * n / sample_rate)
//! ```
//!
//! Every voice generates its own response, so the three tails are
//! uncorrelated.

/// Default tail length in seconds.
pub const DEFAULT_DURATION: f32 = 2.0;
/// Default exponential decay constant (per second).
pub const DEFAULT_DECAY: f32 = 2.0;

/// Mono impulse response used by the convolution reverb.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    samples: Vec<f32>,
    sample_rate: f32,
}

impl ImpulseResponse {
    pub fn from_samples(samples: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Exponentially decaying noise burst.
    ///
    /// `seed` selects the noise sequence; zero is remapped because xorshift
    /// never leaves the all-zero state.
    pub fn synthetic(sample_rate: f32, duration: f32, decay: f32, seed: u32) -> Self {
        let length = (sample_rate * duration).max(0.0) as usize;
        let mut noise = NoiseSource::new(seed);

        let samples = (0..length)
            .map(|i| {
                let t = i as f32 / sample_rate;
                noise.next_bipolar() * (-t * decay).exp()
            })
            .collect();

        Self {
            samples,
            sample_rate,
        }
    }

    /// The 2 second, decay-2 tail every voice uses.
    pub fn default_tail(sample_rate: f32, seed: u32) -> Self {
        Self::synthetic(sample_rate, DEFAULT_DURATION, DEFAULT_DECAY, seed)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Gain that brings the response to a comfortable loudness.
    ///
    /// Follows the Web Audio convolver normalization: scale by the inverse RMS
    /// power, then by a fixed calibration constant.
    pub fn normalization_gain(&self) -> f32 {
        const GAIN_CALIBRATION: f32 = 0.00125;
        const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44_100.0;
        const MIN_POWER: f32 = 0.000125;

        if self.samples.is_empty() {
            return 1.0;
        }
        let power = (self.samples.iter().map(|s| s * s).sum::<f32>()
            / self.samples.len() as f32)
            .sqrt();
        let power = if power.is_finite() && power >= MIN_POWER {
            power
        } else {
            MIN_POWER
        };

        let mut gain = GAIN_CALIBRATION / power;
        if self.sample_rate > 0.0 {
            gain *= GAIN_CALIBRATION_SAMPLE_RATE / self.sample_rate;
        }
        gain
    }
}

/// xorshift32 white noise.
struct NoiseSource {
    state: u32,
}

impl NoiseSource {
    fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9 } else { seed },
        }
    }

    #[inline]
    fn next_bipolar(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;

        (x as i32 as f32) / (i32::MAX as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_length_matches_duration() {
        let ir = ImpulseResponse::default_tail(48_000.0, 1);
        assert_eq!(ir.len(), 96_000);
        assert_eq!(ir.sample_rate(), 48_000.0);
    }

    #[test]
    fn test_synthetic_tail_decays() {
        let ir = ImpulseResponse::default_tail(48_000.0, 7);
        let head: f32 = ir.samples()[..4800].iter().map(|s| s.abs()).sum();
        let tail: f32 = ir.samples()[91_200..].iter().map(|s| s.abs()).sum();

        // exp(-2 * 1.9) ≈ 0.022, so the last 100ms is far quieter than the first
        assert!(tail < head * 0.1, "head={head}, tail={tail}");
        assert!(ir.samples().iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_different_seeds_give_different_noise() {
        let a = ImpulseResponse::synthetic(8_000.0, 0.1, 2.0, 1);
        let b = ImpulseResponse::synthetic(8_000.0, 0.1, 2.0, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalization_gain_is_finite_for_silence() {
        let ir = ImpulseResponse::from_samples(vec![0.0; 64], 48_000.0);
        assert!(ir.normalization_gain().is_finite());
    }
}
