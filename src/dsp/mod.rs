//! Low-level DSP primitives used by the voice chains of the renderer.
//!
//! These components are realtime-safe once constructed: buffers and FFT plans
//! are allocated in `new`, never while processing. They stay focused on the
//! signal-processing math; which parameter drives them when is decided by the
//! automation timelines in [`crate::audio`].

/// Partitioned FFT convolution for the reverb send.
pub mod convolver;
/// Fractional feedback delay line.
pub mod delay;
/// Resonant state-variable low-pass.
pub mod filter;
/// Band-limited oscillator waveforms.
pub mod oscillator;

pub use oscillator::OscillatorWaveform;
