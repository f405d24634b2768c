//! Real-world scenario benchmarks.
//!
//! These benchmarks model what the player actually renders: one voice chain
//! with its delay and reverb, and the whole renderer with three triggered
//! voices.

mod voices;

pub use voices::bench_voices;
