//! Benchmarks for low-level DSP primitives.

mod convolver;
mod delay;
mod filter;
mod oscillator;

pub use convolver::bench_convolver;
pub use delay::bench_delay;
pub use filter::bench_filter;
pub use oscillator::bench_oscillator;
