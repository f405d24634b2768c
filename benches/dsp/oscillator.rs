//! Benchmarks for oscillator waveform generation.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use triple::dsp::oscillator::{Oscillator, OscillatorWaveform};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    let waveforms = [
        ("sine", OscillatorWaveform::Sine),         // sin() per sample
        ("sawtooth", OscillatorWaveform::Saw),      // ramp + PolyBLEP
        ("square", OscillatorWaveform::Square),     // two PolyBLEP corrections
        ("triangle", OscillatorWaveform::Triangle), // absolute value
    ];

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];
        let frequencies = vec![65.41f32; size]; // C2, the bassline root

        for (name, waveform) in waveforms {
            let mut osc = Oscillator::new(waveform);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    osc.render(black_box(&frequencies), SAMPLE_RATE, black_box(&mut buffer));
                })
            });
        }
    }

    group.finish();
}
