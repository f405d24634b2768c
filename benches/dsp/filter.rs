//! Benchmarks for the resonant low-pass.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use triple::dsp::filter::SVFilter;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let resonance = vec![8.0f32; size];

        // Static cutoff: coefficients computed once
        let fixed = vec![2000.0f32; size];
        let mut filter = SVFilter::lowpass(2000.0, 8.0);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass_fixed", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), &fixed, &resonance, SAMPLE_RATE);
            })
        });

        // Envelope sweep: coefficients recomputed every sample
        let sweep: Vec<f32> = (0..size)
            .map(|i| 5000.0 * (0.2f32).powf(i as f32 / size as f32))
            .collect();
        let mut filter = SVFilter::lowpass(5000.0, 8.0);
        let mut buffer = input.clone();
        group.bench_with_input(BenchmarkId::new("lowpass_sweep", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                filter.render(black_box(&mut buffer), &sweep, &resonance, SAMPLE_RATE);
            })
        });
    }

    group.finish();
}
