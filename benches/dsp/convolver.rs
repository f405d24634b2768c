//! Benchmarks for the partitioned convolution reverb.
//!
//! The 2 second impulse is the expensive part of every voice.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use triple::audio::ImpulseResponse;
use triple::dsp::convolver::Convolver;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_convolver(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/convolver");
    let impulse = ImpulseResponse::default_tail(SAMPLE_RATE, 1);

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.05).sin()).collect();
        let mut output = vec![0.0f32; size];
        let mut convolver = Convolver::from_impulse(&impulse);

        group.bench_with_input(BenchmarkId::new("reverb_2s", size), &size, |b, _| {
            b.iter(|| convolver.render(black_box(&input), black_box(&mut output)))
        });
    }

    group.finish();
}
