//! Benchmarks for the feedback delay line.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use triple::dsp::delay::{DelayLine, MAX_DELAY_SECONDS};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/delay");

    // Delay times of the three default presets
    let delay_times: &[f32] = &[0.25, 0.375, 0.5];

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size).map(|i| (i as f32 * 0.1).sin()).collect();

        for &seconds in delay_times {
            let mut delay = DelayLine::new(SAMPLE_RATE, MAX_DELAY_SECONDS);
            group.bench_with_input(
                BenchmarkId::new(format!("feedback_{}ms", (seconds * 1000.0) as u32), size),
                &size,
                |b, _| {
                    b.iter(|| {
                        let mut sum = 0.0f32;
                        for &x in &input {
                            sum += delay.process(black_box(x), seconds, 0.3, SAMPLE_RATE);
                        }
                        sum
                    })
                },
            );
        }
    }

    group.finish();
}
