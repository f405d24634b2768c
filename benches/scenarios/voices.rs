//! Benchmarks for complete voice chains.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use triple::audio::{AutomationEvent, ChainId, ImpulseResponse, UnitParam};
use triple::render::VoiceChain;
use triple::{Engine, RealtimeContext};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_voices(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voices");
    let impulse = ImpulseResponse::default_tail(SAMPLE_RATE, 1);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === SINGLE CHAIN ===
        // saw → low-pass → envelope → dry/delay/reverb, envelope held open
        let mut chain = VoiceChain::new(ChainId(0), SAMPLE_RATE, &impulse);
        chain.automate(UnitParam::Envelope, AutomationEvent::SetValue { value: 1.0, time: 0.0 });
        chain.automate(UnitParam::DelayMix, AutomationEvent::SetValue { value: 0.2, time: 0.0 });
        chain.automate(UnitParam::ReverbGain, AutomationEvent::SetValue { value: 0.15, time: 0.0 });
        let mut start = 0.0;

        group.bench_with_input(BenchmarkId::new("chain", size), &size, |b, _| {
            b.iter(|| {
                buffer.fill(0.0);
                chain.render_add(start, black_box(&mut buffer));
                start += size as f64 / SAMPLE_RATE as f64;
            })
        });

        // === FULL RENDERER ===
        // three default voices, each triggered once
        let (ctx, mut renderer) = RealtimeContext::new(SAMPLE_RATE);
        let mut engine = Engine::new(ctx).expect("engine");
        engine.initialize().expect("resume");
        for (voice, note) in [(0, 36), (1, 48), (2, 60)] {
            engine.voice_mut(voice).expect("voice").note_on(note, 1.0).expect("note");
        }

        group.bench_with_input(BenchmarkId::new("renderer_3_voices", size), &size, |b, _| {
            b.iter(|| renderer.render(black_box(&mut buffer)))
        });
    }

    group.finish();
}
