//! Transport timing and step sequencing, driven with a simulated clock.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use triple::engine::transport::{Transport, MAX_TEMPO, MIN_TEMPO, STEPS_PER_BAR};
use triple::engine::{Engine, TransportEvent, TransportListener};
use triple::sequencing::midi_note_to_freq;
use triple::{ManualContext, PatternStore};

fn run_ticks(
    transport: &mut Transport,
    patterns: &PatternStore,
    ticks: usize,
) -> Vec<TransportEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        transport.fire(patterns, |event| events.push(event));
    }
    events
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any finite tempo is stored clamped to [10, 300].
    #[test]
    fn tempo_is_clamped(bpm in -1_000.0f32..2_000.0f32, playing in any::<bool>()) {
        let now = Instant::now();
        let mut transport = Transport::new();
        if playing {
            transport.start(now);
        }
        transport.set_tempo(bpm, now, |_| {});
        prop_assert_eq!(transport.tempo(), bpm.clamp(MIN_TEMPO, MAX_TEMPO));
        prop_assert_eq!(transport.is_playing(), playing);
    }

    /// However late each wake-up is, the k-th deadline stays at start + k·step.
    #[test]
    fn deadlines_do_not_compound(
        bpm in 10.0f32..300.0f32,
        delays_us in prop::collection::vec(0u64..20_000, 1..64),
    ) {
        let t0 = Instant::now();
        let patterns = PatternStore::default();
        let mut transport = Transport::with_tempo(bpm);
        transport.start(t0);
        let step = transport.step_duration();

        for (k, delay) in delays_us.iter().enumerate() {
            let deadline = transport.next_deadline().unwrap();
            let woke = deadline + Duration::from_micros(*delay);
            transport.fire(&patterns, |_| {});

            let k = k as u32 + 1;
            prop_assert_eq!(transport.last_step_deadline(), t0 + step * k);
            // the lateness is taken out of the next wait, not added to it
            prop_assert_eq!(
                transport.wait_time(woke),
                Some(step.saturating_sub(Duration::from_micros(*delay)))
            );
        }
    }
}

#[test]
fn start_twice_keeps_one_clock() {
    let t0 = Instant::now();
    let patterns = PatternStore::default();
    let mut transport = Transport::with_tempo(120.0);

    assert!(transport.start(t0));
    assert!(!transport.start(t0 + Duration::from_millis(60)));

    let events = run_ticks(&mut transport, &patterns, 1);
    let steps = events
        .iter()
        .filter(|e| matches!(e, TransportEvent::Step { .. }))
        .count();
    assert_eq!(steps, 3, "one step per voice, not per start call");
    assert_eq!(transport.last_step_deadline(), t0 + Duration::from_millis(125));
}

#[test]
fn stop_rewinds_and_emits_once() {
    let patterns = PatternStore::default();
    for position in [0, 3, 11, 15] {
        let mut transport = Transport::new();
        transport.start(Instant::now());
        run_ticks(&mut transport, &patterns, position);

        let mut events = Vec::new();
        transport.stop(|e| events.push(e));

        assert_eq!(events, vec![TransportEvent::Stop]);
        assert_eq!(transport.current_step(), 0);
        assert!(!transport.is_playing());
        assert_eq!(transport.next_deadline(), None);
    }
}

#[test]
fn cursor_wraps_after_sixteen_ticks() {
    let patterns = PatternStore::default();
    let mut transport = Transport::new();
    transport.start(Instant::now());

    let events = run_ticks(&mut transport, &patterns, STEPS_PER_BAR);
    assert_eq!(transport.current_step(), 0);

    let changes: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            TransportEvent::StepChange { step } => Some(*step),
            _ => None,
        })
        .collect();
    let expected: Vec<usize> = (1..=STEPS_PER_BAR).map(|s| s % STEPS_PER_BAR).collect();
    assert_eq!(changes, expected);
}

#[test]
fn short_pattern_loops_while_cursor_runs_to_sixteen() {
    use triple::{Pattern, Step};

    let mut patterns = PatternStore::default();
    patterns
        .set_pattern(0, Pattern::new(vec![Step::note(30), Step::note(31), Step::note(32)]))
        .unwrap();
    let mut transport = Transport::new();
    transport.start(Instant::now());

    let events = run_ticks(&mut transport, &patterns, STEPS_PER_BAR + 2);
    let notes: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            TransportEvent::Step { voice: 0, step } => Some(step.note),
            _ => None,
        })
        .collect();

    // 16 % 3 == 1, so the second bar starts on the pattern's first note again
    let mut expected: Vec<u8> = (0..16).map(|c| 30 + (c % 3) as u8).collect();
    expected.extend([30, 31]);
    assert_eq!(notes, expected);
}

/// Records events and forwards them to the engine, the way the sequencer
/// thread dispatches.
struct Recorder<'a> {
    engine: &'a mut Engine<ManualContext>,
    events: Vec<TransportEvent>,
}

impl TransportListener for Recorder<'_> {
    fn on_event(&mut self, event: &TransportEvent) {
        self.engine.on_event(event);
        self.events.push(*event);
    }
}

#[test]
fn default_session_at_120_bpm() {
    let ctx = ManualContext::new(8_000.0);
    let mut engine = Engine::new(ctx.clone()).unwrap();
    let patterns = PatternStore::default();
    let mut transport = Transport::with_tempo(120.0);

    assert_eq!(transport.step_duration(), Duration::from_millis(125));

    let t0 = Instant::now();
    transport.start(t0);
    let mut recorder = Recorder {
        engine: &mut engine,
        events: Vec::new(),
    };
    for tick in 0..8 {
        ctx.set_time(tick as f64 * 0.125);
        transport.fire(&patterns, |event| recorder.on_event(&event));
    }
    let events = recorder.events;

    assert_eq!(transport.current_step(), 8);
    assert_eq!(transport.last_step_deadline(), t0 + Duration::from_millis(1000));

    let voice0: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            TransportEvent::Step { voice: 0, step } => Some(step.note),
            _ => None,
        })
        .collect();
    assert_eq!(voice0, vec![36, 48, 43, 41, 36, 48, 43, 41]);

    // the engine followed along
    assert!(engine.is_initialized());
    let last = engine.voice(0).unwrap().target_frequency();
    assert!((last - midi_note_to_freq(41)).abs() < 1e-3);
    assert!((engine.voice(2).unwrap().target_frequency() - midi_note_to_freq(65)).abs() < 1e-3);
}
