/*
Drift-Corrected Transport
=========================

The transport is a pure state machine; the sequencer thread supplies "now"
and sleeps until `next_deadline()`.

Deadlines are chained off the previous *deadline*, never off the time the
tick actually ran:

    deadline(k) = start + k · step_duration

    start        d1           d2           d3
      │──────────│──────────│──────────│
               ↑ woke late   ↑ woke late
               (d1 + ε)      (d2 + ε')

A late wake-up shortens the next wait instead of pushing every later step
back, so timing error stays bounded by one wake-up's jitter.

    step_duration = 60 / (bpm · 4)           (16th notes)

The cursor wraps at 16. Each pattern reads it modulo its own length.
*/

use std::time::{Duration, Instant};

use super::events::TransportEvent;
use crate::sequencing::PatternStore;

pub const MIN_TEMPO: f32 = 10.0;
pub const MAX_TEMPO: f32 = 300.0;
pub const DEFAULT_TEMPO: f32 = 120.0;
/// Steps per bar; the cursor wraps here.
pub const STEPS_PER_BAR: usize = 16;

/// Read-only view of the transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportSnapshot {
    pub tempo_bpm: f32,
    pub current_step: usize,
    pub playing: bool,
}

#[derive(Debug, Clone)]
pub struct Transport {
    tempo_bpm: f32,
    current_step: usize,
    playing: bool,
    last_step_deadline: Instant,
}

impl Default for Transport {
    fn default() -> Self {
        Self::with_tempo(DEFAULT_TEMPO)
    }
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tempo(bpm: f32) -> Self {
        let tempo_bpm = if bpm.is_nan() {
            DEFAULT_TEMPO
        } else {
            bpm.clamp(MIN_TEMPO, MAX_TEMPO)
        };
        Self {
            tempo_bpm,
            current_step: 0,
            playing: false,
            last_step_deadline: Instant::now(),
        }
    }

    pub fn tempo(&self) -> f32 {
        self.tempo_bpm
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn last_step_deadline(&self) -> Instant {
        self.last_step_deadline
    }

    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            tempo_bpm: self.tempo_bpm,
            current_step: self.current_step,
            playing: self.playing,
        }
    }

    /// Length of one 16th note at the current tempo.
    pub fn step_duration(&self) -> Duration {
        Duration::from_secs_f64(60.0 / (self.tempo_bpm as f64 * 4.0))
    }

    /// Start playing, anchored at `now`. Returns `false` if already playing.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.playing {
            return false;
        }
        self.playing = true;
        self.last_step_deadline = now;
        true
    }

    /// Disarm and rewind. Always emits exactly one [`TransportEvent::Stop`].
    pub fn stop(&mut self, mut emit: impl FnMut(TransportEvent)) {
        self.playing = false;
        self.current_step = 0;
        emit(TransportEvent::Stop);
    }

    /// Change tempo (clamped to `[MIN_TEMPO, MAX_TEMPO]`).
    ///
    /// While playing this restarts from step 0 at `now`. NaN is ignored.
    pub fn set_tempo(&mut self, bpm: f32, now: Instant, emit: impl FnMut(TransportEvent)) {
        if bpm.is_nan() {
            return;
        }
        self.tempo_bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        if self.playing {
            self.stop(emit);
            self.start(now);
        }
    }

    /// When the next step is due, if playing.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.playing
            .then(|| self.last_step_deadline + self.step_duration())
    }

    /// How long to wait from `now` until the next step (zero if overdue).
    pub fn wait_time(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Play the step that is due: advance the deadline, then process it.
    ///
    /// Does nothing when stopped.
    pub fn fire(&mut self, patterns: &PatternStore, emit: impl FnMut(TransportEvent)) {
        let Some(deadline) = self.next_deadline() else {
            return;
        };
        self.last_step_deadline = deadline;
        self.process_step(patterns, emit);
    }

    /// Emit a `Step` for each voice whose current step is active, then move
    /// the cursor and emit `StepChange`.
    pub fn process_step(&mut self, patterns: &PatternStore, mut emit: impl FnMut(TransportEvent)) {
        for (voice, pattern) in patterns.iter().enumerate() {
            if let Some(step) = pattern.step_at(self.current_step) {
                if step.active {
                    emit(TransportEvent::Step { voice, step });
                }
            }
        }
        self.current_step = (self.current_step + 1) % STEPS_PER_BAR;
        emit(TransportEvent::StepChange {
            step: self.current_step,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencing::{Pattern, Step};

    fn collect(events: &mut Vec<TransportEvent>) -> impl FnMut(TransportEvent) + '_ {
        move |event| events.push(event)
    }

    #[test]
    fn test_step_duration_at_120_bpm() {
        let transport = Transport::with_tempo(120.0);
        assert_eq!(transport.step_duration(), Duration::from_millis(125));
    }

    #[test]
    fn test_tempo_is_clamped() {
        assert_eq!(Transport::with_tempo(5.0).tempo(), MIN_TEMPO);
        assert_eq!(Transport::with_tempo(1_000.0).tempo(), MAX_TEMPO);

        let mut transport = Transport::new();
        transport.set_tempo(f32::INFINITY, Instant::now(), |_| {});
        assert_eq!(transport.tempo(), MAX_TEMPO);
        transport.set_tempo(f32::NAN, Instant::now(), |_| {});
        assert_eq!(transport.tempo(), MAX_TEMPO);
    }

    #[test]
    fn test_start_is_idempotent() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        assert!(transport.start(t0));
        assert!(!transport.start(t0 + Duration::from_secs(1)));
        assert_eq!(transport.last_step_deadline(), t0, "second start must not re-anchor");
    }

    #[test]
    fn test_stopped_transport_has_no_deadline() {
        let mut transport = Transport::new();
        assert_eq!(transport.next_deadline(), None);

        let mut events = Vec::new();
        transport.fire(&PatternStore::default(), collect(&mut events));
        assert!(events.is_empty());
        assert_eq!(transport.current_step(), 0);
    }

    #[test]
    fn test_wait_time_saturates_when_late() {
        let t0 = Instant::now();
        let mut transport = Transport::with_tempo(120.0);
        transport.start(t0);

        assert_eq!(transport.wait_time(t0), Some(Duration::from_millis(125)));
        assert_eq!(
            transport.wait_time(t0 + Duration::from_millis(100)),
            Some(Duration::from_millis(25))
        );
        assert_eq!(
            transport.wait_time(t0 + Duration::from_millis(400)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_steps_precede_step_change() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.start(t0);

        let mut events = Vec::new();
        transport.fire(&PatternStore::default(), collect(&mut events));

        let voices: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Step { voice, .. } => Some(*voice),
                _ => None,
            })
            .collect();
        assert_eq!(voices, vec![0, 1, 2]);
        assert_eq!(events.last(), Some(&TransportEvent::StepChange { step: 1 }));
    }

    #[test]
    fn test_inactive_steps_are_silent() {
        let mut store = PatternStore::default();
        store
            .set_pattern(1, Pattern::new(vec![Step::rest(40); 16]))
            .unwrap();

        let mut transport = Transport::new();
        transport.start(Instant::now());
        let mut events = Vec::new();
        transport.fire(&store, collect(&mut events));

        assert!(!events
            .iter()
            .any(|e| matches!(e, TransportEvent::Step { voice: 1, .. })));
    }

    #[test]
    fn test_set_tempo_while_playing_restarts() {
        let t0 = Instant::now();
        let mut transport = Transport::with_tempo(120.0);
        transport.start(t0);
        let store = PatternStore::default();
        for _ in 0..5 {
            transport.fire(&store, |_| {});
        }

        let later = t0 + Duration::from_secs(2);
        let mut events = Vec::new();
        transport.set_tempo(60.0, later, collect(&mut events));

        assert_eq!(events, vec![TransportEvent::Stop]);
        assert!(transport.is_playing());
        assert_eq!(transport.current_step(), 0);
        assert_eq!(transport.next_deadline(), Some(later + Duration::from_millis(250)));
    }

    #[test]
    fn test_set_tempo_while_stopped_is_silent() {
        let mut transport = Transport::new();
        let mut events = Vec::new();
        transport.set_tempo(90.0, Instant::now(), collect(&mut events));
        assert!(events.is_empty());
        assert!(!transport.is_playing());
        assert_eq!(transport.tempo(), 90.0);
    }
}
