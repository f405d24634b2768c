/*
Parameter Automation
====================

Every knob in a voice is a parameter with a timeline. The control thread never
writes a parameter directly; it appends events to the timeline and the render
thread asks "what is the value at time t?" for each sample.

  value
    │          ┌──────────╮
    │         ╱            ╲__
    │        ╱                ‾‾‾‾‾───────
    │───────┘
    └───────┬───┬──────────┬──────────────→ time
          set  linear    exponential
          @t0  ramp @t1  ramp @t2

Events are kept sorted by time. A ramp always starts at the previous event's
(time, value) and ends at its own (end_time, value). Events that share a time
stay in insertion order, so "set 0 at now, ramp up by now + 10ms" behaves the
way it reads.

Exponential ramps
-----------------

  v(t) = v0 * (v1 / v0) ^ ((t - t0) / (t1 - t0))

Undefined when v0 or v1 is zero or the two have opposite signs. In that case
the previous value is held until the ramp's end time. That is why envelopes
decay toward 0.001 rather than 0.

Cancellation
------------

  cancel(t)           drop every event at or after t
  cancel_and_hold(t)  drop every event at or after t, then pin the value the
                      timeline had at t (a ramp in progress freezes mid-way)
*/

/// One automation command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue { value: f32, time: f64 },
    /// Ramp linearly from the previous event to `value`, arriving at `end_time`.
    LinearRamp { value: f32, end_time: f64 },
    /// Ramp exponentially from the previous event to `value`, arriving at `end_time`.
    ExponentialRamp { value: f32, end_time: f64 },
    /// Remove every event scheduled at or after `time`.
    CancelScheduled { time: f64 },
    /// Remove every event at or after `time` and hold the value at `time`.
    CancelAndHold { time: f64 },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. }
            | AutomationEvent::CancelScheduled { time }
            | AutomationEvent::CancelAndHold { time } => time,
            AutomationEvent::LinearRamp { end_time, .. }
            | AutomationEvent::ExponentialRamp { end_time, .. } => end_time,
        }
    }
}

/// How a breakpoint is approached from the one before it.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Approach {
    Step,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    time: f64,
    value: f32,
    approach: Approach,
}

/// Time-ordered automation for one parameter.
#[derive(Debug, Clone)]
pub struct ParamTimeline {
    initial: f32,
    points: Vec<Breakpoint>,
}

impl ParamTimeline {
    pub fn new(initial: f32) -> Self {
        Self::with_capacity(initial, 16)
    }

    pub fn with_capacity(initial: f32, capacity: usize) -> Self {
        Self {
            initial,
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn apply(&mut self, event: AutomationEvent) {
        match event {
            AutomationEvent::SetValue { value, time } => self.insert(Breakpoint {
                time,
                value,
                approach: Approach::Step,
            }),
            AutomationEvent::LinearRamp { value, end_time } => self.insert(Breakpoint {
                time: end_time,
                value,
                approach: Approach::Linear,
            }),
            AutomationEvent::ExponentialRamp { value, end_time } => self.insert(Breakpoint {
                time: end_time,
                value,
                approach: Approach::Exponential,
            }),
            AutomationEvent::CancelScheduled { time } => {
                self.points.retain(|p| p.time < time);
            }
            AutomationEvent::CancelAndHold { time } => {
                let held = self.value_at(time);
                self.points.retain(|p| p.time < time);
                self.insert(Breakpoint {
                    time,
                    value: held,
                    approach: Approach::Step,
                });
            }
        }
    }

    fn insert(&mut self, point: Breakpoint) {
        let index = self.points.partition_point(|p| p.time <= point.time);
        self.points.insert(index, point);
    }

    /// Value of the parameter at time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        let mut prev_time = 0.0_f64;
        let mut prev_value = self.initial;

        for point in &self.points {
            if point.time <= t {
                prev_time = point.time;
                prev_value = point.value;
                continue;
            }

            let frac = ((t - prev_time) / (point.time - prev_time)) as f32;
            return match point.approach {
                Approach::Step => prev_value,
                Approach::Linear => prev_value + (point.value - prev_value) * frac,
                Approach::Exponential => {
                    let defined = prev_value != 0.0
                        && point.value != 0.0
                        && prev_value.is_sign_positive() == point.value.is_sign_positive();
                    if defined {
                        prev_value * (point.value / prev_value).powf(frac)
                    } else {
                        prev_value
                    }
                }
            };
        }

        prev_value
    }

    /// Fill `out` with per-sample values starting at `start`, `dt` seconds apart.
    pub fn fill(&self, start: f64, dt: f64, out: &mut [f32]) {
        let settled = self.points.last().map_or(true, |p| p.time <= start);
        if settled {
            out.fill(self.value_at(start));
            return;
        }
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.value_at(start + i as f64 * dt);
        }
    }

    /// Forget history before `t` without changing any value at or after `t`.
    pub fn prune(&mut self, t: f64) {
        let Some(last_past) = self.points.iter().rposition(|p| p.time <= t) else {
            return;
        };
        self.points.drain(..last_past);
        // The anchor's own approach only shaped values before it.
        self.points[0].approach = Approach::Step;
    }

    /// Value after every scheduled event has played out.
    pub fn final_value(&self) -> f32 {
        self.points.last().map_or(self.initial, |p| p.value)
    }

    /// Number of pending breakpoints.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
