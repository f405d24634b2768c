/*
Voice Chain (render side)
=========================

The fixed signal path of one voice. Every knob is an automation timeline that
is expanded to one value per sample before the block is rendered.

    osc(freq) ─► lowpass(cutoff, res) ─► × env ─┬─► × dry ──────────────┐
                                                ├─► delay(time, fb) × mix ┼─► × output ─► bus
                                                └─► convolver × reverb ──┘

Everything, FFT plans and the impulse spectrum included, is allocated in
`new` on the control thread. Rendering never allocates.
*/

use crate::audio::{AutomationEvent, ChainId, ImpulseResponse, ParamTimeline, UnitParam};
use crate::dsp::convolver::Convolver;
use crate::dsp::delay::{DelayLine, MAX_DELAY_SECONDS};
use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::{Oscillator, OscillatorWaveform};
use crate::MAX_BLOCK_SIZE;

const PARAM_COUNT: usize = UnitParam::ALL.len();
/// Breakpoints reserved per timeline so ordinary triggers never reallocate.
const TIMELINE_CAPACITY: usize = 64;

pub struct VoiceChain {
    id: ChainId,
    sample_rate: f32,
    oscillator: Oscillator,
    filter: SVFilter,
    delay: DelayLine,
    reverb: Convolver,
    timelines: [ParamTimeline; PARAM_COUNT],
    values: [Vec<f32>; PARAM_COUNT],
}

impl VoiceChain {
    pub fn new(id: ChainId, sample_rate: f32, impulse: &ImpulseResponse) -> Self {
        Self {
            id,
            sample_rate,
            oscillator: Oscillator::sawtooth(),
            filter: SVFilter::lowpass(
                UnitParam::Cutoff.initial_value(),
                UnitParam::Resonance.initial_value(),
            ),
            delay: DelayLine::new(sample_rate, MAX_DELAY_SECONDS),
            reverb: Convolver::from_impulse(impulse),
            timelines: std::array::from_fn(|i| {
                ParamTimeline::with_capacity(UnitParam::ALL[i].initial_value(), TIMELINE_CAPACITY)
            }),
            values: std::array::from_fn(|_| vec![0.0; MAX_BLOCK_SIZE]),
        }
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn automate(&mut self, param: UnitParam, event: AutomationEvent) {
        self.timelines[param.index()].apply(event);
    }

    pub fn set_waveform(&mut self, waveform: OscillatorWaveform) {
        self.oscillator.set_waveform(waveform);
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.oscillator.waveform()
    }

    /// Current value of `param` at time `t`.
    pub fn value_at(&self, param: UnitParam, t: f64) -> f32 {
        self.timelines[param.index()].value_at(t)
    }

    /// Breakpoints currently held for `param`.
    pub fn breakpoints(&self, param: UnitParam) -> usize {
        self.timelines[param.index()].len()
    }

    /// Forget automation history before `t`.
    pub fn prune(&mut self, t: f64) {
        for timeline in &mut self.timelines {
            timeline.prune(t);
        }
    }

    /// Render `out.len()` samples starting at `start` seconds and add them to
    /// `out`. `out` must not be longer than `MAX_BLOCK_SIZE`.
    pub fn render_add(&mut self, start: f64, out: &mut [f32]) {
        let len = out.len().min(MAX_BLOCK_SIZE);
        let dt = 1.0 / self.sample_rate as f64;
        for (timeline, values) in self.timelines.iter().zip(self.values.iter_mut()) {
            timeline.fill(start, dt, &mut values[..len]);
        }

        let sr = self.sample_rate;
        let v = &self.values;
        let at = |param: UnitParam, n: usize| v[param.index()][n];

        for (n, sample) in out[..len].iter_mut().enumerate() {
            let osc = self.oscillator.next_sample(at(UnitParam::Frequency, n), sr);
            let filtered = self.filter.process(
                osc,
                at(UnitParam::Cutoff, n),
                at(UnitParam::Resonance, n),
                sr,
            );
            let voiced = filtered * at(UnitParam::Envelope, n);

            let delayed = self.delay.process(
                voiced,
                at(UnitParam::DelayTime, n),
                at(UnitParam::DelayFeedback, n),
                sr,
            );
            let wet = self.reverb.process(voiced);

            let mixed = voiced * at(UnitParam::DryGain, n)
                + delayed * at(UnitParam::DelayMix, n)
                + wet * at(UnitParam::ReverbGain, n);
            *sample += mixed * at(UnitParam::Output, n);
        }
    }
}
