//! Manually clocked audio context.
//!
//! Nothing is rendered. Automation is recorded per parameter and can be
//! evaluated at any time, which makes this the context of choice for headless
//! use and for checking what a voice asked the audio subsystem to do.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{
    AudioContext, AutomationEvent, ChainId, ContextState, ImpulseResponse, ParamId,
    ParamTimeline, UnitParam, VoiceUnits,
};
use crate::dsp::oscillator::OscillatorWaveform;
use crate::error::{Error, Result};

#[derive(Debug)]
struct ManualState {
    time: f64,
    sample_rate: f32,
    state: ContextState,
    refuse_resume: bool,
    resume_calls: usize,
    chains: Vec<OscillatorWaveform>,
    timelines: HashMap<ParamId, ParamTimeline>,
    history: HashMap<ParamId, Vec<AutomationEvent>>,
}

/// Context whose clock only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualContext {
    inner: Arc<Mutex<ManualState>>,
}

impl ManualContext {
    /// New context at time zero, suspended like a freshly created host context.
    pub fn new(sample_rate: f32) -> Self {
        let mut timelines = HashMap::new();
        timelines.insert(ParamId::Master, ParamTimeline::new(1.0));

        Self {
            inner: Arc::new(Mutex::new(ManualState {
                time: 0.0,
                sample_rate,
                state: ContextState::Suspended,
                refuse_resume: false,
                resume_calls: 0,
                chains: Vec::new(),
                timelines,
                history: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the clock forward.
    pub fn advance(&self, seconds: f64) {
        self.lock().time += seconds;
    }

    pub fn set_time(&self, time: f64) {
        self.lock().time = time;
    }

    /// Make every following [`AudioContext::resume`] fail (host refused playback).
    pub fn refuse_resume(&self, refuse: bool) {
        self.lock().refuse_resume = refuse;
    }

    /// Number of resume attempts that reached this context.
    pub fn resume_calls(&self) -> usize {
        self.lock().resume_calls
    }

    /// Value `param` has at `time` given everything scheduled so far.
    pub fn value_at(&self, param: ParamId, time: f64) -> f32 {
        let state = self.lock();
        state
            .timelines
            .get(&param)
            .map_or_else(|| initial_value(param), |timeline| timeline.value_at(time))
    }

    /// Value `param` settles on once all scheduled events have played out.
    pub fn final_value(&self, param: ParamId) -> f32 {
        let state = self.lock();
        state
            .timelines
            .get(&param)
            .map_or_else(|| initial_value(param), ParamTimeline::final_value)
    }

    /// Every event scheduled on `param`, in call order.
    pub fn history(&self, param: ParamId) -> Vec<AutomationEvent> {
        self.lock().history.get(&param).cloned().unwrap_or_default()
    }

    pub fn waveform(&self, chain: ChainId) -> Option<OscillatorWaveform> {
        self.lock().chains.get(chain.0).copied()
    }

    pub fn chain_count(&self) -> usize {
        self.lock().chains.len()
    }
}

fn initial_value(param: ParamId) -> f32 {
    match param {
        ParamId::Master => 1.0,
        ParamId::Voice { param, .. } => param.initial_value(),
    }
}

impl AudioContext for ManualContext {
    fn current_time(&self) -> f64 {
        self.lock().time
    }

    fn sample_rate(&self) -> f32 {
        self.lock().sample_rate
    }

    fn state(&self) -> ContextState {
        self.lock().state
    }

    fn resume(&self) -> Result<()> {
        let mut state = self.lock();
        state.resume_calls += 1;
        match state.state {
            ContextState::Closed => Err(Error::Closed),
            _ if state.refuse_resume => Err(Error::RendererDisconnected),
            _ => {
                state.state = ContextState::Running;
                Ok(())
            }
        }
    }

    fn suspend(&self) -> Result<()> {
        let mut state = self.lock();
        if state.state == ContextState::Closed {
            return Err(Error::Closed);
        }
        state.state = ContextState::Suspended;
        Ok(())
    }

    fn create_voice_chain(&self, impulse: ImpulseResponse) -> Result<VoiceUnits> {
        let mut state = self.lock();
        let chain = ChainId(state.chains.len());
        state.chains.push(OscillatorWaveform::Saw);
        for param in UnitParam::ALL {
            state.timelines.insert(
                ParamId::Voice { chain, param },
                ParamTimeline::new(param.initial_value()),
            );
        }
        debug!(chain = chain.0, impulse_len = impulse.len(), "created voice chain");
        Ok(VoiceUnits::new(chain))
    }

    fn schedule(&self, param: ParamId, event: AutomationEvent) -> Result<()> {
        let mut state = self.lock();
        state
            .timelines
            .entry(param)
            .or_insert_with(|| ParamTimeline::new(initial_value(param)))
            .apply(event);
        state.history.entry(param).or_default().push(event);
        Ok(())
    }

    fn set_waveform(&self, chain: ChainId, waveform: OscillatorWaveform) -> Result<()> {
        let mut state = self.lock();
        if let Some(slot) = state.chains.get_mut(chain.0) {
            *slot = waveform;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_suspended_and_resumes() {
        let ctx = ManualContext::new(48_000.0);
        assert_eq!(ctx.state(), ContextState::Suspended);

        ctx.resume().unwrap();
        assert_eq!(ctx.state(), ContextState::Running);
        assert_eq!(ctx.resume_calls(), 1);
    }

    #[test]
    fn test_refused_resume_stays_suspended() {
        let ctx = ManualContext::new(48_000.0);
        ctx.refuse_resume(true);

        assert!(ctx.resume().is_err());
        assert_eq!(ctx.state(), ContextState::Suspended);
    }

    #[test]
    fn test_schedule_records_and_evaluates() {
        let ctx = ManualContext::new(48_000.0);
        let units = ctx
            .create_voice_chain(ImpulseResponse::from_samples(vec![1.0], 48_000.0))
            .unwrap();

        ctx.schedule(units.cutoff, AutomationEvent::SetValue { value: 2000.0, time: 0.5 })
            .unwrap();

        assert_eq!(ctx.value_at(units.cutoff, 0.0), 1000.0);
        assert_eq!(ctx.value_at(units.cutoff, 0.5), 2000.0);
        assert_eq!(ctx.history(units.cutoff).len(), 1);
    }
}
