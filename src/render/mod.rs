//! Realtime rendering: the audio-thread half of [`RealtimeContext`].
//!
//! [`Renderer::render`] is meant to be called from the device callback. Per
//! call it drains pending [`RenderCommand`]s, renders every voice chain into a
//! mono bus in blocks of at most [`MAX_BLOCK_SIZE`], applies the master gain,
//! and advances the clock the control side reads.

pub mod chain;
pub mod context;
pub mod message;

pub use chain::VoiceChain;
pub use context::RealtimeContext;
pub use message::RenderCommand;

use std::sync::Arc;

use rtrb::Consumer;

use self::context::Shared;
use crate::audio::{ContextState, ParamId, ParamTimeline};
use crate::{MAX_BLOCK_SIZE, VOICE_COUNT};

pub struct Renderer {
    commands: Consumer<RenderCommand>,
    shared: Arc<Shared>,
    chains: Vec<Box<VoiceChain>>,
    master: ParamTimeline,
    master_gain: Vec<f32>,
    mono: Vec<f32>,
    frames: u64,
    sample_rate: f32,
}

impl Renderer {
    pub(crate) fn new(commands: Consumer<RenderCommand>, shared: Arc<Shared>) -> Self {
        let sample_rate = shared.sample_rate();
        Self {
            commands,
            shared,
            chains: Vec::with_capacity(VOICE_COUNT * 4),
            master: ParamTimeline::with_capacity(1.0, 64),
            master_gain: vec![0.0; MAX_BLOCK_SIZE],
            mono: vec![0.0; MAX_BLOCK_SIZE],
            frames: 0,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Seconds rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Fill `out` with the next mono samples.
    pub fn render(&mut self, out: &mut [f32]) {
        self.drain_commands();

        if self.shared.state() != ContextState::Running {
            out.fill(0.0);
            // the clock is frozen, so repeated sets at `now` collapse here
            self.prune();
            return;
        }

        let dt = 1.0 / self.sample_rate as f64;
        for block in out.chunks_mut(MAX_BLOCK_SIZE) {
            let start = self.current_time();
            block.fill(0.0);
            for chain in &mut self.chains {
                chain.render_add(start, block);
            }

            let gain = &mut self.master_gain[..block.len()];
            self.master.fill(start, dt, gain);
            for (sample, g) in block.iter_mut().zip(gain.iter()) {
                *sample *= g;
            }

            self.frames += block.len() as u64;
            self.shared.publish_frames(self.frames);
        }

        self.prune();
    }

    fn prune(&mut self) {
        let now = self.current_time();
        self.master.prune(now);
        for chain in &mut self.chains {
            chain.prune(now);
        }
    }

    /// Render an interleaved buffer, copying the mono bus to every channel.
    pub fn render_interleaved(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let mut mono = std::mem::take(&mut self.mono);
        for frames in data.chunks_mut(MAX_BLOCK_SIZE * channels) {
            let block = &mut mono[..frames.len() / channels];
            self.render(block);
            for (frame, &sample) in frames.chunks_mut(channels).zip(block.iter()) {
                frame.fill(sample);
            }
        }
        self.mono = mono;
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                RenderCommand::AddChain(chain) => self.chains.push(chain),
                RenderCommand::Automate { param, event } => match param {
                    ParamId::Master => self.master.apply(event),
                    ParamId::Voice { chain, param } => {
                        if let Some(target) = self.chains.iter_mut().find(|c| c.id() == chain) {
                            target.automate(param, event);
                        }
                    }
                },
                RenderCommand::SetWaveform { chain, waveform } => {
                    if let Some(target) = self.chains.iter_mut().find(|c| c.id() == chain) {
                        target.set_waveform(waveform);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioContext, AutomationEvent, ImpulseResponse, UnitParam};

    const SR: f32 = 8_000.0;

    fn open_voice(ctx: &RealtimeContext) -> crate::audio::VoiceUnits {
        let units = ctx
            .create_voice_chain(ImpulseResponse::synthetic(SR, 0.1, 2.0, 5))
            .unwrap();
        ctx.schedule(units.envelope, AutomationEvent::SetValue { value: 1.0, time: 0.0 })
            .unwrap();
        units
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn test_suspended_renders_silence_and_holds_clock() {
        let (ctx, mut renderer) = RealtimeContext::new(SR);
        open_voice(&ctx);

        let mut out = vec![1.0; 256];
        renderer.render(&mut out);

        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(ctx.frames(), 0);
        assert_eq!(renderer.chain_count(), 1, "commands are applied while suspended");
    }

    #[test]
    fn test_running_advances_clock() {
        let (ctx, mut renderer) = RealtimeContext::new(SR);
        open_voice(&ctx);
        ctx.resume().unwrap();

        let mut out = vec![0.0; 5_000];
        renderer.render(&mut out);

        assert_eq!(renderer.sample_rate(), SR);
        assert_eq!(ctx.frames(), 5_000);
        assert_eq!(ctx.current_time(), 5_000.0 / SR as f64);
        assert!(peak(&out) > 0.01);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_master_gain_scales_bus() {
        let (ctx, mut renderer) = RealtimeContext::new(SR);
        open_voice(&ctx);
        ctx.schedule(ctx.master(), AutomationEvent::SetValue { value: 0.0, time: 0.0 })
            .unwrap();
        ctx.resume().unwrap();

        let mut out = vec![0.0; 512];
        renderer.render(&mut out);
        assert_eq!(peak(&out), 0.0);
    }

    #[test]
    fn test_suspended_sets_do_not_pile_up() {
        let (ctx, mut renderer) = RealtimeContext::new(SR);
        let units = open_voice(&ctx);

        for batch in 0..9 {
            for i in 0..100 {
                let value = (batch * 100 + i) as f32 * 0.01;
                ctx.schedule(units.resonance, AutomationEvent::SetValue { value, time: 0.0 })
                    .unwrap();
                ctx.schedule(ctx.master(), AutomationEvent::SetValue { value, time: 0.0 })
                    .unwrap();
            }
            let mut out = vec![0.0; 128];
            renderer.render(&mut out);
        }

        let chain = &renderer.chains[0];
        assert_eq!(chain.breakpoints(UnitParam::Resonance), 1);
        assert_eq!(renderer.master.len(), 1);
        assert_eq!(chain.value_at(UnitParam::Resonance, 0.0), 899.0 * 0.01);
        assert_eq!(ctx.frames(), 0);
    }

    #[test]
    fn test_interleaved_copies_mono_to_channels() {
        let (ctx, mut renderer) = RealtimeContext::new(SR);
        open_voice(&ctx);
        ctx.resume().unwrap();

        let mut data = vec![0.0; 2 * 300];
        renderer.render_interleaved(&mut data, 2);

        assert!(data.chunks(2).all(|frame| frame[0] == frame[1]));
        assert!(peak(&data) > 0.0);
        assert_eq!(ctx.frames(), 300);
    }
}
