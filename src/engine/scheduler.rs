//! The sequencer control thread.
//!
//! One thread owns the transport, the patterns, the engine and the event bus.
//! Callers talk to it through a [`SequencerHandle`]; every request is a
//! [`Command`] on one channel, so all control-rate state is touched by this
//! thread alone and needs no locks.
//!
//! The thread sleeps in `select!` on two things at once:
//!
//! ```text
//!   select! {
//!       recv(commands)        -> handle the request, re-arm
//!       recv(at(deadline))    -> fire the due step, re-arm
//!   }
//! ```
//!
//! The deadline timer is rebuilt on every pass from
//! [`Transport::next_deadline`], so a `Stop` disarms it before the next wait
//! and a stopped transport waits on `never()`.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use super::events::{EventBus, Subscription, SubscriptionId, TransportEvent, TransportListener};
use super::transport::{Transport, TransportSnapshot};
use super::Engine;
use crate::audio::AudioContext;
use crate::dsp::OscillatorWaveform;
use crate::error::{Error, Result};
use crate::sequencing::{Pattern, PatternStore};
use crate::synth::VoiceParam;

/// Requests understood by the control thread. Each carries a reply channel.
enum Command {
    Start(Sender<bool>),
    Stop(Sender<()>),
    SetTempo(f32, Sender<()>),
    SetPattern {
        voice: usize,
        pattern: Pattern,
        reply: Sender<Result<()>>,
    },
    Pattern {
        voice: usize,
        reply: Sender<Result<Pattern>>,
    },
    Transport(Sender<TransportSnapshot>),
    Subscribe {
        capacity: usize,
        reply: Sender<Subscription>,
    },
    Unsubscribe(SubscriptionId, Sender<bool>),
    Initialize(Sender<Result<()>>),
    SetParam {
        voice: usize,
        param: VoiceParam,
        value: f32,
        reply: Sender<Result<()>>,
    },
    SetParameter {
        voice: usize,
        name: String,
        value: f32,
        reply: Sender<Result<()>>,
    },
    SetWaveform {
        voice: usize,
        waveform: OscillatorWaveform,
        reply: Sender<Result<()>>,
    },
    NoteOn {
        voice: usize,
        note: u8,
        velocity: f32,
        reply: Sender<Result<()>>,
    },
    NoteOff {
        voice: usize,
        reply: Sender<Result<()>>,
    },
    SetMasterVolume(f32, Sender<Result<()>>),
    Shutdown,
}

/// Control-thread state. Configure it, then [`Sequencer::spawn`] it.
pub struct Sequencer<C: AudioContext> {
    transport: Transport,
    patterns: PatternStore,
    engine: Engine<C>,
    bus: EventBus,
    listeners: Vec<Box<dyn TransportListener + Send>>,
}

impl<C: AudioContext> Sequencer<C> {
    pub fn new(engine: Engine<C>) -> Self {
        Self {
            transport: Transport::new(),
            patterns: PatternStore::default(),
            engine,
            bus: EventBus::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_tempo(mut self, bpm: f32) -> Self {
        self.transport = Transport::with_tempo(bpm);
        self
    }

    pub fn with_patterns(mut self, patterns: PatternStore) -> Self {
        self.patterns = patterns;
        self
    }

    /// Extra observer called on the control thread after the engine.
    pub fn with_listener(mut self, listener: impl TransportListener + Send + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Move everything onto a new control thread.
    pub fn spawn(self) -> Result<SequencerHandle> {
        let (commands, rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("triple-sequencer".into())
            .spawn(move || self.run(rx))
            .map_err(Error::Spawn)?;

        Ok(SequencerHandle {
            commands,
            thread: Some(thread),
        })
    }

    fn run(mut self, commands: Receiver<Command>) {
        tracing::debug!(tempo = self.transport.tempo(), "sequencer thread started");

        loop {
            let timer = match self.transport.next_deadline() {
                Some(deadline) => crossbeam_channel::at(deadline),
                None => crossbeam_channel::never(),
            };

            crossbeam_channel::select! {
                recv(commands) -> msg => match msg {
                    Ok(Command::Shutdown) | Err(_) => break,
                    Ok(cmd) => self.handle(cmd),
                },
                recv(timer) -> fired => {
                    if let Ok(fired) = fired {
                        self.tick(fired);
                    }
                }
            }
        }

        tracing::debug!("sequencer thread stopped");
    }

    fn tick(&mut self, fired: Instant) {
        if let Some(deadline) = self.transport.next_deadline() {
            tracing::trace!(
                step = self.transport.current_step(),
                late_us = fired.saturating_duration_since(deadline).as_micros() as u64,
                "tick"
            );
        }
        let Self {
            transport,
            patterns,
            engine,
            bus,
            listeners,
        } = self;
        transport.fire(patterns, |event| dispatch(engine, listeners, bus, event));
    }

    fn stop(&mut self) {
        let Self {
            transport,
            engine,
            bus,
            listeners,
            ..
        } = self;
        transport.stop(|event| dispatch(engine, listeners, bus, event));
    }

    fn handle(&mut self, cmd: Command) {
        // A caller that stopped waiting for its reply is not an error here.
        match cmd {
            Command::Start(reply) => {
                let started = self.transport.start(Instant::now());
                if started {
                    tracing::debug!(tempo = self.transport.tempo(), "transport started");
                }
                let _ = reply.send(started);
            }
            Command::Stop(reply) => {
                self.stop();
                tracing::debug!("transport stopped");
                let _ = reply.send(());
            }
            Command::SetTempo(bpm, reply) => {
                let Self {
                    transport,
                    engine,
                    bus,
                    listeners,
                    ..
                } = self;
                transport.set_tempo(bpm, Instant::now(), |event| {
                    dispatch(engine, listeners, bus, event)
                });
                tracing::debug!(tempo = self.transport.tempo(), "tempo changed");
                let _ = reply.send(());
            }
            Command::SetPattern {
                voice,
                pattern,
                reply,
            } => {
                let _ = reply.send(self.patterns.set_pattern(voice, pattern));
            }
            Command::Pattern { voice, reply } => {
                let _ = reply.send(self.patterns.pattern(voice).cloned());
            }
            Command::Transport(reply) => {
                let _ = reply.send(self.transport.snapshot());
            }
            Command::Subscribe { capacity, reply } => {
                let _ = reply.send(self.bus.subscribe_with_capacity(capacity));
            }
            Command::Unsubscribe(id, reply) => {
                let _ = reply.send(self.bus.unsubscribe(id));
            }
            Command::Initialize(reply) => {
                let _ = reply.send(self.engine.initialize());
            }
            Command::SetParam {
                voice,
                param,
                value,
                reply,
            } => {
                let result = self
                    .engine
                    .voice_mut(voice)
                    .and_then(|v| v.set(param, value));
                let _ = reply.send(result);
            }
            Command::SetParameter {
                voice,
                name,
                value,
                reply,
            } => {
                let _ = reply.send(self.engine.set_parameter(voice, &name, value));
            }
            Command::SetWaveform {
                voice,
                waveform,
                reply,
            } => {
                let result = self
                    .engine
                    .voice_mut(voice)
                    .and_then(|v| v.set_waveform(waveform));
                let _ = reply.send(result);
            }
            Command::NoteOn {
                voice,
                note,
                velocity,
                reply,
            } => {
                let result = self
                    .engine
                    .voice_mut(voice)
                    .and_then(|v| v.note_on(note, velocity));
                let _ = reply.send(result);
            }
            Command::NoteOff { voice, reply } => {
                let result = self.engine.voice_mut(voice).and_then(|v| v.note_off());
                let _ = reply.send(result);
            }
            Command::SetMasterVolume(volume, reply) => {
                let _ = reply.send(self.engine.set_master_volume(volume));
            }
            Command::Shutdown => {}
        }
    }
}

/// Engine first, then extra listeners, then channel subscribers.
fn dispatch<C: AudioContext>(
    engine: &mut Engine<C>,
    listeners: &mut [Box<dyn TransportListener + Send>],
    bus: &mut EventBus,
    event: TransportEvent,
) {
    engine.on_event(&event);
    for listener in listeners.iter_mut() {
        listener.on_event(&event);
    }
    bus.publish(event);
}

/// Caller side of a running [`Sequencer`].
///
/// Every method blocks until the control thread has applied the request.
/// Dropping the handle shuts the thread down.
pub struct SequencerHandle {
    commands: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl SequencerHandle {
    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = crossbeam_channel::bounded(1);
        self.commands
            .send(make(reply))
            .map_err(|_| Error::Disconnected)?;
        response.recv().map_err(|_| Error::Disconnected)
    }

    /// Start the transport. Returns `false` if it was already playing.
    pub fn start(&self) -> Result<bool> {
        self.request(Command::Start)
    }

    /// Stop and rewind. The next step will not fire once this returns.
    pub fn stop(&self) -> Result<()> {
        self.request(Command::Stop)
    }

    pub fn set_tempo(&self, bpm: f32) -> Result<()> {
        self.request(|reply| Command::SetTempo(bpm, reply))
    }

    pub fn set_pattern(&self, voice: usize, pattern: Pattern) -> Result<()> {
        self.request(|reply| Command::SetPattern {
            voice,
            pattern,
            reply,
        })?
    }

    pub fn pattern(&self, voice: usize) -> Result<Pattern> {
        self.request(|reply| Command::Pattern { voice, reply })?
    }

    pub fn transport(&self) -> Result<TransportSnapshot> {
        self.request(Command::Transport)
    }

    pub fn subscribe(&self) -> Result<Subscription> {
        self.subscribe_with_capacity(super::events::SUBSCRIPTION_CAPACITY)
    }

    pub fn subscribe_with_capacity(&self, capacity: usize) -> Result<Subscription> {
        self.request(|reply| Command::Subscribe { capacity, reply })
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        self.request(|reply| Command::Unsubscribe(id, reply))
    }

    /// Activate audio output (see [`Engine::initialize`]).
    pub fn initialize(&self) -> Result<()> {
        self.request(Command::Initialize)?
    }

    pub fn set_param(&self, voice: usize, param: VoiceParam, value: f32) -> Result<()> {
        self.request(|reply| Command::SetParam {
            voice,
            param,
            value,
            reply,
        })?
    }

    /// Set a parameter by knob name; unknown names are ignored.
    pub fn set_parameter(&self, voice: usize, name: &str, value: f32) -> Result<()> {
        let name = name.to_owned();
        self.request(|reply| Command::SetParameter {
            voice,
            name,
            value,
            reply,
        })?
    }

    pub fn set_waveform(&self, voice: usize, waveform: OscillatorWaveform) -> Result<()> {
        self.request(|reply| Command::SetWaveform {
            voice,
            waveform,
            reply,
        })?
    }

    pub fn note_on(&self, voice: usize, note: u8, velocity: f32) -> Result<()> {
        self.request(|reply| Command::NoteOn {
            voice,
            note,
            velocity,
            reply,
        })?
    }

    pub fn note_off(&self, voice: usize) -> Result<()> {
        self.request(|reply| Command::NoteOff { voice, reply })?
    }

    pub fn set_master_volume(&self, volume: f32) -> Result<()> {
        self.request(|reply| Command::SetMasterVolume(volume, reply))?
    }

    /// Stop the control thread and wait for it to exit.
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        let _ = self.commands.send(Command::Shutdown);
        thread.join().map_err(|_| Error::Disconnected)
    }
}

impl Drop for SequencerHandle {
    fn drop(&mut self) {
        if let Err(err) = self.join() {
            tracing::warn!(error = %err, "sequencer thread panicked");
        }
    }
}
