//! triple - plays the default three-voice acid pattern
//!
//! Run with: cargo run -- --bpm 128 --seconds 30
//! Step changes are logged at debug level: RUST_LOG=triple=debug

use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing_subscriber::EnvFilter;

use triple::{
    dsp::OscillatorWaveform, engine::Sequencer, sequencing::note_name, Engine, RealtimeContext,
    TransportEvent, VOICE_COUNT,
};

#[derive(Parser, Debug)]
#[command(name = "triple")]
#[command(version, about = "Three-voice acid synthesizer", long_about = None)]
struct Args {
    /// Tempo in beats per minute (clamped to 10-300)
    #[arg(long, default_value_t = 120.0)]
    bpm: f32,

    /// Master output gain
    #[arg(long, default_value_t = 1.0)]
    master: f32,

    /// Stop after this many seconds instead of waiting for Ctrl+C
    #[arg(long)]
    seconds: Option<f64>,

    /// Oscillator waveform for all voices: sine, saw, square or triangle
    #[arg(long)]
    waveform: Option<OscillatorWaveform>,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let play_for = args.seconds.map(play_duration).transpose()?;

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;
    tracing::info!(sample_rate, channels, bpm = args.bpm, "audio config");

    let (ctx, mut renderer) = RealtimeContext::new(sample_rate);

    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| renderer.render_interleaved(data, channels),
            |err| tracing::error!(error = %err, "audio stream error"),
            None,
        )
        .wrap_err("failed to build output stream")?;
    stream.play().wrap_err("failed to start output stream")?;

    let engine = Engine::new(ctx).wrap_err("failed to build voices")?;
    let sequencer = Sequencer::new(engine)
        .with_tempo(args.bpm)
        .spawn()
        .wrap_err("failed to start sequencer")?;

    sequencer.set_master_volume(args.master)?;
    if let Some(waveform) = args.waveform {
        for voice in 0..VOICE_COUNT {
            sequencer.set_waveform(voice, waveform)?;
        }
    }

    let steps = sequencer.subscribe()?;
    sequencer
        .initialize()
        .wrap_err("audio output refused to start")?;
    sequencer.start()?;

    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .wrap_err("failed to install Ctrl+C handler")?;

    let timeout = match play_for {
        Some(duration) => {
            let deadline = Instant::now()
                .checked_add(duration)
                .ok_or_else(|| eyre!("--seconds is too large"))?;
            crossbeam_channel::at(deadline)
        }
        None => crossbeam_channel::never(),
    };

    println!("Playing at {} BPM... Press Ctrl+C to stop", sequencer.transport()?.tempo_bpm);

    loop {
        crossbeam_channel::select! {
            recv(stop_rx) -> _ => break,
            recv(timeout) -> _ => break,
            recv(steps.receiver) -> event => match event {
                Ok(TransportEvent::StepChange { step }) => tracing::debug!(step, "step"),
                Ok(TransportEvent::Step { voice, step }) => {
                    tracing::trace!(voice, note = %note_name(step.note), accent = step.accent, "note");
                }
                Ok(TransportEvent::Stop) => {}
                Err(_) => break,
            },
        }
    }

    println!("\nStopping...");
    sequencer.stop()?;
    sequencer.shutdown()?;
    drop(stream);
    Ok(())
}

/// Playback length from `--seconds`. Negative values stop right away.
fn play_duration(seconds: f64) -> EyreResult<Duration> {
    Duration::try_from_secs_f64(seconds.max(0.0))
        .wrap_err_with(|| format!("invalid --seconds value: {seconds}"))
}
