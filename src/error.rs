//! Error type shared by the engine, the sequencer and the realtime context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A voice index outside `0..count` was addressed.
    #[error("voice index {index} out of range (engine has {count} voices)")]
    VoiceIndex { index: usize, count: usize },

    /// The render side of a realtime context has been dropped.
    #[error("audio renderer is no longer running")]
    RendererDisconnected,

    /// The control → render ring buffer has no free slot.
    #[error("render command queue is full")]
    CommandQueueFull,

    /// The audio context was closed and cannot be resumed.
    #[error("audio context is closed")]
    Closed,

    /// The sequencer control thread is gone.
    #[error("sequencer control thread has stopped")]
    Disconnected,

    /// The operating system refused to start the sequencer thread.
    #[error("failed to spawn sequencer thread")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
