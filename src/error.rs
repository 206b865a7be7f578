use crate::vm::ParseOpcodeError;
use std::io;
use thiserror::Error;

/// failures on the host side of the instrument; the audio core itself never
/// fails
#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("clip {slot}: unsupported format ({reason})")]
    ClipFormat { slot: usize, reason: String },

    #[error("bad program: {0}")]
    Program(#[from] ParseOpcodeError),

    #[error("no audio output device available")]
    NoOutputDevice,

    #[error("unsupported output sample format {0}")]
    SampleFormat(String),

    #[error("audio device config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("producer thread panicked")]
    ProducerPanicked,
}
