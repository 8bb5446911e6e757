//! Error types.

use thiserror::Error;

/// Errors surfaced to the user by the playback controller.
#[derive(Error, Debug)]
pub enum Error {
    /// The selected file could not be turned into audio frames.
    #[error("could not decode audio: {0}")]
    Decode(#[from] DecodeError),

    /// No output device/engine is available; fatal to the session.
    #[error("audio output unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine has not drained its command queue; nothing was changed.
    #[error("audio engine is busy, try again")]
    CommandQueueFull,

    /// Configuration file could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Decoder failures (unsupported or corrupt input).
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid WAV data: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("file contains no audio frames")]
    Empty,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;
