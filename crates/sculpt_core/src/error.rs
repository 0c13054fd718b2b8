//! Engine Error Types

use thiserror::Error;

/// Errors that can occur in the audio engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No audio output device found")]
    NoOutputDevice,

    #[error("No audio input device found")]
    NoInputDevice,

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to play audio stream: {0}")]
    StreamPlayError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("DSP error: {0}")]
    DspError(#[from] sculpt_dsp::DspError),

    #[error("Channel send error - receiver dropped")]
    ChannelSendError,
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
