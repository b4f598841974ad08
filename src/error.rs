// src/error.rs

/// Result alias that carries the crate-wide [`EngineError`] type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Error taxonomy for the audio core.
///
/// Every variant is local-recoverable: the worst outcome for a caller is
/// "no sound", never a crashed session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The output device has not been resumed yet. Retry the triggering
    /// action after [`crate::OutputDevice::resume`] (typically on the
    /// next user gesture).
    #[error("output device is suspended; resume it and retry")]
    DeviceSuspended,

    /// A pattern failed validation. No scheduler state was mutated.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// A tone description failed validation.
    #[error("invalid tone: {0}")]
    InvalidTone(String),

    /// An envelope description failed validation.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// A voice was requested with an impossible start/stop window.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}
