//! Error types for the translation pipeline.

use crate::language::Language;
use uuid::Uuid;

/// Failures at the microphone capability boundary.
///
/// Surfaced by `begin_capture`; capture does not start and the side stays
/// idle. Nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// No microphone is available.
    #[error("no input device available")]
    NotFound,

    /// The OS denied microphone access.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// The device is already claimed (by another process or another capture).
    #[error("input device busy")]
    Busy,

    /// Any other device or stream failure.
    #[error("audio device error: {0}")]
    Unknown(String),
}

/// Failures from the speech-to-text collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptionError {
    /// No speech was detected in the utterance.
    #[error("no speech detected")]
    Empty,

    /// The transcription service could not be reached or errored.
    #[error("transcription service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Failures from the translation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    /// The translation service could not be reached or errored.
    #[error("translation service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Failures from the speech-synthesis collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    /// Synthesis failed; the message stays text-only.
    #[error("synthesis failed: {0}")]
    Failed(String),
}

/// Top-level error type for the live-translation session.
///
/// Every variant is local to one exchange attempt: the session returns to
/// idle and is ready for the next gesture.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// Microphone capability failure.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The other side is already capturing; rejected synchronously, never
    /// queued.
    #[error("the other side is already capturing")]
    SideBusy,

    /// Capture produced no usable speech. Non-fatal: no message is created.
    #[error("no speech captured")]
    EmptyCapture,

    /// `end_capture` was called on a side that is not capturing.
    #[error("side is not capturing")]
    NotCapturing,

    /// Speech-to-text failure. Produces no message.
    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    /// Translation failure. Produces no message.
    #[error("translation failed: {0}")]
    Translation(#[from] TranslationError),

    /// Synthesis failure on an explicit replay request.
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// The session was torn down while a request was in flight; the result
    /// was discarded without touching history.
    #[error("session closed")]
    SessionClosed,

    /// A source/target pair with identical languages was requested.
    #[error("source and target language must differ")]
    LanguagePair,

    /// The requested language is neither side of the message's pair.
    #[error("language {0} is not part of this message")]
    LanguageMismatch(Language),

    /// No message with this id exists in the history.
    #[error("unknown message: {0}")]
    UnknownMessage(Uuid),

    /// Audio playback failure. The message itself remains replayable.
    #[error("playback error: {0}")]
    Playback(String),

    /// History collaborator failure.
    #[error("history error: {0}")]
    History(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TranslateError>;
