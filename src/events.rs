//! Session events emitted by the pipeline for UI and observability.
//!
//! Intentionally lightweight (ids and short strings, no audio payloads) so
//! the orchestrator can emit without blocking the exchange path.

use crate::language::LanguagePair;
use crate::message::Speaker;
use uuid::Uuid;

/// What the session is doing "right now".
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A side acquired the microphone and started capturing.
    CaptureStarted { side: Speaker },
    /// Live partial transcript while a side is capturing (only when the
    /// transcription channel streams incremental results).
    PartialTranscript { side: Speaker, text: String },
    /// A side released the capture control; the exchange pipeline ran.
    CaptureEnded { side: Speaker },
    /// A capture was cancelled without producing a message.
    CaptureCancelled { side: Speaker },
    /// A completed exchange was appended to history.
    MessageAppended { message_id: Uuid },
    /// An existing message was retranslated in place.
    MessageUpdated { message_id: Uuid },
    /// The playback owner started playing this handle.
    PlaybackStarted { handle: Uuid },
    /// Playback of this handle ended. `completed` is false when it was
    /// interrupted by a newer playback, a new capture, or teardown.
    PlaybackFinished { handle: Uuid, completed: bool },
    /// The session language pair was swapped.
    LanguagesSwapped { pair: LanguagePair },
    /// The message history was cleared.
    HistoryCleared,
}
