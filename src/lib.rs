//! Duolog: bidirectional live speech-translation pipeline.
//!
//! Turns a held-button speech gesture from either of two conversational
//! parties into a transcribed, translated, and voice-synthesized message:
//! Microphone → STT → translation → TTS → Speaker
//!
//! # Architecture
//!
//! - **Device guard**: exclusive, scoped microphone ownership (`cpal`)
//! - **Side controllers**: one capture lifecycle per party, strictly
//!   turn-based
//! - **Service ports**: abstract transcription / translation / synthesis
//!   contracts; providers live outside the crate
//! - **Utterance cache**: per-message memoized synthesis for replay
//! - **Playback owner**: at most one sound at a time, forced interruption
//! - **History store**: append-only exchange log, mirrored best-effort to
//!   an external collaborator

pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod language;
pub mod message;
pub mod ports;
pub mod session;

pub use cache::{AudioSlot, UtteranceCache};
pub use config::{AudioConfig, SessionConfig, TranslateConfig};
pub use error::{
    DeviceError, Result, SynthesisError, TranscriptionError, TranslateError, TranslationError,
};
pub use events::SessionEvent;
pub use history::{HistoryBackend, MessageHistoryStore, NullHistoryBackend};
pub use language::{Language, LanguagePair};
pub use message::{AudioHandle, Speaker, StoredMessage, TranslationMessage};
pub use ports::{
    CapturedUtterance, SynthesisPort, TranscriptionPort, TranslationOutput, TranslationPort,
    VoiceId,
};
pub use session::orchestrator::{ConversationOrchestrator, ServicePorts};
pub use session::{SideController, SideState};
