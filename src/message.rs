//! Translated messages and playable audio handles.

use crate::language::{Language, LanguagePair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Which conversational party spoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Local,
    Remote,
}

impl Speaker {
    pub fn opposite(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Remote => f.write_str("remote"),
        }
    }
}

/// A playable piece of synthesized audio.
///
/// Identity, not content, is what the playback owner tracks: two handles
/// compare equal iff they refer to the same synthesis result. Samples are
/// shared, so cloning is cheap.
#[derive(Clone)]
pub struct AudioHandle {
    id: Uuid,
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl AudioHandle {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            samples: samples.into(),
            sample_rate,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn samples(&self) -> &Arc<[f32]> {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl PartialEq for AudioHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AudioHandle {}

impl fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioHandle")
            .field("id", &self.id)
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// One completed exchange: the spoken text, its translation, and the two
/// lazily attached audio slots.
///
/// Immutable once appended to history, except that `audio`/`source_audio`
/// may be attached later (replay-time synthesis) and `retranslate` replaces
/// the translated side in place.
#[derive(Debug, Clone)]
pub struct TranslationMessage {
    pub id: Uuid,
    pub source_text: String,
    pub translated_text: String,
    pub source_language: Language,
    pub target_language: Language,
    pub speaker: Speaker,
    /// Synthesized translation audio. Absent if synthesis failed, was
    /// skipped, or the message was rehydrated from persistence.
    pub audio: Option<AudioHandle>,
    /// Original-language audio, generated on demand for replay.
    pub source_audio: Option<AudioHandle>,
    /// Capture-completion time; ordering and display grouping key.
    pub timestamp: DateTime<Utc>,
}

impl TranslationMessage {
    /// Create a finalized message. Both texts must be non-empty; the
    /// orchestrator enforces that before construction.
    pub fn new(
        source_text: String,
        translated_text: String,
        pair: LanguagePair,
        speaker: Speaker,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_text,
            translated_text,
            source_language: pair.source(),
            target_language: pair.target(),
            speaker,
            audio: None,
            source_audio: None,
            timestamp: Utc::now(),
        }
    }

    /// The language pair this message was translated under.
    pub fn pair(&self) -> LanguagePair {
        // source != target held at construction, so this cannot fail.
        LanguagePair::new(self.source_language, self.target_language)
            .unwrap_or_else(|_| unreachable!("message holds a degenerate language pair"))
    }
}

/// The record exchanged with the external history collaborator.
///
/// Audio handles are session-local and never persisted; a rehydrated
/// message re-synthesizes on replay through the utterance cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub source_text: String,
    pub translated_text: String,
    pub source_language: Language,
    pub target_language: Language,
    pub speaker: Speaker,
    pub timestamp: DateTime<Utc>,
}

impl From<&TranslationMessage> for StoredMessage {
    fn from(message: &TranslationMessage) -> Self {
        Self {
            id: message.id,
            source_text: message.source_text.clone(),
            translated_text: message.translated_text.clone(),
            source_language: message.source_language,
            target_language: message.target_language,
            speaker: message.speaker,
            timestamp: message.timestamp,
        }
    }
}

impl From<StoredMessage> for TranslationMessage {
    fn from(stored: StoredMessage) -> Self {
        Self {
            id: stored.id,
            source_text: stored.source_text,
            translated_text: stored.translated_text,
            source_language: stored.source_language,
            target_language: stored.target_language,
            speaker: stored.speaker,
            audio: None,
            source_audio: None,
            timestamp: stored.timestamp,
        }
    }
}
