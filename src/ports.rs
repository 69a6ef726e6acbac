//! Abstract contracts to the external speech services.
//!
//! The concrete providers (and their wire formats) live outside this crate;
//! the pipeline only depends on these request/response shapes and their
//! error variants.

use crate::error::{SynthesisError, TranscriptionError, TranslationError};
use crate::language::{Language, LanguagePair};
use crate::message::AudioHandle;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// One recorded utterance, drained from the device guard after the user
/// releases the capture control.
#[derive(Debug, Clone)]
pub struct CapturedUtterance {
    /// Mono f32 samples at `sample_rate`.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// When capture began.
    pub started_at: Instant,
}

impl CapturedUtterance {
    /// Duration of the recorded audio in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// The synthesis voice identity used for all outbound audio in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceId(String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Speech-to-text.
#[async_trait]
pub trait TranscriptionPort: Send + Sync {
    /// Transcribe one utterance. `language` is a hint, not a constraint.
    async fn transcribe(
        &self,
        utterance: &CapturedUtterance,
        language: Language,
    ) -> Result<String, TranscriptionError>;
}

/// Result of one translation request. Some providers bundle synthesized
/// audio with the translation; the pipeline treats it as optional and
/// falls back to [`SynthesisPort`] when absent.
#[derive(Debug, Clone)]
pub struct TranslationOutput {
    pub translated_text: String,
    pub audio: Option<AudioHandle>,
}

/// Text translation, optionally with bundled synthesis.
#[async_trait]
pub trait TranslationPort: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        pair: LanguagePair,
        voice: &VoiceId,
    ) -> Result<TranslationOutput, TranslationError>;
}

/// On-demand speech synthesis, used for replay-in-original-language and
/// for cache misses after rehydration.
#[async_trait]
pub trait SynthesisPort: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        language: Language,
        voice: &VoiceId,
    ) -> Result<AudioHandle, SynthesisError>;
}
