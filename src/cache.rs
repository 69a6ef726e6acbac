//! Per-message memoization of synthesized audio.
//!
//! Replay never re-synthesizes while a message still holds a handle for the
//! requested language slot. Slots are invalidated by `swap_languages` and
//! `retranslate`.

use crate::error::SynthesisError;
use crate::message::{AudioHandle, TranslationMessage};
use crate::ports::{SynthesisPort, VoiceId};
use std::sync::Arc;
use tracing::debug;

/// Which of a message's two audio slots to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSlot {
    /// `audio`: the translated text in the target language.
    Translated,
    /// `source_audio`: the original text in the source language.
    Source,
}

/// Memoizing front for the synthesis port.
pub struct UtteranceCache {
    synthesis: Arc<dyn SynthesisPort>,
}

impl UtteranceCache {
    pub fn new(synthesis: Arc<dyn SynthesisPort>) -> Self {
        Self { synthesis }
    }

    /// Return the stored handle for the slot, synthesizing and storing it
    /// on a miss.
    ///
    /// # Errors
    ///
    /// Returns the synthesis error on a miss that fails; the message is
    /// left unchanged.
    pub async fn ensure(
        &self,
        message: &mut TranslationMessage,
        slot: AudioSlot,
        voice: &VoiceId,
    ) -> Result<AudioHandle, SynthesisError> {
        let cached = match slot {
            AudioSlot::Translated => message.audio.as_ref(),
            AudioSlot::Source => message.source_audio.as_ref(),
        };
        if let Some(handle) = cached {
            debug!("reusing cached audio for message {} ({slot:?})", message.id);
            return Ok(handle.clone());
        }

        let (text, language) = match slot {
            AudioSlot::Translated => (&message.translated_text, message.target_language),
            AudioSlot::Source => (&message.source_text, message.source_language),
        };
        let handle = self.synthesis.synthesize(text, language, voice).await?;

        match slot {
            AudioSlot::Translated => message.audio = Some(handle.clone()),
            AudioSlot::Source => message.source_audio = Some(handle.clone()),
        }
        Ok(handle)
    }

    /// Drop both audio slots (language pairing changed under the message).
    pub fn invalidate(message: &mut TranslationMessage) {
        message.audio = None;
        message.source_audio = None;
    }
}
