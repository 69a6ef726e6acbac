//! Top-level state machine for the live translation session.
//!
//! Sequences a released capture into transcribe → translate → (optional)
//! synthesize → history append → playback, and enforces the global
//! invariants: at most one side capturing, at most one playing handle, and
//! a device claim scoped to exactly one capture.

use crate::audio::device_guard::{AudioDeviceGuard, CaptureDevice};
use crate::audio::playback::{AudioPlaybackOwner, PlaybackSink};
use crate::cache::{AudioSlot, UtteranceCache};
use crate::config::TranslateConfig;
use crate::error::{Result, TranscriptionError, TranslateError};
use crate::events::SessionEvent;
use crate::history::{HistoryBackend, MessageHistoryStore};
use crate::language::{Language, LanguagePair};
use crate::message::{Speaker, TranslationMessage};
use crate::ports::{
    CapturedUtterance, SynthesisPort, TranscriptionPort, TranslationPort, VoiceId,
};
use crate::session::side::{SideController, SideState};
use crate::session::ConversationSession;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

const EVENT_CHANNEL_SIZE: usize = 64;

/// The three external speech services an exchange runs through.
pub struct ServicePorts {
    pub transcription: Arc<dyn TranscriptionPort>,
    pub translation: Arc<dyn TranslationPort>,
    pub synthesis: Arc<dyn SynthesisPort>,
}

/// Coordinates the two side controllers, the device guard, the playback
/// owner, and the message history for one session.
pub struct ConversationOrchestrator {
    session: ConversationSession,
    local: SideController,
    remote: SideController,
    guard: AudioDeviceGuard,
    playback: AudioPlaybackOwner,
    history: MessageHistoryStore,
    cache: UtteranceCache,
    transcription: Arc<dyn TranscriptionPort>,
    translation: Arc<dyn TranslationPort>,
    events: broadcast::Sender<SessionEvent>,
    min_utterance_ms: u64,
}

impl ConversationOrchestrator {
    /// Build a session and rehydrate its history from the collaborator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured language pair is degenerate.
    pub async fn new(
        config: &TranslateConfig,
        ports: ServicePorts,
        device: Arc<dyn CaptureDevice>,
        sink: Arc<dyn PlaybackSink>,
        backend: Arc<dyn HistoryBackend>,
    ) -> Result<Self> {
        let pair = config.language_pair()?;
        let voice = VoiceId::new(config.session.voice_id.clone());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        let mut history = MessageHistoryStore::new(backend);
        history.hydrate().await;
        info!(
            "translation session created: {pair}, {} persisted messages",
            history.len()
        );

        Ok(Self {
            session: ConversationSession::new(pair, voice),
            local: SideController::new(Speaker::Local),
            remote: SideController::new(Speaker::Remote),
            guard: AudioDeviceGuard::new(device),
            playback: AudioPlaybackOwner::new(sink, events.clone()),
            history,
            cache: UtteranceCache::new(ports.synthesis),
            transcription: ports.transcription,
            translation: ports.translation,
            events,
            min_utterance_ms: config.session.min_utterance_ms,
        })
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Messages in completion order.
    pub fn history(&self) -> &[TranslationMessage] {
        self.history.list()
    }

    pub fn pair(&self) -> LanguagePair {
        self.session.pair()
    }

    pub fn side_state(&self, side: Speaker) -> SideState {
        self.controller(side).state()
    }

    /// Token cancelled when the session is torn down. External owners (the
    /// screen lifecycle) may also cancel it to abort in-flight work.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.session.cancellation_token()
    }

    /// Start capturing on one side.
    ///
    /// Unconditionally silences any ongoing playback: a user who starts
    /// speaking implicitly stops the translated audio.
    ///
    /// # Errors
    ///
    /// `SideBusy` if either side is already active (strictly turn-based,
    /// never queued); device errors leave the side idle with no retry.
    pub async fn begin_capture(&mut self, side: Speaker) -> Result<()> {
        self.ensure_open()?;
        if self.controller(side.opposite()).is_active() || self.controller(side).is_active() {
            return Err(TranslateError::SideBusy);
        }

        self.playback.stop();

        let (controller, guard) = self.capture_parts(side);
        controller.begin(guard).await?;
        let _ = self.events.send(SessionEvent::CaptureStarted { side });
        Ok(())
    }

    /// Finish a capture and run the exchange pipeline.
    ///
    /// Returns the id of the appended message. The side returns to idle on
    /// every path.
    ///
    /// # Errors
    ///
    /// `EmptyCapture` (non-fatal, no message), transcription/translation
    /// failures (no message), or `SessionClosed` when the session was torn
    /// down mid-pipeline. A synthesis failure is not an error here: the
    /// message is appended text-only.
    pub async fn end_capture(&mut self, side: Speaker) -> Result<Uuid> {
        self.ensure_open()?;
        if self.controller(side).state() != SideState::Capturing {
            return Err(TranslateError::NotCapturing);
        }

        let generation = self.session.generation();
        let (controller, guard) = self.capture_parts(side);
        let drained = controller.end(guard).await;

        let result = match drained {
            Ok(utterance) => self.run_exchange(side, utterance, generation).await,
            Err(e) => Err(e.into()),
        };

        self.controller_mut(side).finish();
        let _ = self.events.send(SessionEvent::CaptureEnded { side });
        result
    }

    /// Abort a capture in progress without producing a message.
    pub fn cancel_capture(&mut self, side: Speaker) {
        let (controller, guard) = self.capture_parts(side);
        if controller.is_active() {
            controller.cancel(guard);
            let _ = self.events.send(SessionEvent::CaptureCancelled { side });
        }
    }

    /// Record a streamed partial transcript for a capturing side.
    pub fn note_partial(&mut self, side: Speaker, text: String) {
        if self.controller_mut(side).note_partial(text.clone()) {
            let _ = self
                .events
                .send(SessionEvent::PartialTranscript { side, text });
        }
    }

    pub fn partial_transcript(&self, side: Speaker) -> Option<&str> {
        self.controller(side).partial_transcript()
    }

    /// Atomically exchange source and target languages.
    ///
    /// Any capture or translation in flight is cancelled against the old
    /// pair, playback stops, and cached audio whose pairing no longer
    /// matches the session is dropped; message text is preserved.
    pub async fn swap_languages(&mut self) -> Result<LanguagePair> {
        self.ensure_open()?;

        self.cancel_capture(Speaker::Local);
        self.cancel_capture(Speaker::Remote);
        self.playback.stop();

        let pair = self.session.swap_pair();
        for message in self.history.iter_mut() {
            if message.pair() != pair {
                UtteranceCache::invalidate(message);
            }
        }

        info!("languages swapped: {pair}");
        let _ = self.events.send(SessionEvent::LanguagesSwapped { pair });
        Ok(pair)
    }

    /// Re-translate one existing message against a new target language,
    /// replacing its translated text and audio in place. Source text and
    /// timestamp are unchanged.
    ///
    /// # Errors
    ///
    /// `UnknownMessage` if the id is not in history; `LanguagePair` if the
    /// new target equals the message's source language; translation
    /// failures leave the message untouched. A synthesis failure keeps the
    /// updated message text-only, as in the exchange pipeline.
    pub async fn retranslate(&mut self, id: Uuid, new_target: Language) -> Result<()> {
        self.ensure_open()?;

        let (source_text, source_language) = {
            let message = self
                .history
                .get(id)
                .ok_or(TranslateError::UnknownMessage(id))?;
            (message.source_text.clone(), message.source_language)
        };
        let pair = LanguagePair::new(source_language, new_target)?;

        let generation = self.session.generation();
        let cancel = self.session.cancellation_token();
        let voice = self.session.voice().clone();

        let translation = Arc::clone(&self.translation);
        let output = guarded(&cancel, async {
            translation.translate(&source_text, pair, &voice).await
        })
        .await??;
        if output.translated_text.trim().is_empty() {
            return Err(TranslateError::Translation(
                crate::error::TranslationError::ServiceUnavailable(
                    "empty translation result".into(),
                ),
            ));
        }

        self.guard_generation(generation)?;

        let message = self
            .history
            .get_mut(id)
            .ok_or(TranslateError::UnknownMessage(id))?;
        message.translated_text = output.translated_text;
        message.target_language = new_target;
        // Retranslation invalidates both cached audio slots.
        UtteranceCache::invalidate(message);
        message.audio = output.audio;

        // Same fallback as the exchange pipeline: the updated text stands
        // on its own if synthesis fails.
        if message.audio.is_none() {
            match guarded(&cancel, self.cache.ensure(message, AudioSlot::Translated, &voice))
                .await?
            {
                Ok(_) => {}
                Err(e) => warn!("synthesis failed, keeping retranslation text-only: {e}"),
            }
        }

        let _ = self.events.send(SessionEvent::MessageUpdated { message_id: id });
        Ok(())
    }

    /// Replay a message's translated audio.
    pub async fn play_message(&mut self, id: Uuid) -> Result<Uuid> {
        let language = self
            .history
            .get(id)
            .ok_or(TranslateError::UnknownMessage(id))?
            .target_language;
        self.play_in_language(id, language).await
    }

    /// Play a message in either of its two languages, synthesizing through
    /// the cache on a miss.
    ///
    /// # Errors
    ///
    /// `LanguageMismatch` when the language is neither side of the message
    /// pair; synthesis failures surface here (the explicit replay asked for
    /// audio).
    pub async fn play_in_language(&mut self, id: Uuid, language: Language) -> Result<Uuid> {
        self.ensure_open()?;

        let voice = self.session.voice().clone();
        let cancel = self.session.cancellation_token();
        let message = self
            .history
            .get_mut(id)
            .ok_or(TranslateError::UnknownMessage(id))?;

        let slot = if language == message.target_language {
            AudioSlot::Translated
        } else if language == message.source_language {
            AudioSlot::Source
        } else {
            return Err(TranslateError::LanguageMismatch(language));
        };

        let handle = guarded(&cancel, self.cache.ensure(message, slot, &voice)).await??;
        Ok(self.playback.play(handle))
    }

    /// Stop any current playback.
    pub fn stop_playback(&mut self) {
        self.playback.stop();
    }

    /// Empty local history and signal the persistence collaborator to do
    /// the same. Unconditional and irreversible at this boundary.
    pub async fn clear_history(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.playback.stop();
        self.history.clear().await;
        let _ = self.events.send(SessionEvent::HistoryCleared);
        Ok(())
    }

    /// Tear the session down: abort any capture, stop playback, and
    /// invalidate every in-flight result. Idempotent.
    pub fn teardown(&mut self) {
        if self.session.is_torn_down() {
            return;
        }
        self.cancel_capture(Speaker::Local);
        self.cancel_capture(Speaker::Remote);
        self.playback.stop();
        self.session.close();
        info!("translation session torn down");
    }

    // ─── exchange pipeline ───────────────────────────────────────────────

    async fn run_exchange(
        &mut self,
        side: Speaker,
        utterance: CapturedUtterance,
        generation: u64,
    ) -> Result<Uuid> {
        if utterance.samples.is_empty() || utterance.duration_ms() < self.min_utterance_ms {
            return Err(TranslateError::EmptyCapture);
        }

        let direction = self.session.direction_for(side);
        let voice = self.session.voice().clone();
        let cancel = self.session.cancellation_token();

        let transcription = Arc::clone(&self.transcription);
        let text = guarded(&cancel, async {
            transcription.transcribe(&utterance, direction.source()).await
        })
        .await?
        .map_err(|e| match e {
            TranscriptionError::Empty => TranslateError::EmptyCapture,
            other => TranslateError::Transcription(other),
        })?;

        let text = text.trim().to_owned();
        if text.is_empty() {
            return Err(TranslateError::EmptyCapture);
        }
        info!("{side} side transcribed: \"{text}\"");

        let translation = Arc::clone(&self.translation);
        let output = guarded(&cancel, async {
            translation.translate(&text, direction, &voice).await
        })
        .await??;
        if output.translated_text.trim().is_empty() {
            return Err(TranslateError::Translation(
                crate::error::TranslationError::ServiceUnavailable(
                    "empty translation result".into(),
                ),
            ));
        }

        self.guard_generation(generation)?;

        let mut message =
            TranslationMessage::new(text, output.translated_text, direction, side);
        message.audio = output.audio;

        // Translated text is useful without voice: a synthesis failure
        // still appends the message, text-only.
        if message.audio.is_none() {
            match guarded(&cancel, self.cache.ensure(&mut message, AudioSlot::Translated, &voice))
                .await?
            {
                Ok(_) => {}
                Err(e) => warn!("synthesis failed, appending text-only message: {e}"),
            }
        }

        self.guard_generation(generation)?;

        let id = message.id;
        let audio = message.audio.clone();
        self.history.append(message).await;
        let _ = self.events.send(SessionEvent::MessageAppended { message_id: id });

        if let Some(handle) = audio {
            self.playback.play(handle);
        }

        Ok(id)
    }

    // ─── helpers ─────────────────────────────────────────────────────────

    fn ensure_open(&self) -> Result<()> {
        if self.session.is_closed() {
            return Err(TranslateError::SessionClosed);
        }
        Ok(())
    }

    /// Discard a result that resolved against an older session generation
    /// (language swap or teardown happened while it was in flight).
    fn guard_generation(&self, generation: u64) -> Result<()> {
        if self.session.generation() != generation {
            return Err(TranslateError::SessionClosed);
        }
        Ok(())
    }

    fn controller(&self, side: Speaker) -> &SideController {
        match side {
            Speaker::Local => &self.local,
            Speaker::Remote => &self.remote,
        }
    }

    fn controller_mut(&mut self, side: Speaker) -> &mut SideController {
        match side {
            Speaker::Local => &mut self.local,
            Speaker::Remote => &mut self.remote,
        }
    }

    fn capture_parts(&mut self, side: Speaker) -> (&mut SideController, &mut AudioDeviceGuard) {
        match side {
            Speaker::Local => (&mut self.local, &mut self.guard),
            Speaker::Remote => (&mut self.remote, &mut self.guard),
        }
    }
}

/// Race a service call against session cancellation. Teardown mid-call
/// resolves to `SessionClosed` and the eventual response is dropped.
async fn guarded<T, E>(
    cancel: &CancellationToken,
    fut: impl Future<Output = std::result::Result<T, E>>,
) -> Result<std::result::Result<T, E>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TranslateError::SessionClosed),
        result = fut => Ok(result),
    }
}
