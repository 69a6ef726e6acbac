//! Ordered, append-only log of completed exchanges.
//!
//! The in-memory list is authoritative for the live session; a
//! [`HistoryBackend`] collaborator mirrors it best-effort. Persistence
//! failures are logged and never roll back a completed exchange.

use crate::error::Result;
use crate::message::{StoredMessage, TranslationMessage};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// External persistence collaborator for completed exchanges.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    async fn list(&self) -> Result<Vec<StoredMessage>>;
    async fn append(&self, message: &StoredMessage) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Backend that persists nothing. The default for sessions without an
/// external history service.
pub struct NullHistoryBackend;

#[async_trait]
impl HistoryBackend for NullHistoryBackend {
    async fn list(&self) -> Result<Vec<StoredMessage>> {
        Ok(Vec::new())
    }

    async fn append(&self, _message: &StoredMessage) -> Result<()> {
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory message log, mirrored best-effort to the backend.
///
/// Messages are appended in translation-completion order and never
/// reordered. Existing entries are only touched to attach lazily
/// synthesized audio or by an explicit retranslate.
pub struct MessageHistoryStore {
    messages: Vec<TranslationMessage>,
    backend: Arc<dyn HistoryBackend>,
}

impl MessageHistoryStore {
    pub fn new(backend: Arc<dyn HistoryBackend>) -> Self {
        Self {
            messages: Vec::new(),
            backend,
        }
    }

    /// Load persisted messages into the in-memory list.
    ///
    /// Rehydrated messages carry no audio handles; replay re-synthesizes
    /// through the utterance cache. A backend failure leaves the session
    /// with an empty history rather than blocking session creation.
    pub async fn hydrate(&mut self) {
        match self.backend.list().await {
            Ok(stored) => {
                self.messages = stored.into_iter().map(TranslationMessage::from).collect();
            }
            Err(e) => {
                warn!("history rehydration failed, starting empty: {e}");
                self.messages.clear();
            }
        }
    }

    /// Append a completed exchange and mirror it to the backend.
    pub async fn append(&mut self, message: TranslationMessage) {
        let stored = StoredMessage::from(&message);
        self.messages.push(message);
        if let Err(e) = self.backend.append(&stored).await {
            warn!("history persistence failed (keeping in-memory message): {e}");
        }
    }

    /// All messages, in completion order.
    pub fn list(&self) -> &[TranslationMessage] {
        &self.messages
    }

    pub fn get(&self, id: Uuid) -> Option<&TranslationMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut TranslationMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TranslationMessage> {
        self.messages.iter_mut()
    }

    /// Empty local state and signal the backend to do the same.
    /// Unconditional and irreversible at this boundary.
    pub async fn clear(&mut self) {
        self.messages.clear();
        if let Err(e) = self.backend.clear().await {
            warn!("history backend clear failed: {e}");
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;
    use crate::language::{Language, LanguagePair};
    use crate::message::Speaker;
    use std::sync::Mutex;

    struct RecordingBackend {
        appended: Mutex<Vec<StoredMessage>>,
        fail_append: bool,
    }

    impl RecordingBackend {
        fn new(fail_append: bool) -> Self {
            Self {
                appended: Mutex::new(Vec::new()),
                fail_append,
            }
        }
    }

    #[async_trait]
    impl HistoryBackend for RecordingBackend {
        async fn list(&self) -> Result<Vec<StoredMessage>> {
            Ok(self.appended.lock().unwrap().clone())
        }

        async fn append(&self, message: &StoredMessage) -> Result<()> {
            if self.fail_append {
                return Err(TranslateError::History("backend down".into()));
            }
            self.appended.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            self.appended.lock().unwrap().clear();
            Ok(())
        }
    }

    fn message(source: &str, translated: &str) -> TranslationMessage {
        TranslationMessage::new(
            source.into(),
            translated.into(),
            LanguagePair::new(Language::English, Language::Spanish).unwrap(),
            Speaker::Local,
        )
    }

    #[tokio::test]
    async fn append_preserves_order_and_mirrors_to_backend() {
        let backend = Arc::new(RecordingBackend::new(false));
        let mut store = MessageHistoryStore::new(backend.clone());

        store.append(message("one", "uno")).await;
        store.append(message("two", "dos")).await;

        let texts: Vec<_> = store.list().iter().map(|m| m.source_text.as_str()).collect();
        assert_eq!(texts, ["one", "two"]);
        assert_eq!(backend.appended.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn backend_failure_keeps_in_memory_message() {
        let mut store = MessageHistoryStore::new(Arc::new(RecordingBackend::new(true)));
        store.append(message("hello", "hola")).await;
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn hydrate_loads_backend_messages_without_audio() {
        let backend = Arc::new(RecordingBackend::new(false));
        {
            let mut seed = MessageHistoryStore::new(backend.clone());
            seed.append(message("hi", "hola")).await;
        }

        let mut store = MessageHistoryStore::new(backend);
        store.hydrate().await;
        assert_eq!(store.len(), 1);
        assert!(store.list()[0].audio.is_none());
    }

    #[tokio::test]
    async fn clear_empties_local_and_backend_state() {
        let backend = Arc::new(RecordingBackend::new(false));
        let mut store = MessageHistoryStore::new(backend.clone());
        store.append(message("hello", "hola")).await;

        store.clear().await;
        assert!(store.is_empty());
        assert!(backend.appended.lock().unwrap().is_empty());
    }
}
