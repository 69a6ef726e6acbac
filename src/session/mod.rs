//! Live translation session state and orchestration.

pub mod orchestrator;
pub mod side;

pub use orchestrator::ConversationOrchestrator;
pub use side::{SideController, SideState};

use crate::language::LanguagePair;
use crate::message::Speaker;
use crate::ports::VoiceId;
use tokio_util::sync::CancellationToken;

/// Mutable state shared by the orchestrator and both side controllers.
///
/// One instance per active translation screen; torn down on navigation
/// away. The generation counter and cancellation token guard against a
/// late-arriving service response mutating a session that has moved on.
pub struct ConversationSession {
    pair: LanguagePair,
    voice: VoiceId,
    generation: u64,
    cancel: CancellationToken,
    torn_down: bool,
}

impl ConversationSession {
    pub fn new(pair: LanguagePair, voice: VoiceId) -> Self {
        Self {
            pair,
            voice,
            generation: 0,
            cancel: CancellationToken::new(),
            torn_down: false,
        }
    }

    pub fn pair(&self) -> LanguagePair {
        self.pair
    }

    pub fn voice(&self) -> &VoiceId {
        &self.voice
    }

    /// Capture direction for one side: the local party speaks source →
    /// target, the remote party target → source.
    pub fn direction_for(&self, speaker: Speaker) -> LanguagePair {
        match speaker {
            Speaker::Local => self.pair,
            Speaker::Remote => self.pair.swapped(),
        }
    }

    /// Swap the language pair. Bumps the generation so in-flight results
    /// against the old pair are discarded.
    pub fn swap_pair(&mut self) -> LanguagePair {
        self.pair = self.pair.swapped();
        self.generation += 1;
        self.pair
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token cancelled at teardown; every in-flight service call selects
    /// against it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Closed either by `close` or by an external owner cancelling the
    /// shared token. A closed session must never reclaim the microphone.
    pub fn is_closed(&self) -> bool {
        self.torn_down || self.cancel.is_cancelled()
    }

    /// Mark the session closed: cancel in-flight work and invalidate any
    /// result that resolves later.
    pub fn close(&mut self) {
        self.torn_down = true;
        self.generation += 1;
        self.cancel.cancel();
    }
}
