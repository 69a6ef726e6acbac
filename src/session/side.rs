//! Per-side capture lifecycle.
//!
//! Each conversational party owns one controller. States:
//! `Idle → Capturing → Finalizing → Idle` on success,
//! `Idle → Capturing → Idle` on empty/aborted capture, and any non-idle
//! state `→ Idle` on forced cancellation. Mutual exclusion between the two
//! sides is the orchestrator's job, not the controller's.

use crate::audio::device_guard::{AudioDeviceGuard, CaptureClaim};
use crate::error::DeviceError;
use crate::message::Speaker;
use crate::ports::CapturedUtterance;
use tracing::info;

/// Capture lifecycle state of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideState {
    Idle,
    Capturing,
    Finalizing,
}

/// Owns one party's capture lifecycle and per-side transient state.
pub struct SideController {
    speaker: Speaker,
    state: SideState,
    claim: Option<CaptureClaim>,
    partial_transcript: Option<String>,
}

impl SideController {
    pub fn new(speaker: Speaker) -> Self {
        Self {
            speaker,
            state: SideState::Idle,
            claim: None,
            partial_transcript: None,
        }
    }

    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn state(&self) -> SideState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != SideState::Idle
    }

    /// Live partial transcript, when the transcription channel streams
    /// incremental results.
    pub fn partial_transcript(&self) -> Option<&str> {
        self.partial_transcript.as_deref()
    }

    /// Acquire the device and start capturing.
    ///
    /// # Errors
    ///
    /// Device errors leave the side `Idle`; capture did not start.
    pub async fn begin(&mut self, guard: &mut AudioDeviceGuard) -> Result<(), DeviceError> {
        debug_assert_eq!(self.state, SideState::Idle);
        let claim = guard.acquire().await?;
        self.claim = Some(claim);
        self.state = SideState::Capturing;
        info!("{} side capturing", self.speaker);
        Ok(())
    }

    /// Stop capturing and drain the recorded utterance.
    ///
    /// Transitions to `Finalizing`; the caller moves the side back to
    /// `Idle` via [`finish`](Self::finish) once the exchange resolves.
    ///
    /// # Errors
    ///
    /// If the drain fails the claim is already gone; the caller still
    /// calls `finish`.
    pub async fn end(
        &mut self,
        guard: &mut AudioDeviceGuard,
    ) -> Result<CapturedUtterance, DeviceError> {
        let claim = self
            .claim
            .take()
            .ok_or_else(|| DeviceError::Unknown("no capture claim held".into()))?;
        self.state = SideState::Finalizing;
        guard.drain(claim).await
    }

    /// Return to `Idle`, dropping the partial transcript. Called on every
    /// exit path of an exchange.
    pub fn finish(&mut self) {
        self.state = SideState::Idle;
        self.partial_transcript = None;
    }

    /// Force-release the device and discard everything captured so far.
    /// Callable from any state; a no-op when already `Idle`.
    pub fn cancel(&mut self, guard: &mut AudioDeviceGuard) {
        if let Some(claim) = self.claim.take() {
            guard.release(claim);
        }
        if self.is_active() {
            info!("{} side capture cancelled", self.speaker);
        }
        self.state = SideState::Idle;
        self.partial_transcript = None;
    }

    /// Record an incremental transcript update. Ignored unless capturing.
    pub fn note_partial(&mut self, text: String) -> bool {
        if self.state != SideState::Capturing {
            return false;
        }
        self.partial_transcript = Some(text);
        true
    }
}
