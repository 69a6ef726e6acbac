//! Exclusive, scoped ownership of the microphone.
//!
//! One [`CaptureClaim`] may be outstanding at a time; both exit paths
//! (`drain` on success, `release` on cancel) consume the claim, so the
//! device is released exactly once no matter how the exchange ends.

use crate::error::DeviceError;
use crate::ports::CapturedUtterance;
use async_trait::async_trait;
use std::time::Instant;
use tracing::debug;

/// The start/stop audio-capture primitive the environment provides.
///
/// Implementations own the OS-level input claim between `start` and
/// `stop`/`discard`.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Begin recording into an internal buffer.
    async fn start(&self) -> Result<(), DeviceError>;

    /// Stop recording and hand back everything captured since `start`.
    async fn stop(&self) -> Result<CapturedUtterance, DeviceError>;

    /// Stop recording and throw the buffer away.
    fn discard(&self);
}

/// Proof of an acquired microphone claim. Not cloneable; consumed exactly
/// once by [`AudioDeviceGuard::drain`] or [`AudioDeviceGuard::release`].
#[derive(Debug)]
pub struct CaptureClaim {
    acquired_at: Instant,
}

impl CaptureClaim {
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }
}

/// Scoped-acquisition guard over the capture device.
pub struct AudioDeviceGuard {
    device: std::sync::Arc<dyn CaptureDevice>,
    claimed: bool,
}

impl AudioDeviceGuard {
    pub fn new(device: std::sync::Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            claimed: false,
        }
    }

    /// Claim the microphone and start recording.
    ///
    /// # Errors
    ///
    /// `DeviceError::Busy` if a claim is already outstanding; otherwise
    /// whatever the device reports (`NotFound`, `PermissionDenied`, ...).
    pub async fn acquire(&mut self) -> Result<CaptureClaim, DeviceError> {
        if self.claimed {
            return Err(DeviceError::Busy);
        }
        self.device.start().await?;
        self.claimed = true;
        debug!("microphone claim acquired");
        Ok(CaptureClaim {
            acquired_at: Instant::now(),
        })
    }

    /// Stop recording and return the captured utterance, releasing the
    /// claim.
    pub async fn drain(&mut self, claim: CaptureClaim) -> Result<CapturedUtterance, DeviceError> {
        drop(claim);
        self.claimed = false;
        let utterance = self.device.stop().await?;
        debug!(
            "microphone claim drained: {}ms of audio",
            utterance.duration_ms()
        );
        Ok(utterance)
    }

    /// Release the claim and discard whatever was recorded.
    pub fn release(&mut self, claim: CaptureClaim) {
        drop(claim);
        self.claimed = false;
        self.device.discard();
        debug!("microphone claim released, capture discarded");
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }
}
