//! Single-owner audio playback.
//!
//! [`AudioPlaybackOwner`] guarantees at most one sound plays at a time:
//! every `play` cancels the current playback first, and `stop` is
//! idempotent. Completion is observed as a [`SessionEvent::PlaybackFinished`]
//! broadcast; the finishing task clears the owner slot only when its handle
//! is still the current one, since the owner may have moved on to a newer
//! playback by then.

use crate::error::{Result, TranslateError};
use crate::events::SessionEvent;
use crate::message::AudioHandle;
use async_trait::async_trait;
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The audio-playback primitive the environment provides.
///
/// `play` resolves when the handle finished or the token was cancelled.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(&self, handle: AudioHandle, cancel: CancellationToken) -> Result<()>;
}

struct ActivePlayback {
    handle: Uuid,
    cancel: CancellationToken,
}

/// Exclusive owner of outbound audio.
pub struct AudioPlaybackOwner {
    sink: Arc<dyn PlaybackSink>,
    current: Arc<Mutex<Option<ActivePlayback>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl AudioPlaybackOwner {
    pub fn new(sink: Arc<dyn PlaybackSink>, events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            sink,
            current: Arc::new(Mutex::new(None)),
            events,
        }
    }

    /// Start playing a handle, interrupting any current playback.
    ///
    /// Returns the handle's id; completion arrives later as
    /// `PlaybackFinished { handle, completed }`.
    pub fn play(&self, handle: AudioHandle) -> Uuid {
        self.stop();

        let id = handle.id();
        let cancel = CancellationToken::new();
        *lock(&self.current) = Some(ActivePlayback {
            handle: id,
            cancel: cancel.clone(),
        });
        let _ = self.events.send(SessionEvent::PlaybackStarted { handle: id });

        let sink = Arc::clone(&self.sink);
        let current = Arc::clone(&self.current);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = sink.play(handle, cancel.clone()).await;
            let completed = result.is_ok() && !cancel.is_cancelled();
            if let Err(e) = result {
                // The message stays replayable; only the playback attempt
                // failed.
                warn!("playback failed: {e}");
            }

            let mut slot = lock(&current);
            if slot.as_ref().is_some_and(|active| active.handle == id) {
                *slot = None;
            }
            drop(slot);
            let _ = events.send(SessionEvent::PlaybackFinished {
                handle: id,
                completed,
            });
        });

        id
    }

    /// Stop any current playback. Idempotent; a no-op when nothing plays.
    pub fn stop(&self) {
        if let Some(active) = lock(&self.current).take() {
            active.cancel.cancel();
        }
    }

    /// The handle currently playing, if any.
    pub fn current(&self) -> Option<Uuid> {
        lock(&self.current).as_ref().map(|active| active.handle)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Speaker playback through cpal.
pub struct CpalPlaybackSink {
    device: cpal::Device,
}

impl CpalPlaybackSink {
    /// Create a playback sink on the configured (or default) output device.
    ///
    /// # Errors
    ///
    /// Returns an error if no output device is available.
    pub fn new(output_device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = output_device {
            host.output_devices()
                .map_err(|e| TranslateError::Playback(format!("cannot enumerate devices: {e}")))?
                .find(|d| {
                    d.description()
                        .ok()
                        .map(|desc| desc.name() == name)
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    TranslateError::Playback(format!("output device '{name}' not found"))
                })?
        } else {
            host.default_output_device()
                .ok_or_else(|| TranslateError::Playback("no default output device".into()))?
        };

        let device_name = device
            .description()
            .map(|d| d.name().to_owned())
            .unwrap_or_else(|_| "<unknown>".into());
        info!("using output device: {device_name}");

        Ok(Self { device })
    }

    /// List available output devices, for a device-picker surface.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_output_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| TranslateError::Playback(format!("cannot enumerate devices: {e}")))?;

        let mut names = Vec::new();
        for device in devices {
            if let Ok(desc) = device.description() {
                names.push(desc.name().to_owned());
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl PlaybackSink for CpalPlaybackSink {
    async fn play(&self, handle: AudioHandle, cancel: CancellationToken) -> Result<()> {
        let device = self.device.clone();
        tokio::task::spawn_blocking(move || blocking_play(&device, &handle, &cancel))
            .await
            .map_err(|e| TranslateError::Playback(format!("playback task failed: {e}")))?
    }
}

/// Feed the handle's samples to the output stream, polling for
/// cancellation between buffer refills.
fn blocking_play(
    device: &cpal::Device,
    handle: &AudioHandle,
    cancel: &CancellationToken,
) -> Result<()> {
    let stream_config = StreamConfig {
        channels: 1,
        sample_rate: handle.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let buffer = Arc::new(Mutex::new(PlaybackBuffer {
        samples: Arc::clone(handle.samples()),
        position: 0,
        finished: false,
    }));

    let callback_buffer = Arc::clone(&buffer);
    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut buf = lock(&callback_buffer);
                for sample in data.iter_mut() {
                    if buf.position < buf.samples.len() {
                        *sample = buf.samples[buf.position];
                        buf.position += 1;
                    } else {
                        *sample = 0.0;
                        buf.finished = true;
                    }
                }
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| TranslateError::Playback(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| TranslateError::Playback(format!("failed to start output stream: {e}")))?;

    loop {
        std::thread::sleep(Duration::from_millis(10));
        if cancel.is_cancelled() {
            break;
        }
        if lock(&buffer).finished {
            break;
        }
    }

    drop(stream);
    Ok(())
}

/// Tracks how far the output callback has consumed the handle's samples.
struct PlaybackBuffer {
    samples: Arc<[f32]>,
    position: usize,
    finished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that plays until cancelled, never finishing on its own.
    struct HangingSink;

    #[async_trait]
    impl PlaybackSink for HangingSink {
        async fn play(&self, _handle: AudioHandle, cancel: CancellationToken) -> Result<()> {
            cancel.cancelled().await;
            Ok(())
        }
    }

    /// Sink that finishes immediately.
    struct InstantSink;

    #[async_trait]
    impl PlaybackSink for InstantSink {
        async fn play(&self, _handle: AudioHandle, _cancel: CancellationToken) -> Result<()> {
            Ok(())
        }
    }

    fn handle() -> AudioHandle {
        AudioHandle::new(vec![0.0; 32], 24_000)
    }

    #[tokio::test]
    async fn new_play_replaces_current_handle() {
        let (events, mut rx) = broadcast::channel(16);
        let owner = AudioPlaybackOwner::new(Arc::new(HangingSink), events);

        let first = owner.play(handle());
        let second = owner.play(handle());
        assert_ne!(first, second);
        assert_eq!(owner.current(), Some(second));

        // The interrupted playback reports completed = false.
        let mut finished_first = None;
        for _ in 0..4 {
            match rx.recv().await.unwrap() {
                SessionEvent::PlaybackFinished { handle, completed } if handle == first => {
                    finished_first = Some(completed);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(finished_first, Some(false));
        assert_eq!(owner.current(), Some(second));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let (events, _rx) = broadcast::channel(16);
        let owner = AudioPlaybackOwner::new(Arc::new(HangingSink), events);

        owner.stop();
        let id = owner.play(handle());
        assert_eq!(owner.current(), Some(id));
        owner.stop();
        owner.stop();
        assert_eq!(owner.current(), None);
    }

    #[tokio::test]
    async fn natural_completion_clears_current_and_reports_completed() {
        let (events, mut rx) = broadcast::channel(16);
        let owner = AudioPlaybackOwner::new(Arc::new(InstantSink), events);

        let id = owner.play(handle());
        loop {
            match rx.recv().await.unwrap() {
                SessionEvent::PlaybackFinished { handle, completed } => {
                    assert_eq!(handle, id);
                    assert!(completed);
                    break;
                }
                _ => {}
            }
        }
        assert_eq!(owner.current(), None);
    }
}
