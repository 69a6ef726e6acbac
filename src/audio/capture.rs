//! Microphone capture adapter using cpal.
//!
//! Records at the device's native sample rate on a dedicated stream thread
//! and downsamples to the configured pipeline rate (default 16kHz mono) on
//! drain. cpal streams are not `Send`, so the stream lives on its own
//! thread for the whole claim and is dropped when the claim ends.

use crate::audio::device_guard::CaptureDevice;
use crate::config::AudioConfig;
use crate::error::DeviceError;
use crate::ports::CapturedUtterance;
use async_trait::async_trait;
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Microphone capture through the system's default audio host.
pub struct CpalCaptureDevice {
    config: AudioConfig,
    active: Mutex<Option<ActiveCapture>>,
}

struct ActiveCapture {
    buffer: Arc<Mutex<NativeRecording>>,
    cancel: CancellationToken,
    started_at: Instant,
}

impl CpalCaptureDevice {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            active: Mutex::new(None),
        }
    }

    /// List available input devices, for a device-picker surface.
    ///
    /// # Errors
    ///
    /// Returns an error if devices cannot be enumerated.
    pub fn list_input_devices() -> Result<Vec<String>, DeviceError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| DeviceError::Unknown(format!("cannot enumerate devices: {e}")))?;

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
impl CaptureDevice for CpalCaptureDevice {
    async fn start(&self) -> Result<(), DeviceError> {
        {
            let active = lock_recovering(&self.active);
            if active.is_some() {
                return Err(DeviceError::Busy);
            }
        }

        let buffer = Arc::new(Mutex::new(NativeRecording::default()));
        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread_buffer = Arc::clone(&buffer);
        let thread_cancel = cancel.clone();
        let input_device = self.config.input_device.clone();
        std::thread::spawn(move || {
            run_capture_thread(input_device, thread_buffer, thread_cancel, ready_tx);
        });

        ready_rx
            .await
            .map_err(|_| DeviceError::Unknown("capture thread exited before starting".into()))??;

        *lock_recovering(&self.active) = Some(ActiveCapture {
            buffer,
            cancel,
            started_at: Instant::now(),
        });
        Ok(())
    }

    async fn stop(&self) -> Result<CapturedUtterance, DeviceError> {
        let active = lock_recovering(&self.active)
            .take()
            .ok_or_else(|| DeviceError::Unknown("no capture in progress".into()))?;

        active.cancel.cancel();
        // Let the stream thread deliver its final callback before draining.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let native = std::mem::take(&mut *lock_recovering(&active.buffer));
        let target_rate = self.config.input_sample_rate;
        // The thread recorded mono at the native rate; resample to the
        // pipeline rate here, off the audio callback path.
        let samples = downsample(&native.samples, native.sample_rate, target_rate);

        Ok(CapturedUtterance {
            samples,
            sample_rate: target_rate,
            started_at: active.started_at,
        })
    }

    fn discard(&self) {
        if let Some(active) = lock_recovering(&self.active).take() {
            active.cancel.cancel();
        }
    }
}

/// Recorded audio plus the rate it was recorded at.
#[derive(Default)]
struct NativeRecording {
    samples: Vec<f32>,
    sample_rate: u32,
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Owns the cpal stream for the lifetime of one claim.
fn run_capture_thread(
    input_device: Option<String>,
    buffer: Arc<Mutex<NativeRecording>>,
    cancel: CancellationToken,
    ready_tx: oneshot::Sender<Result<(), DeviceError>>,
) {
    let stream = match build_input_stream(input_device, &buffer) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(DeviceError::Unknown(format!(
            "failed to start input stream: {e}"
        ))));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // CancellationToken has no blocking wait; poll at callback granularity.
    while !cancel.is_cancelled() {
        std::thread::sleep(Duration::from_millis(10));
    }

    drop(stream);
    info!("audio capture stopped");
}

fn build_input_stream(
    input_device: Option<String>,
    buffer: &Arc<Mutex<NativeRecording>>,
) -> Result<cpal::Stream, DeviceError> {
    let host = cpal::default_host();

    let device = if let Some(ref name) = input_device {
        host.input_devices()
            .map_err(|e| DeviceError::Unknown(format!("cannot enumerate devices: {e}")))?
            .find(|d| {
                d.description()
                    .ok()
                    .map(|desc| desc.name() == name)
                    .unwrap_or(false)
            })
            .ok_or(DeviceError::NotFound)?
    } else {
        host.default_input_device().ok_or(DeviceError::NotFound)?
    };

    let device_name = device
        .description()
        .map(|d| d.name().to_owned())
        .unwrap_or_else(|_| "<unknown>".into());
    info!("using input device: {device_name}");

    let default_config = device
        .default_input_config()
        .map_err(|e| map_device_error(&e.to_string()))?;

    let native_rate = default_config.sample_rate();
    let native_channels = default_config.channels();
    let stream_config = StreamConfig {
        channels: native_channels,
        sample_rate: native_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    {
        let mut rec = lock_recovering(buffer);
        rec.sample_rate = native_rate;
        rec.samples.clear();
    }

    let callback_buffer = Arc::clone(buffer);
    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                let mono = if native_channels > 1 {
                    to_mono(data, native_channels)
                } else {
                    data.to_vec()
                };
                lock_recovering(&callback_buffer).samples.extend(mono);
            },
            move |err| {
                error!("audio input stream error: {err}");
            },
            None,
        )
        .map_err(|e| map_device_error(&e.to_string()))?;

    info!("audio capture started: native {native_rate}Hz, {native_channels} channels");
    Ok(stream)
}

/// Best-effort mapping from cpal's stringly backend errors to the device
/// taxonomy.
fn map_device_error(detail: &str) -> DeviceError {
    let lower = detail.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("access denied") {
        DeviceError::PermissionDenied
    } else if lower.contains("in use") || lower.contains("busy") {
        DeviceError::Busy
    } else if lower.contains("no device") || lower.contains("not available") {
        DeviceError::NotFound
    } else {
        DeviceError::Unknown(detail.to_owned())
    }
}

/// Convert interleaved multi-channel audio to mono by averaging channels.
fn to_mono(data: &[f32], channels: u16) -> Vec<f32> {
    let ch = channels as usize;
    data.chunks_exact(ch)
        .map(|frame| frame.iter().sum::<f32>() / ch as f32)
        .collect()
}

/// Linear-interpolation downsampler. Speech content sits below 8kHz, so
/// this is adequate for the 48kHz → 16kHz path without an anti-alias
/// filter.
fn downsample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || src_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = src_rate as f64 / dst_rate as f64;
    let out_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 * ratio;
        let idx = src_pos as usize;
        let frac = src_pos - idx as f64;

        let sample = if idx + 1 < samples.len() {
            samples[idx] as f64 * (1.0 - frac) + samples[idx + 1] as f64 * frac
        } else {
            samples[idx.min(samples.len() - 1)] as f64
        };

        output.push(sample as f32);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_mono_averages_channels() {
        let stereo = [1.0, 0.0, 0.5, 0.5];
        assert_eq!(to_mono(&stereo, 2), vec![0.5, 0.5]);
    }

    #[test]
    fn downsample_halves_length_for_2x_ratio() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32).sin()).collect();
        let out = downsample(&samples, 32_000, 16_000);
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn downsample_is_identity_at_equal_rates() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(downsample(&samples, 16_000, 16_000), samples);
    }

    #[test]
    fn device_error_mapping() {
        assert_eq!(
            map_device_error("Permission denied by the OS"),
            DeviceError::PermissionDenied
        );
        assert_eq!(map_device_error("device is in use"), DeviceError::Busy);
        assert!(matches!(
            map_device_error("something odd"),
            DeviceError::Unknown(_)
        ));
    }
}
