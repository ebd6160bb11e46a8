//! Audio engine - handles cpal audio output
//!
//! Implements [`NoiseOutput`] on the default output device. Each playback
//! session gets its own stream; the stream moves into the [`FadeOut`] on stop
//! and is dropped once the fade has finished.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};

use super::noise::NoiseBuffer;
use super::output::{AudioError, DeviceHealth, FadeOut, NoiseOutput, PlaybackHandle, PlaybackShared};
use super::ramp::seconds_to_frames;
use super::voice::LoopVoice;

/// Length of the ramp applied to every volume change
const DECLICK_SECONDS: f32 = 0.02;

/// A stream that has not advanced for this long counts as suspended
const STALL_THRESHOLD: Duration = Duration::from_millis(500);

/// The stream currently playing, plus its heartbeat bookkeeping
struct ActiveStream {
    id: u64,
    stream: cpal::Stream,
    last_frames: u64,
    last_progress: Instant,
}

/// High-level audio output engine
///
/// Manages the cpal stream for the current playback session.
pub struct NoiseEngine {
    active: Option<ActiveStream>,

    /// Sample rate of the output device
    sample_rate: u32,

    next_id: u64,

    /// Status message
    pub status: String,
}

impl Default for NoiseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseEngine {
    pub fn new() -> Self {
        Self {
            active: None,
            sample_rate: 48000,
            next_id: 1,
            status: "Ready".to_string(),
        }
    }

    fn default_device() -> Result<(cpal::Device, cpal::SupportedStreamConfig), AudioError> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or_else(|| {
            log::error!("No output device found");
            AudioError::DeviceUnavailable("no output device found".to_string())
        })?;

        let config = device.default_output_config().map_err(|e| {
            log::error!("Failed to get default output config: {}", e);
            AudioError::DeviceUnavailable(format!("error getting config: {}", e))
        })?;

        Ok((device, config))
    }

    fn fail(&mut self, err: AudioError) -> AudioError {
        self.status = format!("Error: {}", err);
        err
    }
}

/// Build an output stream for one sample format
fn build_stream<T: SizedSample + FromSample<f32>>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut voice: LoopVoice,
    shared: Arc<PlaybackShared>,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    let channels = config.channels as usize;
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            voice.render(data, channels);
        },
        move |err| {
            log::error!("Audio stream error: {}", err);
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                shared.mark_lost();
            }
        },
        None,
    )
}

impl NoiseOutput for NoiseEngine {
    fn sample_rate(&mut self) -> Result<u32, AudioError> {
        let (_, config) = Self::default_device().map_err(|e| self.fail(e))?;
        self.sample_rate = config.sample_rate().0;
        Ok(self.sample_rate)
    }

    fn start_loop(
        &mut self,
        buffer: Arc<NoiseBuffer>,
        target_gain: f32,
        fade_in: Duration,
        now: Instant,
    ) -> Result<PlaybackHandle, AudioError> {
        log::info!("Starting audio engine...");

        let (device, config) = Self::default_device().map_err(|e| self.fail(e))?;

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        log::info!("Using output device: {}", device_name);
        log::info!("Audio config: {:?}", config);

        self.sample_rate = config.sample_rate().0;
        if buffer.sample_rate() != self.sample_rate {
            log::warn!(
                "Noise buffer is {}Hz but the device runs at {}Hz, playback will be resampled",
                buffer.sample_rate(),
                self.sample_rate
            );
        }

        let shared = Arc::new(PlaybackShared::new());
        shared.request_gain(target_gain, seconds_to_frames(fade_in.as_secs_f32(), self.sample_rate));
        let voice = LoopVoice::new(Arc::clone(&buffer), Arc::clone(&shared));

        let sample_format = config.sample_format();
        log::info!("Sample format: {:?}", sample_format);
        let stream_config: cpal::StreamConfig = config.into();

        let stream_result = match sample_format {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, voice, Arc::clone(&shared))
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, voice, Arc::clone(&shared))
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, voice, Arc::clone(&shared))
            }
            format => {
                log::error!("Unsupported sample format: {:?}", format);
                return Err(self.fail(AudioError::DeviceUnavailable(format!(
                    "unsupported sample format: {:?}",
                    format
                ))));
            }
        };

        let stream = stream_result.map_err(|e| {
            log::error!("Failed to build stream: {}", e);
            self.fail(AudioError::DeviceUnavailable(format!("error building stream: {}", e)))
        })?;

        stream.play().map_err(|e| {
            log::error!("Failed to start stream: {}", e);
            self.fail(AudioError::DeviceUnavailable(format!("error starting stream: {}", e)))
        })?;

        let id = self.next_id;
        self.next_id += 1;
        self.active = Some(ActiveStream {
            id,
            stream,
            last_frames: 0,
            last_progress: now,
        });
        self.status = format!("Playing on {} at {}Hz", device_name, self.sample_rate);
        log::info!("Audio started successfully");

        Ok(PlaybackHandle::new(id, buffer, now, shared))
    }

    fn set_gain(&mut self, handle: &PlaybackHandle, value: f32) {
        if handle.shared().is_fading_out() {
            log::debug!("Ignoring gain change on session {} while fading out", handle.id());
            return;
        }
        handle
            .shared()
            .request_gain(value, seconds_to_frames(DECLICK_SECONDS, self.sample_rate));
    }

    fn stop_loop(&mut self, handle: PlaybackHandle, fade_out: Duration, now: Instant) -> FadeOut {
        let shared = Arc::clone(handle.shared());
        shared.begin_fade_out(seconds_to_frames(fade_out.as_secs_f32(), self.sample_rate));

        let stream = match self.active.take() {
            Some(active) if active.id == handle.id() => Some(active.stream),
            other => {
                self.active = other;
                None
            }
        };

        self.status = "Stopped".to_string();
        log::info!("Audio stopping, {:.2}s fade-out", fade_out.as_secs_f32());

        FadeOut::new(
            now + fade_out,
            shared,
            stream.map(|s| Box::new(s) as Box<dyn std::any::Any>),
        )
    }

    fn health(&mut self, handle: &PlaybackHandle, now: Instant) -> DeviceHealth {
        if handle.shared().is_lost() {
            return DeviceHealth::Lost;
        }
        let Some(active) = self.active.as_mut().filter(|a| a.id == handle.id()) else {
            return DeviceHealth::Lost;
        };

        let frames = handle.shared().frames_rendered();
        if frames != active.last_frames {
            active.last_frames = frames;
            active.last_progress = now;
            return DeviceHealth::Running;
        }

        if now.duration_since(active.last_progress) >= STALL_THRESHOLD {
            DeviceHealth::Suspended
        } else {
            DeviceHealth::Running
        }
    }

    fn resume(&mut self, handle: &PlaybackHandle) -> Result<(), AudioError> {
        let Some(active) = self.active.as_mut().filter(|a| a.id == handle.id()) else {
            return Err(AudioError::DeviceLost);
        };
        active.stream.play().map_err(|e| {
            log::warn!("Failed to resume stream: {}", e);
            AudioError::DeviceUnavailable(format!("error resuming stream: {}", e))
        })?;
        // Give the callback a full stall window to show progress again
        active.last_progress = Instant::now();
        log::info!("Audio stream resumed");
        Ok(())
    }
}
