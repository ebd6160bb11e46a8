//! Playback primitives shared by every output backend
//!
//! The coordinator only talks to audio through the [`NoiseOutput`] trait,
//! which keeps it testable without a sound card. [`PlaybackShared`] is the
//! lock-free control block between the UI thread and the render callback.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::noise::NoiseBuffer;

/// Errors raised by synthesis and playback
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    #[error("Audio output unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Audio output was lost during playback")]
    DeviceLost,

    #[error("Cannot generate noise buffer: {0}")]
    InvalidBuffer(String),
}

/// State of the stream behind a playback handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceHealth {
    /// Render callback is producing audio
    Running,
    /// Stream exists but the callback has stopped advancing
    Suspended,
    /// The device went away
    Lost,
}

/// Control block shared between the UI thread and the render callback
///
/// The UI thread writes a target and a ramp length, then bumps `generation`.
/// The callback notices the new generation and starts a ramp toward it.
#[derive(Debug, Default)]
pub struct PlaybackShared {
    target_gain_bits: AtomicU32,
    ramp_frames: AtomicU32,
    generation: AtomicU32,
    fading_out: AtomicBool,
    lost: AtomicBool,
    frames_rendered: AtomicU64,
}

/// A gain command picked up by the render callback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainCommand {
    pub generation: u32,
    pub target: f32,
    pub frames: u32,
    pub fade_out: bool,
}

impl PlaybackShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a ramp toward `target` over at least `frames` frames
    pub fn request_gain(&self, target: f32, frames: u32) {
        let target = if target.is_finite() { target.clamp(0.0, 1.0) } else { 0.0 };
        self.target_gain_bits.store(target.to_bits(), Ordering::Relaxed);
        self.ramp_frames.store(frames, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Ramp to silence over exactly `frames` frames; later gain requests are ignored
    pub fn begin_fade_out(&self, frames: u32) {
        self.fading_out.store(true, Ordering::Relaxed);
        self.request_gain(0.0, frames);
    }

    /// Latest command if its generation differs from `seen`
    pub fn poll_command(&self, seen: u32) -> Option<GainCommand> {
        let generation = self.generation.load(Ordering::Acquire);
        if generation == seen {
            return None;
        }
        Some(GainCommand {
            generation,
            target: f32::from_bits(self.target_gain_bits.load(Ordering::Relaxed)),
            frames: self.ramp_frames.load(Ordering::Relaxed),
            fade_out: self.fading_out.load(Ordering::Relaxed),
        })
    }

    pub fn is_fading_out(&self) -> bool {
        self.fading_out.load(Ordering::Relaxed)
    }

    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::Relaxed);
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Relaxed)
    }

    pub fn add_rendered(&self, frames: u64) {
        self.frames_rendered.fetch_add(frames, Ordering::Relaxed);
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }
}

/// One start-to-stop playback session, always looping its buffer
///
/// Created by [`NoiseOutput::start_loop`] and consumed by
/// [`NoiseOutput::stop_loop`], so a handle can never be adjusted once its
/// fade-out has begun.
#[derive(Debug)]
pub struct PlaybackHandle {
    id: u64,
    buffer: Arc<NoiseBuffer>,
    started_at: Instant,
    shared: Arc<PlaybackShared>,
}

impl PlaybackHandle {
    pub fn new(id: u64, buffer: Arc<NoiseBuffer>, started_at: Instant, shared: Arc<PlaybackShared>) -> Self {
        Self {
            id,
            buffer,
            started_at,
            shared,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn buffer(&self) -> &Arc<NoiseBuffer> {
        &self.buffer
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn shared(&self) -> &Arc<PlaybackShared> {
        &self.shared
    }
}

/// A pending fade-out
///
/// Timer plus completion signal: pending until the fade deadline, then the
/// held output resources are dropped and the fade resolves. It resolves early
/// only if the device was lost. There is no way to cancel it.
pub struct FadeOut {
    deadline: Instant,
    shared: Arc<PlaybackShared>,
    resources: Option<Box<dyn Any>>,
    done: bool,
}

impl FadeOut {
    /// `resources` are kept alive until the fade resolves (e.g. the output stream)
    pub fn new(deadline: Instant, shared: Arc<PlaybackShared>, resources: Option<Box<dyn Any>>) -> Self {
        Self {
            deadline,
            shared,
            resources,
            done: false,
        }
    }

    /// Check for completion at `now`, releasing resources when complete
    pub fn poll(&mut self, now: Instant) -> Poll<()> {
        if self.done {
            return Poll::Ready(());
        }
        if now >= self.deadline || self.shared.is_lost() {
            self.resources.take();
            self.done = true;
            log::debug!("Fade-out complete, output released");
            return Poll::Ready(());
        }
        Poll::Pending
    }
}

impl std::fmt::Debug for FadeOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadeOut")
            .field("deadline", &self.deadline)
            .field("holding_resources", &self.resources.is_some())
            .field("done", &self.done)
            .finish()
    }
}

/// Looped noise playback with click-free gain changes
pub trait NoiseOutput {
    /// Sample rate of the output device, so buffers can be generated to match
    fn sample_rate(&mut self) -> Result<u32, AudioError>;

    /// Begin looping `buffer`, ramping from silence to `target_gain` over `fade_in`
    ///
    /// Calling this while another loop is active is not supported.
    fn start_loop(
        &mut self,
        buffer: Arc<NoiseBuffer>,
        target_gain: f32,
        fade_in: Duration,
        now: Instant,
    ) -> Result<PlaybackHandle, AudioError>;

    /// Move toward `value` with a short declick ramp
    fn set_gain(&mut self, handle: &PlaybackHandle, value: f32);

    /// Fade to silence over `fade_out`, then release the output
    fn stop_loop(&mut self, handle: PlaybackHandle, fade_out: Duration, now: Instant) -> FadeOut;

    fn health(&mut self, handle: &PlaybackHandle, now: Instant) -> DeviceHealth;

    /// Restart a suspended stream
    fn resume(&mut self, handle: &PlaybackHandle) -> Result<(), AudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_are_seen_once() {
        let shared = PlaybackShared::new();
        assert!(shared.poll_command(0).is_none());

        shared.request_gain(0.4, 960);
        let cmd = shared.poll_command(0).unwrap();
        assert_eq!(cmd.target, 0.4);
        assert_eq!(cmd.frames, 960);
        assert!(!cmd.fade_out);
        assert!(shared.poll_command(cmd.generation).is_none());
    }

    #[test]
    fn test_gain_requests_are_clamped() {
        let shared = PlaybackShared::new();
        shared.request_gain(3.0, 1);
        assert_eq!(shared.poll_command(0).unwrap().target, 1.0);
        shared.request_gain(f32::NAN, 1);
        assert_eq!(shared.poll_command(0).unwrap().target, 0.0);
    }

    #[test]
    fn test_fade_out_resolves_at_deadline() {
        let now = Instant::now();
        let shared = Arc::new(PlaybackShared::new());
        let released = Arc::new(AtomicBool::new(false));

        struct Guard(Arc<AtomicBool>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.store(true, Ordering::Relaxed);
            }
        }

        let mut fade = FadeOut::new(
            now + Duration::from_millis(500),
            Arc::clone(&shared),
            Some(Box::new(Guard(Arc::clone(&released)))),
        );

        assert!(fade.poll(now + Duration::from_millis(499)).is_pending());
        assert!(!released.load(Ordering::Relaxed));

        assert!(fade.poll(now + Duration::from_millis(500)).is_ready());
        assert!(released.load(Ordering::Relaxed));
        assert!(fade.poll(now).is_ready());
    }

    #[test]
    fn test_fade_out_resolves_early_when_lost() {
        let now = Instant::now();
        let shared = Arc::new(PlaybackShared::new());
        let mut fade = FadeOut::new(now + Duration::from_secs(5), Arc::clone(&shared), None);
        assert!(fade.poll(now).is_pending());
        shared.mark_lost();
        assert!(fade.poll(now).is_ready());
    }
}
