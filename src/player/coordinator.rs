//! Playback state machine
//!
//! ```text
//! Idle -> Starting -> Playing -> Stopping -> Idle
//!            |                      ^
//!            +--- start failed -----+--> Idle (ERROR label for a while)
//! ```
//!
//! Everything here runs on the UI thread. Timers (fade-out completion, the
//! error label) are advanced by [`PlaybackCoordinator::tick`], which the app
//! calls every frame.

use std::sync::Arc;
use std::task::Poll;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::session::{MediaCommand, NowPlaying, SessionState, TrackMetadata};
use super::view::{AffordanceView, ButtonLabel, RingStyle};
use crate::audio::{generate_buffer, AudioError, DeviceHealth, FadeOut, NoiseBuffer, NoiseOutput, PlaybackHandle};
use crate::gesture::{Geometry, GestureEvent, GestureVolumeController, Point, Volume};

/// Public view of the coordinator state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Starting,
    Playing,
    Stopping,
}

impl PlaybackState {
    /// Media sessions only know playing and paused
    pub fn session_state(&self) -> SessionState {
        match self {
            PlaybackState::Playing => SessionState::Playing,
            _ => SessionState::Paused,
        }
    }
}

/// Whether a new noise buffer is generated for every start
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferPolicy {
    Regenerate,
    Cache,
}

/// Timing and tuning for the coordinator
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerConfig {
    pub buffer_secs: f64,
    pub buffer_policy: BufferPolicy,
    /// Fixed noise seed, mostly for reproducing recordings
    pub seed: Option<u64>,
    pub fade_in: Duration,
    pub fade_out: Duration,
    /// How long the ERROR label stays up after a failed start
    pub error_display: Duration,
    pub sensitivity: f32,
    pub band_width: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            buffer_secs: 2.0,
            buffer_policy: BufferPolicy::Regenerate,
            seed: None,
            fade_in: Duration::from_secs_f32(1.0),
            fade_out: Duration::from_secs_f32(0.5),
            error_display: Duration::from_secs_f32(2.0),
            sensitivity: crate::gesture::DEFAULT_SENSITIVITY,
            band_width: crate::gesture::DEFAULT_BAND_WIDTH,
        }
    }
}

enum Phase {
    Idle,
    Starting,
    Playing(PlaybackHandle),
    Stopping(FadeOut),
}

/// Owns playback state and sequences the synthesizer and the volume gesture
pub struct PlaybackCoordinator<O: NoiseOutput> {
    output: O,
    session: Box<dyn NowPlaying>,
    config: PlayerConfig,

    phase: Phase,
    volume: Volume,
    gesture: GestureVolumeController,

    rng: StdRng,
    cached_buffer: Option<Arc<NoiseBuffer>>,

    /// A start gesture that arrived while fading out
    start_queued: bool,
    /// A stalled stream was already restarted once this session
    resume_attempted: bool,
    foreground: bool,
    error_until: Option<Instant>,
    last_error: Option<AudioError>,

    view: AffordanceView,
}

impl<O: NoiseOutput> PlaybackCoordinator<O> {
    pub fn new(output: O, mut session: Box<dyn NowPlaying>, config: PlayerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        session.set_metadata(&TrackMetadata::default());

        Self {
            output,
            session,
            gesture: GestureVolumeController::new(config.sensitivity, config.band_width),
            config,
            phase: Phase::Idle,
            volume: Volume::default(),
            rng,
            cached_buffer: None,
            start_queued: false,
            resume_attempted: false,
            foreground: true,
            error_until: None,
            last_error: None,
            view: AffordanceView::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        match self.phase {
            Phase::Idle => PlaybackState::Idle,
            Phase::Starting => PlaybackState::Starting,
            Phase::Playing(_) => PlaybackState::Playing,
            Phase::Stopping(_) => PlaybackState::Stopping,
        }
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn view(&self) -> &AffordanceView {
        &self.view
    }

    /// Most recent playback failure, cleared by a successful start
    pub fn last_error(&self) -> Option<&AudioError> {
        self.last_error.as_ref()
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn is_start_queued(&self) -> bool {
        self.start_queued
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        let state = self.state();
        log::debug!("Playback state -> {:?}", state);
        self.session.playback_state_changed(state);
        self.refresh_view();
    }

    fn refresh_view(&mut self) {
        let state = self.state();
        self.view.label = if self.error_until.is_some() {
            ButtonLabel::Error
        } else if matches!(state, PlaybackState::Starting | PlaybackState::Playing) {
            ButtonLabel::Stop
        } else {
            ButtonLabel::Start
        };
        self.view.active = state == PlaybackState::Playing;
        self.view.adjusting = self.gesture.is_tracking();
        self.view.ring = RingStyle::from_volume(self.volume);
    }

    /// Start gesture
    ///
    /// Ignored while starting or playing. While a fade-out is pending the
    /// start is queued and runs once the fade has finished.
    pub fn start(&mut self, now: Instant) {
        match self.phase {
            Phase::Idle => self.begin_start(now),
            Phase::Stopping(_) => {
                if !self.start_queued {
                    log::info!("Start queued until the fade-out completes");
                }
                self.start_queued = true;
            }
            Phase::Starting | Phase::Playing(_) => {
                log::debug!("Start ignored, already {:?}", self.state());
            }
        }
    }

    /// Stop gesture
    pub fn stop(&mut self, now: Instant) {
        match self.phase {
            Phase::Playing(_) => self.begin_stop(now),
            Phase::Stopping(_) => {
                if self.start_queued {
                    log::info!("Queued start cancelled");
                }
                self.start_queued = false;
            }
            Phase::Idle | Phase::Starting => {}
        }
    }

    /// The play button was clicked
    pub fn toggle(&mut self, now: Instant) {
        match self.phase {
            Phase::Playing(_) => self.stop(now),
            _ => self.start(now),
        }
    }

    /// A control verb from the media session
    pub fn handle_media_command(&mut self, command: MediaCommand, now: Instant) {
        log::debug!("Media command: {:?}", command);
        match command {
            MediaCommand::Play => self.start(now),
            MediaCommand::Pause | MediaCommand::Stop => self.stop(now),
        }
    }

    fn begin_start(&mut self, now: Instant) {
        self.error_until = None;
        self.resume_attempted = false;
        self.set_phase(Phase::Starting);

        match self.launch(now) {
            Ok(handle) => {
                self.last_error = None;
                log::info!(
                    "Playing session {} ({:.1}s loop, gain {:.2})",
                    handle.id(),
                    handle.buffer().duration_secs(),
                    self.volume.get()
                );
                self.set_phase(Phase::Playing(handle));
            }
            Err(err) => {
                log::warn!("Playback failed to start: {}", err);
                self.last_error = Some(err);
                self.error_until = Some(now + self.config.error_display);
                self.set_phase(Phase::Idle);
            }
        }
    }

    fn launch(&mut self, now: Instant) -> Result<PlaybackHandle, AudioError> {
        let sample_rate = self.output.sample_rate()?;
        let buffer = self.buffer_for(sample_rate)?;
        self.output
            .start_loop(buffer, self.volume.get(), self.config.fade_in, now)
    }

    fn buffer_for(&mut self, sample_rate: u32) -> Result<Arc<NoiseBuffer>, AudioError> {
        if self.config.buffer_policy == BufferPolicy::Cache {
            if let Some(cached) = self.cached_buffer.as_ref().filter(|b| b.sample_rate() == sample_rate) {
                return Ok(Arc::clone(cached));
            }
        }

        let buffer = Arc::new(generate_buffer(sample_rate, self.config.buffer_secs, &mut self.rng)?);
        if self.config.buffer_policy == BufferPolicy::Cache {
            self.cached_buffer = Some(Arc::clone(&buffer));
        }
        Ok(buffer)
    }

    fn begin_stop(&mut self, now: Instant) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Playing(handle) => {
                log::info!(
                    "Stopping session {} after {:.1}s",
                    handle.id(),
                    now.saturating_duration_since(handle.started_at()).as_secs_f32()
                );
                self.gesture.reset();
                let fade = self.output.stop_loop(handle, self.config.fade_out, now);
                self.set_phase(Phase::Stopping(fade));
            }
            other => self.phase = other,
        }
    }

    /// The output went away while playing: skip the fade and go idle quietly
    fn device_lost(&mut self, now: Instant) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Playing(handle) => {
                log::warn!("Audio device lost during playback, stopping");
                self.gesture.reset();
                self.start_queued = false;
                self.last_error = Some(AudioError::DeviceLost);
                let fade = self.output.stop_loop(handle, Duration::ZERO, now);
                self.set_phase(Phase::Stopping(fade));
                self.poll_fade(now);
            }
            other => self.phase = other,
        }
    }

    /// Go idle once the pending fade-out resolves, then run a queued start
    fn poll_fade(&mut self, now: Instant) {
        let Phase::Stopping(fade) = &mut self.phase else {
            return;
        };
        if let Poll::Ready(()) = fade.poll(now) {
            self.set_phase(Phase::Idle);
            if std::mem::take(&mut self.start_queued) {
                self.begin_start(now);
            }
        }
    }

    /// React to the output's health while playing
    ///
    /// A stalled stream gets one restart. If it is still stalled afterwards,
    /// or the restart fails, playback is treated as lost.
    fn reconcile_health(&mut self, now: Instant) {
        let Phase::Playing(handle) = &self.phase else {
            return;
        };

        let result = match self.output.health(handle, now) {
            DeviceHealth::Running => {
                self.resume_attempted = false;
                Ok(())
            }
            DeviceHealth::Suspended if self.resume_attempted => Err(AudioError::DeviceLost),
            DeviceHealth::Suspended => {
                log::info!("Output stalled, resuming");
                self.resume_attempted = true;
                self.output.resume(handle)
            }
            DeviceHealth::Lost => Err(AudioError::DeviceLost),
        };

        if let Err(err) = result {
            log::warn!("Output did not recover: {}", err);
            self.device_lost(now);
        }
    }

    /// Advance timers: fade completion, queued start, error label, device loss
    ///
    /// Stalls are only acted on in the foreground; the platform may pause
    /// audio of a backgrounded app.
    pub fn tick(&mut self, now: Instant) {
        self.poll_fade(now);

        if self.foreground {
            self.reconcile_health(now);
        } else if let Phase::Playing(handle) = &self.phase {
            if self.output.health(handle, now) == DeviceHealth::Lost {
                self.device_lost(now);
            }
        }

        if self.error_until.is_some_and(|until| now >= until) {
            self.error_until = None;
            self.refresh_view();
        }
    }

    /// Foreground/background transition
    ///
    /// Coming back to the foreground while playing checks that audio is still
    /// flowing and restarts the stream if the platform paused it.
    pub fn visibility_changed(&mut self, visible: bool, now: Instant) {
        self.foreground = visible;
        if !visible {
            log::debug!("Moved to background");
            return;
        }

        self.resume_attempted = false;
        self.reconcile_health(now);
    }

    /// Pointer moved; returns true while a volume gesture is being tracked
    pub fn pointer_moved(&mut self, pointer: Point, geometry: Geometry) -> bool {
        if !matches!(self.phase, Phase::Playing(_)) {
            self.gesture.reset();
            self.view.adjusting = false;
            return false;
        }

        match self.gesture.on_move(pointer, geometry, self.volume) {
            Ok(GestureEvent::Adjusted(volume)) => self.apply_volume(volume),
            Ok(_) => {}
            Err(err) => log::debug!("Gesture event dropped: {}", err),
        }

        self.view.adjusting = self.gesture.is_tracking();
        self.view.adjusting
    }

    /// Pointer lifted, cancelled or left the window
    pub fn pointer_ended(&mut self) {
        self.gesture.on_end();
        self.view.adjusting = false;
    }

    fn apply_volume(&mut self, volume: Volume) {
        if volume == self.volume {
            return;
        }
        self.volume = volume;
        if let Phase::Playing(handle) = &self.phase {
            self.output.set_gain(handle, volume.get());
        }
        self.view.ring = RingStyle::from_volume(volume);
    }
}
