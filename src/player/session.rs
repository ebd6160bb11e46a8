//! Now-playing integration
//!
//! Platforms that expose a media session (lock screen, media keys, tray
//! widgets) plug in through [`NowPlaying`]. Their control verbs come back in
//! as [`MediaCommand`]s and are handled exactly like the play button.

use std::path::PathBuf;

use super::coordinator::PlaybackState;

/// Control verbs a media session can send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaCommand {
    Play,
    Pause,
    Stop,
}

/// Coarse state reported to the media session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Playing,
    Paused,
}

/// Static metadata, published once
#[derive(Clone, Debug, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub artwork: Option<PathBuf>,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            title: "Brown Noise".to_string(),
            artist: "brown-rs".to_string(),
            artwork: None,
        }
    }
}

/// A platform now-playing surface
pub trait NowPlaying {
    fn set_metadata(&mut self, metadata: &TrackMetadata);

    /// Called on every coordinator state transition
    fn playback_state_changed(&mut self, state: PlaybackState);
}

/// Session used when the platform has nothing better: just logs
#[derive(Debug, Default)]
pub struct LogSession {
    last: Option<SessionState>,
}

impl NowPlaying for LogSession {
    fn set_metadata(&mut self, metadata: &TrackMetadata) {
        log::info!("Now playing: {} - {}", metadata.artist, metadata.title);
    }

    fn playback_state_changed(&mut self, state: PlaybackState) {
        let session_state = state.session_state();
        if self.last != Some(session_state) {
            log::info!("Session state: {:?}", session_state);
            self.last = Some(session_state);
        }
    }
}
