//! Player module - playback state and its collaborators
//!
//! This module provides:
//! - `PlaybackCoordinator`, the idle/starting/playing/stopping state machine
//! - The button view model the UI renders from
//! - Now-playing session integration

mod coordinator;
mod session;
mod view;

#[allow(unused_imports)]
pub use coordinator::{BufferPolicy, PlaybackCoordinator, PlaybackState, PlayerConfig};
#[allow(unused_imports)]
pub use session::{LogSession, MediaCommand, NowPlaying, SessionState, TrackMetadata};
#[allow(unused_imports)]
pub use view::{AffordanceView, ButtonLabel, RingStyle};
