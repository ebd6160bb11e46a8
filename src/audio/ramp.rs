//! Linear gain ramp, stepped once per frame on the audio thread

/// Per-frame linear gain ramp
///
/// Used for the start fade-in, the stop fade-out and the short declick ramp
/// that follows every volume change.
#[derive(Debug, Clone)]
pub struct GainRamp {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl GainRamp {
    /// Create a settled ramp holding `initial`
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Ramp from the current gain to `target` over exactly `frames` frames
    ///
    /// Zero frames snaps immediately.
    pub fn set_target(&mut self, target: f32, frames: u32) {
        self.target = target;
        if frames == 0 {
            self.current = target;
            self.step = 0.0;
            self.remaining = 0;
        } else {
            self.step = (target - self.current) / frames as f32;
            self.remaining = frames;
        }
    }

    /// Change the target without cutting short a longer ramp in progress
    ///
    /// A volume nudge during the fade-in keeps the fade's remaining length,
    /// otherwise it uses `min_frames`.
    pub fn retarget(&mut self, target: f32, min_frames: u32) {
        let frames = self.remaining.max(min_frames);
        self.set_target(target, frames);
    }

    /// Advance one frame and return the gain for it
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                self.current = self.target;
            } else {
                self.current += self.step;
            }
        }
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the ramp has reached its target
    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }
}

/// Convert a duration in seconds to a frame count at `sample_rate`
pub fn seconds_to_frames(seconds: f32, sample_rate: u32) -> u32 {
    (seconds.max(0.0) * sample_rate as f32).round() as u32
}
