//! Render callback state for a looping noise buffer

use std::sync::Arc;

use cpal::{FromSample, Sample};

use super::noise::NoiseBuffer;
use super::output::PlaybackShared;
use super::ramp::GainRamp;

/// Owned by the audio callback; reads the buffer, applies the gain ramp
pub struct LoopVoice {
    buffer: Arc<NoiseBuffer>,
    position: usize,
    ramp: GainRamp,
    seen_generation: u32,
    shared: Arc<PlaybackShared>,
}

impl LoopVoice {
    /// Start silent and pick up the fade-in from `shared` on the first callback
    pub fn new(buffer: Arc<NoiseBuffer>, shared: Arc<PlaybackShared>) -> Self {
        Self {
            buffer,
            position: 0,
            ramp: GainRamp::new(0.0),
            seen_generation: 0,
            shared,
        }
    }

    fn apply_pending_command(&mut self) {
        let Some(cmd) = self.shared.poll_command(self.seen_generation) else {
            return;
        };
        self.seen_generation = cmd.generation;

        if cmd.fade_out {
            // Exact fade length, whatever was in flight
            self.ramp.set_target(0.0, cmd.frames);
        } else {
            self.ramp.retarget(cmd.target, cmd.frames);
        }
    }

    /// Fill an interleaved output buffer
    ///
    /// The mono sample is copied to every channel of the frame.
    pub fn render<T: Sample + FromSample<f32>>(&mut self, data: &mut [T], channels: usize) {
        if channels == 0 || self.buffer.is_empty() {
            for sample in data.iter_mut() {
                *sample = T::EQUILIBRIUM;
            }
            return;
        }

        self.apply_pending_command();

        let samples = self.buffer.samples();
        let mut frames = 0u64;

        for frame in data.chunks_mut(channels) {
            let gain = self.ramp.next();
            let value = (samples[self.position] * gain).clamp(-1.0, 1.0);
            self.position = (self.position + 1) % samples.len();

            let out = T::from_sample(value);
            for ch in frame.iter_mut() {
                *ch = out;
            }
            frames += 1;
        }

        self.shared.add_rendered(frames);
    }

    #[cfg(test)]
    pub fn position(&self) -> usize {
        self.position
    }

    #[cfg(test)]
    pub fn gain(&self) -> f32 {
        self.ramp.current()
    }
}
