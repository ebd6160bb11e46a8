//! Audio module - brown noise synthesis and playback
//!
//! This module provides:
//! - Brown noise buffer generation
//! - Playback primitives (`NoiseOutput`) with fades and declicked gain changes
//! - Audio engine for cpal integration

mod engine;
mod noise;
mod output;
mod ramp;
mod voice;

// Re-export public types
pub use engine::NoiseEngine;
pub use noise::{generate_buffer, NoiseBuffer};
#[allow(unused_imports)]
pub use output::{AudioError, DeviceHealth, FadeOut, NoiseOutput, PlaybackHandle, PlaybackShared};
