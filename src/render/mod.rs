//! Render module - UI components
//!
//! This module provides:
//! - The round play button with its volume ring

mod button;

pub use button::{ButtonSettings, PlayButton};
