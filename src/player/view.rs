//! What the play button should look like
//!
//! The coordinator keeps an [`AffordanceView`] up to date; the widget just
//! draws whatever it says.

use crate::gesture::Volume;

/// Text shown on the button
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonLabel {
    Start,
    Stop,
    Error,
}

impl ButtonLabel {
    pub fn text(&self) -> &'static str {
        match self {
            ButtonLabel::Start => "START",
            ButtonLabel::Stop => "STOP",
            ButtonLabel::Error => "ERROR",
        }
    }
}

/// Style of the volume ring drawn around the button
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingStyle {
    /// Ring radius relative to the button, 0.8 to 1.3
    pub scale: f32,
    /// Ring opacity, 0.1 to 0.9
    pub intensity: f32,
}

impl RingStyle {
    pub fn from_volume(volume: Volume) -> Self {
        let v = volume.get();
        Self {
            scale: 0.8 + v * 0.5,
            intensity: 0.1 + v * 0.8,
        }
    }
}

/// Everything the button widget needs to render a frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AffordanceView {
    pub label: ButtonLabel,
    /// Playback is running
    pub active: bool,
    /// A volume gesture is being tracked
    pub adjusting: bool,
    pub ring: RingStyle,
}

impl Default for AffordanceView {
    fn default() -> Self {
        Self {
            label: ButtonLabel::Start,
            active: false,
            adjusting: false,
            ring: RingStyle::from_volume(Volume::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_style_range() {
        let quiet = RingStyle::from_volume(Volume::MIN);
        assert!((quiet.scale - 0.8).abs() < 1e-6);
        assert!((quiet.intensity - 0.1).abs() < 1e-6);

        let loud = RingStyle::from_volume(Volume::MAX);
        assert!((loud.scale - 1.3).abs() < 1e-6);
        assert!((loud.intensity - 0.9).abs() < 1e-6);

        let half = RingStyle::from_volume(Volume::default());
        assert!((half.scale - 1.05).abs() < 1e-6);
        assert!((half.intensity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_labels() {
        assert_eq!(ButtonLabel::Start.text(), "START");
        assert_eq!(ButtonLabel::Stop.text(), "STOP");
        assert_eq!(ButtonLabel::Error.text(), "ERROR");
    }
}
