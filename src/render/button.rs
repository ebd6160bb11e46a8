//! Round play button with a volume ring
//!
//! The widget draws an [`AffordanceView`] and nothing else: label, active
//! fill, the volume ring, and a faint guide showing the drag zone while a
//! gesture is being tracked. It also reports its geometry so the gesture
//! controller works in the same coordinate space as the pointer.

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Sense, Stroke, Vec2};

use crate::gesture::{Geometry, Point};
use crate::player::{AffordanceView, ButtonLabel};

/// Display settings for the play button
#[derive(Clone)]
pub struct ButtonSettings {
    /// Button radius in points
    pub radius: f32,

    /// Width of the drag zone outside the button
    pub band_width: f32,

    /// Fill when stopped
    pub idle_fill: Color32,

    /// Fill while playing
    pub active_fill: Color32,

    /// Fill while showing an error
    pub error_fill: Color32,

    /// Ring and guide color (alpha comes from the ring intensity)
    pub ring_color: Color32,

    pub label_color: Color32,
}

impl Default for ButtonSettings {
    fn default() -> Self {
        Self {
            radius: 90.0,
            band_width: crate::gesture::DEFAULT_BAND_WIDTH,
            idle_fill: Color32::from_rgb(58, 42, 30),
            active_fill: Color32::from_rgb(122, 80, 48),
            error_fill: Color32::from_rgb(150, 40, 40),
            ring_color: Color32::from_rgb(214, 160, 110),
            label_color: Color32::from_rgb(245, 232, 220),
        }
    }
}

/// The single play/stop control
pub struct PlayButton {
    pub settings: ButtonSettings,
}

impl Default for PlayButton {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayButton {
    pub fn new() -> Self {
        Self {
            settings: ButtonSettings::default(),
        }
    }

    pub fn with_settings(settings: ButtonSettings) -> Self {
        Self { settings }
    }

    /// Draw the button centred in the available space
    ///
    /// # Returns
    /// The click response and the button geometry in pointer coordinates
    pub fn show(&self, ui: &mut egui::Ui, view: &AffordanceView) -> (egui::Response, Geometry) {
        let radius = self.settings.radius;
        let rect = ui.available_rect_before_wrap();
        let center = rect.center();

        let button_rect = egui::Rect::from_center_size(center, Vec2::splat(radius * 2.0));
        let response = ui.allocate_rect(button_rect, Sense::click());
        let painter = ui.painter();

        // Volume ring, behind the button
        let ring_radius = radius * view.ring.scale * 1.25;
        let ring_alpha = (view.ring.intensity.clamp(0.0, 1.0) * 255.0) as u8;
        let ring = with_alpha(self.settings.ring_color, ring_alpha);
        painter.circle_filled(center, ring_radius, with_alpha(self.settings.ring_color, ring_alpha / 4));
        painter.circle_stroke(center, ring_radius, Stroke::new(3.0, ring));

        if view.adjusting {
            let guide = Stroke::new(1.0, with_alpha(self.settings.ring_color, 60));
            painter.circle_stroke(center, radius + self.settings.band_width, guide);
        }

        let fill = match view.label {
            ButtonLabel::Error => self.settings.error_fill,
            _ if view.active => self.settings.active_fill,
            _ => self.settings.idle_fill,
        };
        let fill = if response.hovered() { fill.gamma_multiply(1.15) } else { fill };
        painter.circle(center, radius, fill, Stroke::new(2.0, self.settings.ring_color));

        painter.text(
            center,
            Align2::CENTER_CENTER,
            view.label.text(),
            FontId::proportional(radius * 0.3),
            self.settings.label_color,
        );

        (response, geometry_of(center, radius))
    }
}

fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

fn geometry_of(center: Pos2, radius: f32) -> Geometry {
    Geometry::new(Point::new(center.x, center.y), radius)
}
