//! Circular drag gesture to volume
//!
//! The pointer is tracked while it stays inside a ring around the play
//! button. Clockwise motion raises the volume, counter-clockwise lowers it.
//!
//! ## Angles
//!
//! Angles are in degrees, measured clockwise from screen-up:
//! up = 0, right = 90, down = 180, left = 270. Screen Y grows downward, so
//! the angle of an offset `(dx, dy)` is `atan2(dx, -dy)`.
//!
//! Consecutive angles are differenced along the shortest path, so crossing
//! the 0/360 seam never produces a full-turn jump.

use thiserror::Error;

/// Volume change per degree of rotation
pub const DEFAULT_SENSITIVITY: f32 = 0.002;

/// Width of the tracking ring outside the button edge, in pixels
pub const DEFAULT_BAND_WIDTH: f32 = 120.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GestureError {
    #[error("Button geometry is degenerate (center {x}, {y}, radius {radius})")]
    InvalidGeometry { x: f32, y: f32, radius: f32 },
}

/// A position in pointer coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Center and radius of the play button
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    pub center: Point,
    pub radius: f32,
}

impl Geometry {
    pub fn new(center: Point, radius: f32) -> Self {
        Self { center, radius }
    }

    fn validate(&self) -> Result<(), GestureError> {
        let finite = self.center.x.is_finite() && self.center.y.is_finite() && self.radius.is_finite();
        if finite && self.radius > 0.0 {
            Ok(())
        } else {
            Err(GestureError::InvalidGeometry {
                x: self.center.x,
                y: self.center.y,
                radius: self.radius,
            })
        }
    }
}

/// Output volume, always within [0, 1]
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Volume(f32);

impl Volume {
    pub const MIN: Volume = Volume(0.0);
    pub const MAX: Volume = Volume(1.0);

    /// Clamp `value` into range; NaN becomes silence
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Volume(0.0)
        } else {
            Volume(value.clamp(0.0, 1.0))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Add `delta`, absorbing whatever would pass either end
    pub fn nudged(self, delta: f32) -> Self {
        Self::new(self.0 + delta)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume(0.5)
    }
}

/// Angle of `pointer` around `center`, clockwise from up, in [0, 360)
pub fn angle_of(pointer: Point, center: Point) -> f32 {
    let dx = pointer.x - center.x;
    let dy = pointer.y - center.y;
    let degrees = dx.atan2(-dy).to_degrees();
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Shortest signed rotation from `from` to `to`, in [-180, 180]
pub fn wrapped_delta(from: f32, to: f32) -> f32 {
    let mut delta = to - from;
    if delta > 180.0 {
        delta -= 360.0;
    }
    if delta < -180.0 {
        delta += 360.0;
    }
    delta
}

/// Per-gesture tracking state
///
/// `last_angle` is only set while a gesture is tracked inside the ring.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureState {
    pub last_angle: Option<f32>,
    /// Button geometry captured when tracking began
    pub geometry: Option<Geometry>,
}

/// What a pointer event did
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureEvent {
    /// Pointer is outside the ring and nothing was being tracked
    Ignored,
    /// Tracking began; this sample only sets the baseline angle
    Baseline,
    /// Tracking continued and produced a new volume
    Adjusted(Volume),
    /// Tracking ended
    Released,
}

/// Turns pointer motion around the button into volume changes
#[derive(Clone, Debug)]
pub struct GestureVolumeController {
    state: GestureState,
    sensitivity: f32,
    band_width: f32,
}

impl Default for GestureVolumeController {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVITY, DEFAULT_BAND_WIDTH)
    }
}

impl GestureVolumeController {
    pub fn new(sensitivity: f32, band_width: f32) -> Self {
        Self {
            state: GestureState::default(),
            sensitivity,
            band_width,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state.last_angle.is_some()
    }

    fn in_ring(&self, pointer: Point, geometry: &Geometry) -> bool {
        let dx = pointer.x - geometry.center.x;
        let dy = pointer.y - geometry.center.y;
        let distance = (dx * dx + dy * dy).sqrt();
        distance >= geometry.radius && distance <= geometry.radius + self.band_width
    }

    /// Handle a pointer move
    ///
    /// `geometry` is the current button geometry; it is only read when a new
    /// gesture begins; an ongoing gesture keeps the geometry it started with.
    ///
    /// # Errors
    /// `GestureError::InvalidGeometry` if a gesture would begin on a
    /// zero-sized or non-finite button. State is left idle.
    pub fn on_move(&mut self, pointer: Point, geometry: Geometry, volume: Volume) -> Result<GestureEvent, GestureError> {
        match (self.state.last_angle, self.state.geometry) {
            (Some(last), Some(tracked)) => {
                if !self.in_ring(pointer, &tracked) {
                    self.reset();
                    return Ok(GestureEvent::Released);
                }

                let angle = angle_of(pointer, tracked.center);
                let delta = wrapped_delta(last, angle);
                self.state.last_angle = Some(angle);
                Ok(GestureEvent::Adjusted(volume.nudged(delta * self.sensitivity)))
            }
            _ => {
                geometry.validate()?;
                if !self.in_ring(pointer, &geometry) {
                    return Ok(GestureEvent::Ignored);
                }

                let angle = angle_of(pointer, geometry.center);
                self.state = GestureState {
                    last_angle: Some(angle),
                    geometry: Some(geometry),
                };
                log::debug!("Gesture baseline at {:.1} degrees", angle);
                Ok(GestureEvent::Baseline)
            }
        }
    }

    /// Pointer lifted or cancelled
    pub fn on_end(&mut self) -> GestureEvent {
        if self.is_tracking() {
            self.reset();
            GestureEvent::Released
        } else {
            GestureEvent::Ignored
        }
    }

    /// Drop any tracked gesture
    pub fn reset(&mut self) {
        self.state = GestureState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button() -> Geometry {
        Geometry::new(Point::new(200.0, 200.0), 80.0)
    }

    /// Point at `degrees` (clockwise from up) and `distance` from the center
    fn at(geometry: Geometry, degrees: f32, distance: f32) -> Point {
        let rad = degrees.to_radians();
        Point::new(
            geometry.center.x + distance * rad.sin(),
            geometry.center.y - distance * rad.cos(),
        )
    }

    fn adjusted(event: GestureEvent) -> Volume {
        match event {
            GestureEvent::Adjusted(v) => v,
            other => panic!("expected Adjusted, got {:?}", other),
        }
    }

    #[test]
    fn test_angle_convention() {
        let c = Point::new(0.0, 0.0);
        assert!((angle_of(Point::new(0.0, -10.0), c) - 0.0).abs() < 1e-4);
        assert!((angle_of(Point::new(10.0, 0.0), c) - 90.0).abs() < 1e-4);
        assert!((angle_of(Point::new(0.0, 10.0), c) - 180.0).abs() < 1e-4);
        assert!((angle_of(Point::new(-10.0, 0.0), c) - 270.0).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_across_seam() {
        assert!((wrapped_delta(350.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((wrapped_delta(10.0, 350.0) + 20.0).abs() < 1e-4);
        assert!((wrapped_delta(90.0, 120.0) - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_first_sample_is_baseline_only() {
        let g = button();
        let mut ctl = GestureVolumeController::default();
        let event = ctl.on_move(at(g, 45.0, 140.0), g, Volume::default()).unwrap();
        assert_eq!(event, GestureEvent::Baseline);
        assert!(ctl.is_tracking());
    }

    #[test]
    fn test_clockwise_sweep_raises_volume() {
        let g = button();
        let mut ctl = GestureVolumeController::default();
        let mut volume = Volume::default();

        ctl.on_move(at(g, 0.0, 140.0), g, volume).unwrap();
        for step in 1..=10 {
            volume = adjusted(ctl.on_move(at(g, step as f32 * 9.0, 140.0), g, volume).unwrap());
        }

        assert!((volume.get() - 0.68).abs() < 1e-3);
    }

    #[test]
    fn test_sweep_across_seam_is_small_and_positive() {
        let g = button();
        let mut ctl = GestureVolumeController::default();
        let start = Volume::default();

        ctl.on_move(at(g, 350.0, 140.0), g, start).unwrap();
        let volume = adjusted(ctl.on_move(at(g, 10.0, 140.0), g, start).unwrap());

        assert!((volume.get() - (0.5 + 20.0 * DEFAULT_SENSITIVITY)).abs() < 1e-3);
    }

    #[test]
    fn test_outside_ring_is_ignored() {
        let g = button();
        let mut ctl = GestureVolumeController::default();
        let v = Volume::default();

        // Inside the button itself
        assert_eq!(ctl.on_move(at(g, 0.0, 40.0), g, v).unwrap(), GestureEvent::Ignored);
        // Beyond the ring
        assert_eq!(ctl.on_move(at(g, 0.0, 80.0 + 121.0), g, v).unwrap(), GestureEvent::Ignored);
        assert!(!ctl.is_tracking());
        assert_eq!(ctl.state().last_angle, None);
    }

    #[test]
    fn test_leaving_ring_releases() {
        let g = button();
        let mut ctl = GestureVolumeController::default();
        let v = Volume::default();

        ctl.on_move(at(g, 0.0, 140.0), g, v).unwrap();
        assert_eq!(ctl.on_move(at(g, 10.0, 300.0), g, v).unwrap(), GestureEvent::Released);
        assert_eq!(ctl.state().last_angle, None);
    }

    #[test]
    fn test_reentry_rebaselines() {
        let g = button();
        let mut ctl = GestureVolumeController::default();
        let v = Volume::default();

        ctl.on_move(at(g, 0.0, 140.0), g, v).unwrap();
        ctl.on_move(at(g, 0.0, 400.0), g, v).unwrap();

        // Comes back on the other side of the ring: no jump
        assert_eq!(ctl.on_move(at(g, 170.0, 140.0), g, v).unwrap(), GestureEvent::Baseline);
        let after = adjusted(ctl.on_move(at(g, 175.0, 140.0), g, v).unwrap());
        assert!((after.get() - (0.5 + 5.0 * DEFAULT_SENSITIVITY)).abs() < 1e-3);
    }

    #[test]
    fn test_pointer_end_resets() {
        let g = button();
        let mut ctl = GestureVolumeController::default();
        assert_eq!(ctl.on_end(), GestureEvent::Ignored);

        ctl.on_move(at(g, 0.0, 140.0), g, Volume::default()).unwrap();
        assert_eq!(ctl.on_end(), GestureEvent::Released);
        assert!(!ctl.is_tracking());
    }

    #[test]
    fn test_volume_stays_clamped_under_adversarial_sweeps() {
        let g = button();
        let mut ctl = GestureVolumeController::default();
        let mut volume = Volume::default();

        ctl.on_move(at(g, 0.0, 140.0), g, volume).unwrap();
        // Five full turns clockwise: far more than needed to hit the top
        for step in 1..=(5 * 36) {
            volume = adjusted(ctl.on_move(at(g, (step * 10) as f32, 140.0), g, volume).unwrap());
            assert!((0.0..=1.0).contains(&volume.get()));
        }
        assert_eq!(volume, Volume::MAX);

        // No overshoot stored: turning back immediately lowers the volume
        volume = adjusted(ctl.on_move(at(g, 350.0, 140.0), g, volume).unwrap());
        assert!(volume.get() < 1.0);

        for step in 1..=(5 * 36) {
            volume = adjusted(ctl.on_move(at(g, 350.0 - (step * 10) as f32, 140.0), g, volume).unwrap());
            assert!((0.0..=1.0).contains(&volume.get()));
        }
        assert_eq!(volume, Volume::MIN);
    }

    #[test]
    fn test_degenerate_geometry_is_an_error() {
        let mut ctl = GestureVolumeController::default();
        let flat = Geometry::new(Point::new(10.0, 10.0), 0.0);
        assert!(matches!(
            ctl.on_move(Point::new(50.0, 10.0), flat, Volume::default()),
            Err(GestureError::InvalidGeometry { .. })
        ));
        assert!(!ctl.is_tracking());

        let nan = Geometry::new(Point::new(f32::NAN, 10.0), 50.0);
        assert!(ctl.on_move(Point::new(50.0, 10.0), nan, Volume::default()).is_err());
    }

    #[test]
    fn test_volume_clamps() {
        assert_eq!(Volume::new(1.7), Volume::MAX);
        assert_eq!(Volume::new(-0.2), Volume::MIN);
        assert_eq!(Volume::new(f32::NAN), Volume::MIN);
        assert_eq!(Volume::default().get(), 0.5);
    }
}
