//! Zoom-independent coordinate system
//!
//! Annotation geometry is stored in normalized document-space units. A point on
//! screen (in page-layer pixels) is always `normalized * BASE_SCALE * zoom`, so
//! stored geometry never depends on the bitmap resolution used for display.

use serde::{Deserialize, Serialize};

/// Fixed render scale shared with the page renderer.
///
/// At zoom 1.0 one normalized unit covers `BASE_SCALE` screen pixels.
pub const BASE_SCALE: f32 = 1.5;

/// Smallest supported zoom factor
pub const MIN_ZOOM: f32 = 0.25;

/// Largest supported zoom factor
pub const MAX_ZOOM: f32 = 3.0;

/// Convert a screen pixel value to normalized units at the given zoom
pub fn to_norm(px: f32, zoom: f32) -> f32 {
    px / (BASE_SCALE * zoom)
}

/// Convert a normalized value to screen pixels at the given zoom
pub fn from_norm(norm: f32, zoom: f32) -> f32 {
    norm * (BASE_SCALE * zoom)
}

/// Current zoom factor, always inside `[MIN_ZOOM, MAX_ZOOM]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zoom(f32);

impl Zoom {
    /// Zoom used by "fit" in the viewer chrome
    pub const FIT: Zoom = Zoom(1.0);

    /// Create a zoom level, clamping into the supported range
    pub fn new(factor: f32) -> Self {
        if !factor.is_finite() {
            return Self::FIT;
        }
        Self(factor.clamp(MIN_ZOOM, MAX_ZOOM))
    }

    /// Raw zoom factor
    pub fn factor(self) -> f32 {
        self.0
    }

    /// Screen pixels per normalized unit
    pub fn scale(self) -> f32 {
        BASE_SCALE * self.0
    }

    /// Step the zoom by `delta`, clamped and rounded to two decimals
    pub fn step(self, delta: f32) -> Self {
        let next = (self.0 + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        Self(((next * 100.0).round() / 100.0).clamp(MIN_ZOOM, MAX_ZOOM))
    }

    pub fn to_norm(self, px: f32) -> f32 {
        to_norm(px, self.0)
    }

    pub fn from_norm(self, norm: f32) -> f32 {
        from_norm(norm, self.0)
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::FIT
    }
}

/// Point in page-layer pixels (origin top-left, y down)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Project into normalized units
    pub fn to_norm(self, zoom: Zoom) -> (f32, f32) {
        (zoom.to_norm(self.x), zoom.to_norm(self.y))
    }

    /// Project a normalized position onto the screen
    pub fn from_norm(norm_x: f32, norm_y: f32, zoom: Zoom) -> Self {
        Self { x: zoom.from_norm(norm_x), y: zoom.from_norm(norm_y) }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// Half-angle of arrow heads, in radians (30 degrees)
pub const ARROW_HALF_ANGLE: f32 = std::f32::consts::PI / 6.0;

/// Compute the two arm endpoints of an arrow head at `tip`
///
/// The arms point back along the `tail -> tip` direction at ±30 degrees.
/// Works in any coordinate space where both axes share the same orientation.
pub fn chevron(tail: (f32, f32), tip: (f32, f32), head_len: f32) -> ((f32, f32), (f32, f32)) {
    let angle = (tip.1 - tail.1).atan2(tip.0 - tail.0);
    let a1 = angle - ARROW_HALF_ANGLE;
    let a2 = angle + ARROW_HALF_ANGLE;
    (
        (tip.0 - head_len * a1.cos(), tip.1 - head_len * a1.sin()),
        (tip.0 - head_len * a2.cos(), tip.1 - head_len * a2.sin()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-3 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_norm_at_unit_zoom() {
        assert!(approx(to_norm(150.0, 1.0), 100.0));
        assert!(approx(from_norm(100.0, 1.0), 150.0));
    }

    #[test]
    fn test_zoom_clamps_and_rounds() {
        assert_eq!(Zoom::new(10.0).factor(), MAX_ZOOM);
        assert_eq!(Zoom::new(0.01).factor(), MIN_ZOOM);
        assert_eq!(Zoom::new(f32::NAN), Zoom::FIT);

        let z = Zoom::FIT.step(0.1).step(0.1);
        assert_eq!(z.factor(), 1.2);
        assert_eq!(Zoom::new(2.95).step(0.25).factor(), MAX_ZOOM);
    }

    #[test]
    fn test_chevron_points_back_along_segment() {
        let (a, b) = chevron((0.0, 0.0), (100.0, 0.0), 12.0);
        assert!(a.0 < 100.0 && b.0 < 100.0);
        assert!(approx(a.1, -b.1));
        let len = ((100.0 - a.0).powi(2) + a.1.powi(2)).sqrt();
        assert!(approx(len, 12.0));
    }

    proptest! {
        #[test]
        fn norm_round_trip(px in -5000.0f32..5000.0, zoom in MIN_ZOOM..=MAX_ZOOM) {
            let back = from_norm(to_norm(px, zoom), zoom);
            prop_assert!(approx(back, px), "{px} -> {back} at zoom {zoom}");
        }
    }
}
