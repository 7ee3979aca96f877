//! Circle detection by gradient voting.
//!
//! Edge pixels vote for candidate centers along their gradient direction at
//! every radius in a configured range. Peaks of the (center, radius)
//! accumulator are candidates: each is refined by a least-squares fit over
//! the edge pixels near it and kept when enough of its circumference carries
//! aligned edges.

mod edges;
mod fit;
mod hough;

pub use hough::{detect_circles, CenterSeparation, CircleDetector, HoughCircleConfig};

/// A detected circle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Circle {
    /// Center x (pixels).
    pub x: f32,
    /// Center y (pixels).
    pub y: f32,
    /// Radius (pixels, whole-pixel precision, never negative).
    pub radius: f32,
    /// Fraction of the circumference with radially aligned edge support.
    pub support: f32,
}

impl Circle {
    pub fn diameter(&self) -> f32 {
        2.0 * self.radius
    }
}
