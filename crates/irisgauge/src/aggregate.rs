//! Combine the pupil and iris passes into one per-tick result.

use crate::circle::Circle;

/// Diameters and alignment for one detection pass.
///
/// Only [`aggregate`] builds a populated result, so a diameter is always
/// `2 × radius` of the circle it came from and `eye_aligned` always tracks
/// the pupil diameter.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize)]
pub struct DetectionResult {
    pupil: Option<Circle>,
    iris: Option<Circle>,
    pupil_diameter: f32,
    iris_diameter: f32,
    eye_aligned: bool,
}

impl DetectionResult {
    /// No pupil, no iris, not aligned.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn pupil(&self) -> Option<&Circle> {
        self.pupil.as_ref()
    }

    pub fn iris(&self) -> Option<&Circle> {
        self.iris.as_ref()
    }

    /// Pupil diameter in pixels, 0 when no pupil was found.
    pub fn pupil_diameter(&self) -> f32 {
        self.pupil_diameter
    }

    /// Iris diameter in pixels, 0 when no iris was found.
    pub fn iris_diameter(&self) -> f32 {
        self.iris_diameter
    }

    /// True iff a pupil was found. The iris is not required.
    pub fn eye_aligned(&self) -> bool {
        self.eye_aligned
    }
}

/// Build a [`DetectionResult`] from the two pass outcomes.
pub fn aggregate(pupil: Option<Circle>, iris: Option<Circle>) -> DetectionResult {
    let diameter = |c: &Option<Circle>| c.map_or(0.0, |c| c.diameter().max(0.0));
    let pupil_diameter = diameter(&pupil);
    let iris_diameter = diameter(&iris);
    DetectionResult {
        pupil,
        iris,
        pupil_diameter,
        iris_diameter,
        eye_aligned: pupil_diameter > 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(radius: f32) -> Circle {
        Circle {
            x: 50.0,
            y: 40.0,
            radius,
            support: 0.9,
        }
    }

    #[test]
    fn both_present() {
        let r = aggregate(Some(circle(20.0)), Some(circle(100.0)));
        assert_eq!(r.pupil_diameter(), 40.0);
        assert_eq!(r.iris_diameter(), 200.0);
        assert!(r.eye_aligned());
        assert_eq!(r.pupil().map(|c| c.radius), Some(20.0));
    }

    #[test]
    fn nothing_found() {
        let r = aggregate(None, None);
        assert_eq!(r, DetectionResult::empty());
        assert_eq!(r.pupil_diameter(), 0.0);
        assert_eq!(r.iris_diameter(), 0.0);
        assert!(!r.eye_aligned());
    }

    #[test]
    fn iris_only_is_not_aligned() {
        let r = aggregate(None, Some(circle(80.0)));
        assert_eq!(r.iris_diameter(), 160.0);
        assert!(!r.eye_aligned());
    }

    #[test]
    fn pupil_only_is_aligned() {
        let r = aggregate(Some(circle(12.0)), None);
        assert_eq!(r.pupil_diameter(), 24.0);
        assert_eq!(r.iris_diameter(), 0.0);
        assert!(r.eye_aligned());
    }

    #[test]
    fn zero_radius_pupil_is_not_aligned() {
        let r = aggregate(Some(circle(0.0)), None);
        assert_eq!(r.pupil_diameter(), 0.0);
        assert!(!r.eye_aligned());
    }

    #[test]
    fn serializes_diameters() {
        let r = aggregate(Some(circle(20.0)), None);
        let json = serde_json::to_value(r).expect("serialize");
        assert_eq!(json["pupil_diameter"], 40.0);
        assert_eq!(json["iris_diameter"], 0.0);
        assert_eq!(json["eye_aligned"], true);
        assert!(json["iris"].is_null());
    }
}
