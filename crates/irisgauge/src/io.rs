//! Boundaries to the camera and the display.

use crate::aggregate::DetectionResult;
use crate::frame::Frame;

/// Supplies camera snapshots.
///
/// Called at most once per tick, and only while scanning. `None` means no
/// frame is available yet; the tick is skipped.
pub trait FrameSource {
    fn capture_frame(&mut self) -> Option<Frame>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<Frame>,
{
    fn capture_frame(&mut self) -> Option<Frame> {
        self()
    }
}

/// Receives one [`Feedback`] per completed scanning tick.
pub trait FeedbackSink {
    fn publish(&mut self, feedback: &Feedback);
}

impl<S: FeedbackSink + ?Sized> FeedbackSink for &mut S {
    fn publish(&mut self, feedback: &Feedback) {
        (**self).publish(feedback)
    }
}

/// Collects every published feedback in order.
impl FeedbackSink for Vec<Feedback> {
    fn publish(&mut self, feedback: &Feedback) {
        self.push(*feedback);
    }
}

/// Border color signalling alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderColor {
    Green,
    Red,
}

impl BorderColor {
    /// Normalized RGBA.
    pub fn rgba(self) -> [f32; 4] {
        match self {
            Self::Green => [0.0, 1.0, 0.0, 1.0],
            Self::Red => [1.0, 0.0, 0.0, 1.0],
        }
    }
}

/// What the display shows after a tick.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Feedback {
    pub pupil_diameter: f32,
    pub iris_diameter: f32,
    pub eye_aligned: bool,
}

impl Feedback {
    /// Label shown before the first result arrives.
    pub const PLACEHOLDER_TEXT: &'static str = "Pupil Diameter: -\nIris Diameter: -";

    pub fn label_text(&self) -> String {
        format!(
            "Pupil Diameter: {:.2} pixels\nIris Diameter: {:.2} pixels",
            self.pupil_diameter, self.iris_diameter
        )
    }

    pub fn border_color(&self) -> BorderColor {
        if self.eye_aligned {
            BorderColor::Green
        } else {
            BorderColor::Red
        }
    }
}

impl From<&DetectionResult> for Feedback {
    fn from(r: &DetectionResult) -> Self {
        Self {
            pupil_diameter: r.pupil_diameter(),
            iris_diameter: r.iris_diameter(),
            eye_aligned: r.eye_aligned(),
        }
    }
}
