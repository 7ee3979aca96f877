//! One detection pass: frame → intensity image → pupil and iris votes → result.

use image::GrayImage;

use crate::aggregate::{aggregate, DetectionResult};
use crate::circle::detect_circles;
use crate::config::EyeDetectConfig;
use crate::frame::{Frame, InputError};
use crate::preprocess::preprocess;

/// Pupil/iris detector.
///
/// Wraps an [`EyeDetectConfig`]. Create once, detect on many frames.
#[derive(Debug, Clone, Default)]
pub struct EyeDetector {
    config: EyeDetectConfig,
}

impl EyeDetector {
    /// Detector with the tuned pupil and iris presets.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EyeDetectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EyeDetectConfig {
        &self.config
    }

    /// Mutable access for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut EyeDetectConfig {
        &mut self.config
    }

    /// Preprocess a camera frame and run both passes.
    pub fn detect(&self, frame: &Frame) -> Result<DetectionResult, InputError> {
        let gray = preprocess(frame, &self.config.preprocess)?;
        Ok(self.detect_gray(&gray))
    }

    /// Run both passes on an already preprocessed intensity image.
    ///
    /// The passes are independent: the iris is not required to contain the
    /// pupil.
    pub fn detect_gray(&self, gray: &GrayImage) -> DetectionResult {
        let pupil = detect_circles(gray, &self.config.pupil).into_iter().next();
        let iris = detect_circles(gray, &self.config.iris).into_iter().next();
        let result = aggregate(pupil, iris);
        tracing::debug!(
            "eye pass {}x{}: pupil_d={:.1} iris_d={:.1} aligned={}",
            gray.width(),
            gray.height(),
            result.pupil_diameter(),
            result.iris_diameter(),
            result.eye_aligned()
        );
        result
    }
}
