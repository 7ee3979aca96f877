//! irisgauge — live pupil and iris diameter feedback for ocular capture.
//!
//! A camera feed is sampled on a fixed-rate tick. While scanning, each tick
//! runs the detection pipeline:
//!
//! 1. **Preprocess** – frame to intensity, median denoising.
//! 2. **Pupil pass** – circle voting over small radii with strict confirmation.
//! 3. **Iris pass** – circle voting over large radii with lenient confirmation.
//! 4. **Aggregate** – diameters in pixels plus an alignment signal.
//!
//! The result is published to a [`FeedbackSink`]. Capture freezes it;
//! Retake resumes scanning. Gating lives in [`CaptureState`].
//!
//! # Public API
//! - [`EyeDetector`] for one-shot detection on a frame or intensity image
//! - [`Session`] / [`SharedSession`] and [`Ticker`] for live operation
//! - [`FrameSource`] and [`FeedbackSink`] at the camera and display seams
//! - [`Config`] for JSON-loadable tuning

mod aggregate;
mod capture;
mod circle;
mod config;
mod frame;
mod io;
mod pipeline;
mod preprocess;
mod session;

#[cfg(test)]
mod test_utils;

pub use aggregate::{aggregate, DetectionResult};
pub use capture::{ButtonStates, CaptureEvent, CaptureState, SessionContext, Transition, UiEffect};
pub use circle::{detect_circles, CenterSeparation, Circle, CircleDetector, HoughCircleConfig};
pub use config::{Config, ConfigError, EyeDetectConfig, SessionConfig};
pub use frame::{Frame, InputError, PixelLayout};
pub use io::{BorderColor, Feedback, FeedbackSink, FrameSource};
pub use pipeline::EyeDetector;
pub use preprocess::{preprocess, to_intensity, PreprocessConfig};
pub use session::{Session, SharedSession, SkipReason, TickOutcome, Ticker, TickerStats};
