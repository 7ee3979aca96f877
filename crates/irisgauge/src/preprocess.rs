//! Frame → denoised intensity image.
//!
//! The circle voting stage needs one channel with isolated-pixel noise
//! removed but edges intact, so a median filter is used rather than a blur.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::config::ConfigError;
use crate::frame::{Frame, InputError, PixelLayout};

/// Preprocessing controls.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Side length of the square median kernel (odd; 1 disables smoothing).
    pub median_kernel: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { median_kernel: 5 }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.median_kernel == 0 || self.median_kernel % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "preprocess.median_kernel must be odd and positive, got {}",
                self.median_kernel
            )));
        }
        Ok(())
    }
}

/// Convert a frame to single-channel intensity without smoothing.
pub fn to_intensity(frame: &Frame) -> Result<GrayImage, InputError> {
    frame.validate()?;
    let (w, h) = frame.dimensions();
    let mismatch = || InputError::BufferSizeMismatch {
        expected: frame.expected_len(),
        got: frame.as_raw().len(),
    };
    let raw = frame.as_raw().to_vec();
    let gray = match frame.layout() {
        PixelLayout::Gray8 => GrayImage::from_raw(w, h, raw).ok_or_else(mismatch)?,
        PixelLayout::Rgba8 => {
            DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, raw).ok_or_else(mismatch)?)
                .into_luma8()
        }
        PixelLayout::Rgb8 => {
            DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, raw).ok_or_else(mismatch)?)
                .into_luma8()
        }
        PixelLayout::Bgr8 => {
            let mut rgb = raw;
            for px in rgb.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
            DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, rgb).ok_or_else(mismatch)?)
                .into_luma8()
        }
    };
    Ok(gray)
}

/// Convert a frame to intensity and apply the median filter.
pub fn preprocess(frame: &Frame, config: &PreprocessConfig) -> Result<GrayImage, InputError> {
    let gray = to_intensity(frame)?;
    let radius = config.median_kernel / 2;
    if radius == 0 {
        return Ok(gray);
    }
    Ok(imageproc::filter::median_filter(&gray, radius, radius))
}
