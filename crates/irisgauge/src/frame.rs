//! Camera frame snapshots and input validation errors.

use image::{GrayImage, RgbImage, RgbaImage};

/// Channel layout of a [`Frame`] pixel buffer (8 bits per channel, row-major).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelLayout {
    /// Red, green, blue, alpha. The layout of most camera textures.
    #[default]
    Rgba8,
    /// Red, green, blue.
    Rgb8,
    /// Blue, green, red.
    Bgr8,
    /// Single luminance channel.
    Gray8,
}

impl PixelLayout {
    /// Number of bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 | Self::Bgr8 => 3,
            Self::Gray8 => 1,
        }
    }
}

/// Errors for frames that cannot be turned into an intensity image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Width or height is zero.
    EmptyFrame {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// Buffer length does not match `width * height * channels`.
    BufferSizeMismatch {
        /// Length implied by the declared geometry and layout.
        expected: usize,
        /// Actual buffer length.
        got: usize,
    },
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyFrame { width, height } => {
                write!(f, "empty frame: {}x{}", width, height)
            }
            Self::BufferSizeMismatch { expected, got } => {
                write!(
                    f,
                    "frame buffer size mismatch: expected {} bytes, got {}",
                    expected, got
                )
            }
        }
    }
}

impl std::error::Error for InputError {}

/// One immutable camera snapshot.
///
/// The buffer is not validated on construction: frames come straight from
/// the camera and are checked by the preprocessor, which reports an
/// [`InputError`] instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw pixel buffer.
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            layout,
            data,
        }
    }

    /// Build an RGBA frame from an `image` buffer.
    pub fn from_rgba_image(img: RgbaImage) -> Self {
        let (w, h) = img.dimensions();
        Self::new(w, h, PixelLayout::Rgba8, img.into_raw())
    }

    /// Build an RGB frame from an `image` buffer.
    pub fn from_rgb_image(img: RgbImage) -> Self {
        let (w, h) = img.dimensions();
        Self::new(w, h, PixelLayout::Rgb8, img.into_raw())
    }

    /// Build a single-channel frame from an `image` buffer.
    pub fn from_gray_image(img: GrayImage) -> Self {
        let (w, h) = img.dimensions();
        Self::new(w, h, PixelLayout::Gray8, img.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Raw pixel bytes.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Buffer length implied by the declared geometry and layout.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.layout.channels()
    }

    /// Check geometry and buffer length.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.width == 0 || self.height == 0 {
            return Err(InputError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.expected_len();
        if self.data.len() != expected {
            return Err(InputError::BufferSizeMismatch {
                expected,
                got: self.data.len(),
            });
        }
        Ok(())
    }

    /// Convert to an RGBA image, e.g. for saving a captured still.
    pub fn to_rgba_image(&self) -> Result<RgbaImage, InputError> {
        self.validate()?;
        let rgba: Vec<u8> = match self.layout {
            PixelLayout::Rgba8 => self.data.clone(),
            PixelLayout::Rgb8 => self
                .data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            PixelLayout::Bgr8 => self
                .data
                .chunks_exact(3)
                .flat_map(|p| [p[2], p[1], p[0], 255])
                .collect(),
            PixelLayout::Gray8 => self.data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        };
        RgbaImage::from_raw(self.width, self.height, rgba).ok_or(
            InputError::BufferSizeMismatch {
                expected: self.expected_len(),
                got: self.data.len(),
            },
        )
    }
}
