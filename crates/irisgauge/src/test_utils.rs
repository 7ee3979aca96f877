//! Synthetic eye images for unit tests.

use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::Frame;

/// Pupil, iris and sclera intensities used by [`draw_eye`].
pub(crate) const PUPIL_PIX: u8 = 30;
pub(crate) const IRIS_PIX: u8 = 110;
pub(crate) const SCLERA_PIX: u8 = 220;

/// Render a filled disc: `inside_pix` where `d <= radius`, `outside_pix` elsewhere.
pub(crate) fn draw_disc(
    w: u32,
    h: u32,
    center: [f32; 2],
    radius: f32,
    inside_pix: u8,
    outside_pix: u8,
) -> GrayImage {
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let dx = x as f32 - center[0];
            let dy = y as f32 - center[1];
            let d = (dx * dx + dy * dy).sqrt();
            let pix = if d <= radius { inside_pix } else { outside_pix };
            img.put_pixel(x, y, Luma([pix]));
        }
    }
    img
}

/// Render a concentric pupil/iris pair on a sclera background.
///
/// Boundary pixels are 4×4 supersampled so both circles sit at their exact
/// radius rather than half a pixel outside it.
pub(crate) fn draw_eye(w: u32, h: u32, center: [f32; 2], pupil_r: f32, iris_r: f32) -> GrayImage {
    const SS: u32 = 4;
    let mut img = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for sy in 0..SS {
                for sx in 0..SS {
                    let px = x as f32 - 0.5 + (sx as f32 + 0.5) / SS as f32;
                    let py = y as f32 - 0.5 + (sy as f32 + 0.5) / SS as f32;
                    let d = ((px - center[0]).powi(2) + (py - center[1]).powi(2)).sqrt();
                    acc += if d < pupil_r {
                        PUPIL_PIX
                    } else if d < iris_r {
                        IRIS_PIX
                    } else {
                        SCLERA_PIX
                    } as f32;
                }
            }
            img.put_pixel(x, y, Luma([(acc / (SS * SS) as f32).round() as u8]));
        }
    }
    img
}

/// Add seeded uniform noise in `[-amplitude, amplitude]`.
pub(crate) fn add_uniform_noise(img: &mut GrayImage, amplitude: i16, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    for px in img.pixels_mut() {
        let n = rng.gen_range(-amplitude..=amplitude);
        px[0] = (px[0] as i16 + n).clamp(0, 255) as u8;
    }
}

/// Seeded uniform noise over the full 8-bit range.
pub(crate) fn noise_image(w: u32, h: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = GrayImage::new(w, h);
    for px in img.pixels_mut() {
        px[0] = rng.gen();
    }
    img
}

/// Wrap a gray image as an RGBA camera frame.
pub(crate) fn rgba_frame(gray: &GrayImage) -> Frame {
    let rgba = image::DynamicImage::ImageLuma8(gray.clone()).into_rgba8();
    Frame::from_rgba_image(rgba)
}

/// The end-to-end eye used across pipeline and session tests: 320×320,
/// pupil radius 20, iris radius 100, light noise.
pub(crate) fn reference_eye_frame() -> Frame {
    let mut img = draw_eye(320, 320, [160.0, 160.0], 20.0, 100.0);
    add_uniform_noise(&mut img, 8, 5);
    rgba_frame(&img)
}
