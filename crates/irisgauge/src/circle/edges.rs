//! Thinned gradient edges used as voters.

use image::GrayImage;

/// tan(22.5°): boundary between axis-aligned and diagonal gradient sectors.
const TAN_22_5: f32 = 0.414_213_57;

/// An edge pixel with its unit gradient direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EdgePixel {
    pub x: f32,
    pub y: f32,
    /// Unit gradient x component.
    pub nx: f32,
    /// Unit gradient y component.
    pub ny: f32,
}

/// Sobel edges above `threshold`, thinned by non-maximum suppression along
/// the quantized gradient direction.
///
/// `sigma > 0` pre-smooths the image, which stabilizes gradient directions on
/// rasterized curves. Border pixels never vote.
pub(crate) fn thinned_edges(gray: &GrayImage, threshold: f32, sigma: f32) -> Vec<EdgePixel> {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return Vec::new();
    }

    let smoothed;
    let src = if sigma > 0.0 {
        smoothed = imageproc::filter::gaussian_blur_f32(gray, sigma);
        &smoothed
    } else {
        gray
    };
    let gx = imageproc::gradients::horizontal_sobel(src);
    let gy = imageproc::gradients::vertical_sobel(src);
    let gx_raw = gx.as_raw();
    let gy_raw = gy.as_raw();

    let stride = w as usize;
    let mag: Vec<f32> = gx_raw
        .iter()
        .zip(gy_raw.iter())
        .map(|(&a, &b)| {
            let a = a as f32;
            let b = b as f32;
            (a * a + b * b).sqrt()
        })
        .collect();

    let mut edges = Vec::new();
    for y in 1..(h as usize - 1) {
        for x in 1..(stride - 1) {
            let idx = y * stride + x;
            let m = mag[idx];
            if m <= threshold {
                continue;
            }
            let gxv = gx_raw[idx] as f32;
            let gyv = gy_raw[idx] as f32;
            let (ax, ay) = (gxv.abs(), gyv.abs());
            let (n1, n2) = if ay <= ax * TAN_22_5 {
                (idx - 1, idx + 1)
            } else if ax <= ay * TAN_22_5 {
                (idx - stride, idx + stride)
            } else if (gxv > 0.0) == (gyv > 0.0) {
                (idx - stride - 1, idx + stride + 1)
            } else {
                (idx - stride + 1, idx + stride - 1)
            };
            // Ties keep both pixels so a symmetric step yields a symmetric ridge.
            if m < mag[n1] || m < mag[n2] {
                continue;
            }
            let inv = 1.0 / m;
            edges.push(EdgePixel {
                x: x as f32,
                y: y as f32,
                nx: gxv * inv,
                ny: gyv * inv,
            });
        }
    }
    edges
}
