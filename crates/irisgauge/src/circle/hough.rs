//! Hough-style circle voting into a (center x, center y, radius) accumulator.

use std::f32::consts::{PI, TAU};

use image::GrayImage;

use super::edges::{thinned_edges, EdgePixel};
use super::fit::fit_circle_kasa;
use super::Circle;
use crate::config::ConfigError;

/// Radii below this cannot be separated from pixel-level gradient noise.
const MIN_RADIUS_PX: u32 = 3;
/// Accumulator size cap (cells). Larger searches need a coarser `accumulator_ratio`.
const MAX_ACCUMULATOR_CELLS: usize = 1 << 25;
/// Least-squares refinement rounds per accepted peak.
const REFINE_ITERS: usize = 2;
/// Minimum supporting edge pixels for the refinement fit.
const MIN_FIT_POINTS: usize = 8;
/// Minimum |cos| between an edge normal and the radial direction for support.
const MIN_RADIAL_ALIGNMENT: f32 = 0.85;
/// Accumulator peaks above this share of the confirmation level are verified.
/// Binning splits a circle's votes, so the accumulator alone underestimates support.
const CANDIDATE_FRACTION: f32 = 0.3;
/// Candidates verified per pass, strongest first.
const MAX_VERIFIED: usize = 128;
/// Distance (pixels) from a refined circle within which an edge pixel supports it.
const VERIFY_BAND: f32 = 1.5;
/// Angular sector count bounds for arc coverage (about 2 px of arc per sector).
const MIN_SECTORS: usize = 16;
const MAX_SECTORS: usize = 256;

/// Minimum distance between two accepted circle centers.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterSeparation {
    /// Absolute distance in pixels.
    Pixels(f32),
    /// Fraction of the image height (rows).
    FractionOfRows(f32),
}

impl CenterSeparation {
    /// Separation in pixels for an image with `rows` rows.
    pub fn resolve_px(self, rows: u32) -> f32 {
        match self {
            Self::Pixels(px) => px,
            Self::FractionOfRows(frac) => frac * rows as f32,
        }
    }

    fn value(self) -> f32 {
        match self {
            Self::Pixels(v) | Self::FractionOfRows(v) => v,
        }
    }
}

/// Tuning for one circle voting pass.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HoughCircleConfig {
    /// Center binning ratio (≥ 1): each accumulator bin spans `ratio × ratio` pixels.
    pub accumulator_ratio: f32,
    /// Minimum distance between distinct accepted centers.
    pub min_center_dist: CenterSeparation,
    /// Minimum Sobel gradient magnitude for a pixel to vote.
    pub edge_threshold: f32,
    /// Gaussian sigma applied before gradient computation (0 disables).
    pub gradient_sigma: f32,
    /// Confirmation threshold: fraction of the circumference that must carry
    /// radially aligned edge pixels on the refined circle.
    pub min_coverage: f32,
    /// Minimum radius (pixels).
    pub r_min: u32,
    /// Maximum radius (pixels).
    pub r_max: u32,
}

impl HoughCircleConfig {
    /// Pupil pass: small, high-contrast circles; strict confirmation.
    pub fn pupil() -> Self {
        Self {
            accumulator_ratio: 1.0,
            min_center_dist: CenterSeparation::FractionOfRows(0.125),
            edge_threshold: 100.0,
            gradient_sigma: 1.5,
            min_coverage: 0.5,
            r_min: 6,
            r_max: 40,
        }
    }

    /// Iris pass: large, lower-contrast circles; lenient confirmation and
    /// coarser center bins to keep the accumulator small.
    pub fn iris() -> Self {
        Self {
            accumulator_ratio: 2.0,
            min_center_dist: CenterSeparation::FractionOfRows(0.125),
            edge_threshold: 100.0,
            gradient_sigma: 1.5,
            min_coverage: 0.35,
            r_min: 50,
            r_max: 200,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid =
            |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };
        if !(self.accumulator_ratio.is_finite() && self.accumulator_ratio >= 1.0) {
            return invalid(format!(
                "accumulator_ratio must be >= 1, got {}",
                self.accumulator_ratio
            ));
        }
        let sep = self.min_center_dist.value();
        if !(sep.is_finite() && sep >= 0.0) {
            return invalid(format!("min_center_dist must be >= 0, got {}", sep));
        }
        if !(self.edge_threshold.is_finite() && self.edge_threshold >= 0.0) {
            return invalid(format!(
                "edge_threshold must be >= 0, got {}",
                self.edge_threshold
            ));
        }
        if !(self.gradient_sigma.is_finite() && self.gradient_sigma >= 0.0) {
            return invalid(format!(
                "gradient_sigma must be >= 0, got {}",
                self.gradient_sigma
            ));
        }
        if !(self.min_coverage.is_finite() && self.min_coverage > 0.0) {
            return invalid(format!(
                "min_coverage must be > 0, got {}",
                self.min_coverage
            ));
        }
        if self.r_max < self.r_min.max(MIN_RADIUS_PX) {
            return invalid(format!(
                "radius range [{}, {}] is empty (radii below {} are clamped)",
                self.r_min, self.r_max, MIN_RADIUS_PX
            ));
        }
        Ok(())
    }
}

impl Default for HoughCircleConfig {
    fn default() -> Self {
        Self::pupil()
    }
}

/// Reusable detector bound to one pass configuration.
#[derive(Debug, Clone)]
pub struct CircleDetector {
    config: HoughCircleConfig,
}

impl CircleDetector {
    pub fn new(config: HoughCircleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HoughCircleConfig {
        &self.config
    }

    /// Strongest circle in range, or `None`.
    pub fn detect(&self, gray: &GrayImage) -> Option<Circle> {
        detect_circles(gray, &self.config).into_iter().next()
    }

    /// All accepted circles, strongest first.
    pub fn detect_all(&self, gray: &GrayImage) -> Vec<Circle> {
        detect_circles(gray, &self.config)
    }
}

/// Dense vote accumulator, laid out center-row-major with radius innermost.
struct Accumulator {
    bw: usize,
    bh: usize,
    nr: usize,
    data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Peak {
    bx: usize,
    by: usize,
    ri: usize,
    strength: f32,
}

impl Accumulator {
    fn new(bw: usize, bh: usize, nr: usize) -> Self {
        Self {
            bw,
            bh,
            nr,
            data: vec![0.0; bw * bh * nr],
        }
    }

    #[inline]
    fn index(&self, bx: usize, by: usize, ri: usize) -> usize {
        (by * self.bw + bx) * self.nr + ri
    }

    /// Deposit one vote at bin coordinates `(x, y)` using bilinear interpolation.
    #[inline]
    fn deposit(&mut self, x: f32, y: f32, ri: usize) {
        if !(x >= 0.0 && y >= 0.0 && x < (self.bw - 1) as f32 && y < (self.bh - 1) as f32) {
            return;
        }
        let x0 = x as usize;
        let y0 = y as usize;
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let row = self.bw * self.nr;
        let base = self.index(x0, y0, ri);
        self.data[base] += (1.0 - fx) * (1.0 - fy);
        self.data[base + self.nr] += fx * (1.0 - fy);
        self.data[base + row] += (1.0 - fx) * fy;
        self.data[base + row + self.nr] += fx * fy;
    }

    /// Smooth with a separable `[0.5, 1, 0.5]` kernel along radius, x and y,
    /// so a vote landing exactly on a bin keeps weight 1 there.
    fn smooth(&mut self) {
        let (bw, bh, nr) = (self.bw, self.bh, self.nr);
        let row = bw * nr;

        if nr > 1 {
            let mut cell = vec![0.0f32; nr];
            for chunk in self.data.chunks_exact_mut(nr) {
                cell.copy_from_slice(chunk);
                for ri in 0..nr {
                    let lo = if ri > 0 { cell[ri - 1] } else { 0.0 };
                    let hi = if ri + 1 < nr { cell[ri + 1] } else { 0.0 };
                    chunk[ri] = cell[ri] + 0.5 * (lo + hi);
                }
            }
        }

        let mut src = vec![0.0f32; row];

        for by in 0..bh {
            let base = by * row;
            src.copy_from_slice(&self.data[base..base + row]);
            for bx in 0..bw {
                for ri in 0..nr {
                    let i = bx * nr + ri;
                    let left = if bx > 0 { src[i - nr] } else { 0.0 };
                    let right = if bx + 1 < bw { src[i + nr] } else { 0.0 };
                    self.data[base + i] = src[i] + 0.5 * (left + right);
                }
            }
        }

        let mut prev = vec![0.0f32; row];
        let mut cur = vec![0.0f32; row];
        for by in 0..bh {
            let base = by * row;
            cur.copy_from_slice(&self.data[base..base + row]);
            for i in 0..row {
                let next = if by + 1 < bh {
                    self.data[base + row + i]
                } else {
                    0.0
                };
                self.data[base + i] = cur[i] + 0.5 * (prev[i] + next);
            }
            std::mem::swap(&mut prev, &mut cur);
        }
    }

    /// 3×3×3 local maxima clearing the per-radius threshold, in scan order.
    fn local_maxima(&self, thresholds: &[f32]) -> Vec<Peak> {
        let mut peaks = Vec::new();
        for by in 0..self.bh {
            for bx in 0..self.bw {
                for (ri, &threshold) in thresholds.iter().enumerate() {
                    let idx = self.index(bx, by, ri);
                    let v = self.data[idx];
                    if v <= 0.0 || v < threshold {
                        continue;
                    }
                    if self.is_local_max(bx, by, ri, idx, v) {
                        peaks.push(Peak {
                            bx,
                            by,
                            ri,
                            strength: v,
                        });
                    }
                }
            }
        }
        peaks
    }

    fn is_local_max(&self, bx: usize, by: usize, ri: usize, idx: usize, v: f32) -> bool {
        let ys = by.saturating_sub(1)..=(by + 1).min(self.bh - 1);
        for ny in ys {
            for nx in bx.saturating_sub(1)..=(bx + 1).min(self.bw - 1) {
                for nri in ri.saturating_sub(1)..=(ri + 1).min(self.nr - 1) {
                    let nidx = self.index(nx, ny, nri);
                    if nidx == idx {
                        continue;
                    }
                    let nv = self.data[nidx];
                    // Plateaus resolve to the first cell in scan order.
                    if nv > v || (nv == v && nidx < idx) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Order peaks strongest first. The sort is stable, so equal strengths keep
/// their row-major scan order.
fn rank_peaks(peaks: &mut [Peak]) {
    peaks.sort_by(|a, b| b.strength.total_cmp(&a.strength));
}

/// Re-estimate center and radius from the edge pixels that support a peak.
///
/// Falls back to the accumulator estimate when too few pixels support it or
/// the fit drifts out of the support band.
fn refine_peak(edges: &[EdgePixel], center: [f32; 2], radius: f32, band: f32) -> [f32; 3] {
    let mut est = [center[0], center[1], radius];
    let mut pts: Vec<[f32; 2]> = Vec::new();
    for _ in 0..REFINE_ITERS {
        pts.clear();
        for e in edges {
            let dx = e.x - est[0];
            let dy = e.y - est[1];
            let d = (dx * dx + dy * dy).sqrt();
            if d < 1e-3 || (d - est[2]).abs() > band {
                continue;
            }
            let radial = (e.nx * dx + e.ny * dy) / d;
            if radial.abs() < MIN_RADIAL_ALIGNMENT {
                continue;
            }
            pts.push([e.x, e.y]);
        }
        if pts.len() < MIN_FIT_POINTS {
            break;
        }
        match fit_circle_kasa(&pts) {
            Some(fit) if (fit[2] - radius).abs() <= band => est = fit,
            _ => break,
        }
    }
    est
}

/// Fraction of angular sectors around `circle` holding at least one edge pixel
/// that lies on it with a radially aligned gradient.
fn arc_coverage(edges: &[EdgePixel], circle: [f32; 3]) -> f32 {
    let [cx, cy, r] = circle;
    if !(r.is_finite() && r > 0.0) {
        return 0.0;
    }
    let sectors = ((PI * r).round() as usize).clamp(MIN_SECTORS, MAX_SECTORS);
    let mut hit = vec![false; sectors];
    for e in edges {
        let dx = e.x - cx;
        let dy = e.y - cy;
        let d = (dx * dx + dy * dy).sqrt();
        if d < 1e-3 || (d - r).abs() > VERIFY_BAND {
            continue;
        }
        if ((e.nx * dx + e.ny * dy) / d).abs() < MIN_RADIAL_ALIGNMENT {
            continue;
        }
        let t = (dy.atan2(dx) + PI) / TAU;
        let s = ((t * sectors as f32) as usize).min(sectors - 1);
        hit[s] = true;
    }
    hit.iter().filter(|&&h| h).count() as f32 / sectors as f32
}

/// Detect circles with radius in `[r_min, r_max]`, strongest first.
///
/// Peaks closer than `min_center_dist` to an already accepted, stronger
/// circle are suppressed. Each peak is refined and then confirmed by the arc
/// coverage of its supporting edges. Returns an empty list for images smaller
/// than 3×3, an empty radius range, or when no peak is confirmed.
pub fn detect_circles(gray: &GrayImage, config: &HoughCircleConfig) -> Vec<Circle> {
    let (w, h) = gray.dimensions();
    if w < 3 || h < 3 {
        return Vec::new();
    }
    let r_min = config.r_min.max(MIN_RADIUS_PX);
    let r_max = config.r_max;
    if r_max < r_min {
        return Vec::new();
    }
    let dp = if config.accumulator_ratio.is_finite() {
        config.accumulator_ratio.max(1.0)
    } else {
        1.0
    };

    let bw = (w as f32 / dp).ceil() as usize;
    let bh = (h as f32 / dp).ceil() as usize;
    let nr = (r_max - r_min + 1) as usize;
    let cells = bw * bh * nr;
    if cells > MAX_ACCUMULATOR_CELLS {
        tracing::warn!(
            "circle vote r=[{}, {}]: {}x{}x{} accumulator exceeds {} cells",
            r_min,
            r_max,
            bw,
            bh,
            nr,
            MAX_ACCUMULATOR_CELLS
        );
        return Vec::new();
    }
    if bw < 2 || bh < 2 {
        return Vec::new();
    }

    let edges = thinned_edges(gray, config.edge_threshold, config.gradient_sigma);
    if edges.is_empty() {
        tracing::trace!("circle vote r=[{}, {}]: no edge pixels", r_min, r_max);
        return Vec::new();
    }

    // Votes along +gradient and -gradient: dark-on-bright and bright-on-dark.
    let mut accum = Accumulator::new(bw, bh, nr);
    let inv_dp = 1.0 / dp;
    for e in &edges {
        for ri in 0..nr {
            let r = (r_min as usize + ri) as f32;
            let ox = e.nx * r;
            let oy = e.ny * r;
            accum.deposit((e.x + ox) * inv_dp, (e.y + oy) * inv_dp, ri);
            accum.deposit((e.x - ox) * inv_dp, (e.y - oy) * inv_dp, ri);
        }
    }
    accum.smooth();

    let thresholds: Vec<f32> = (0..nr)
        .map(|ri| {
            let r = (r_min as usize + ri) as f32;
            CANDIDATE_FRACTION * config.min_coverage * TAU * r
        })
        .collect();
    let mut peaks = accum.local_maxima(&thresholds);
    rank_peaks(&mut peaks);

    let min_dist = config.min_center_dist.resolve_px(h).max(0.0);
    let min_dist_sq = min_dist * min_dist;
    let band = 1.5 + 0.5 * dp;

    let mut accepted: Vec<Circle> = Vec::new();
    let mut verified = 0usize;
    for peak in &peaks {
        let center = [peak.bx as f32 * dp, peak.by as f32 * dp];
        let near_accepted = |x: f32, y: f32| {
            accepted
                .iter()
                .any(|c| (c.x - x).powi(2) + (c.y - y).powi(2) < min_dist_sq)
        };
        if near_accepted(center[0], center[1]) {
            continue;
        }
        if verified == MAX_VERIFIED {
            break;
        }
        verified += 1;

        let r = (r_min as usize + peak.ri) as f32;
        let [cx, cy, rr] = refine_peak(&edges, center, r, band);
        let coverage = arc_coverage(&edges, [cx, cy, rr]);
        if coverage < config.min_coverage {
            continue;
        }
        // Fits within a pixel of the range are clamped; farther ones belong
        // to a circle outside it.
        let radius = rr.round();
        if radius < r_min as f32 - 1.0 || radius > r_max as f32 + 1.0 {
            continue;
        }
        if near_accepted(cx, cy) {
            continue;
        }
        accepted.push(Circle {
            x: cx,
            y: cy,
            radius: radius.clamp(r_min as f32, r_max as f32),
            support: coverage,
        });
    }

    tracing::debug!(
        "circle vote r=[{}, {}] dp={}: {} edge px, {} peaks, {} verified, {} circles",
        r_min,
        r_max,
        dp,
        edges.len(),
        peaks.len(),
        verified,
        accepted.len()
    );
    accepted
}
