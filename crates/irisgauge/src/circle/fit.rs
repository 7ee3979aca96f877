//! Algebraic least-squares circle fit (Kåsa).

use nalgebra::{Matrix3, Vector3};

/// Fit `x² + y² + D x + E y + F = 0` to `points`.
///
/// Returns `[cx, cy, r]`, or `None` for fewer than 3 points or a degenerate
/// (collinear) configuration. Points are centered and scaled before solving.
pub(crate) fn fit_circle_kasa(points: &[[f32; 2]]) -> Option<[f32; 3]> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let inv_n = 1.0 / n as f64;
    let mean_x = points.iter().map(|p| p[0] as f64).sum::<f64>() * inv_n;
    let mean_y = points.iter().map(|p| p[1] as f64).sum::<f64>() * inv_n;
    let mean_dist = points
        .iter()
        .map(|p| ((p[0] as f64 - mean_x).powi(2) + (p[1] as f64 - mean_y).powi(2)).sqrt())
        .sum::<f64>()
        * inv_n;
    if mean_dist < 1e-9 {
        return None;
    }
    let scale = 1.0 / mean_dist;

    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    for p in points {
        let x = (p[0] as f64 - mean_x) * scale;
        let y = (p[1] as f64 - mean_y) * scale;
        let row = Vector3::new(x, y, 1.0);
        ata += row * row.transpose();
        atb += row * -(x * x + y * y);
    }

    // Normalized entries are O(n), so a healthy system has det ~ n³.
    if ata.determinant().abs() < 1e-10 * (n as f64).powi(3) {
        return None;
    }
    let sol = ata.lu().solve(&atb)?;
    let cx_n = -0.5 * sol[0];
    let cy_n = -0.5 * sol[1];
    let r2_n = cx_n * cx_n + cy_n * cy_n - sol[2];
    if !(r2_n.is_finite() && r2_n > 0.0) {
        return None;
    }

    let cx = cx_n / scale + mean_x;
    let cy = cy_n / scale + mean_y;
    let r = r2_n.sqrt() / scale;
    if !(cx.is_finite() && cy.is_finite() && r.is_finite()) {
        return None;
    }
    Some([cx as f32, cy as f32, r as f32])
}
