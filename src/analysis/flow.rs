//! Dense optical flow estimation.
//!
//! Farneback-style pyramidal flow: each image is approximated locally by a
//! quadratic polynomial (Gaussian-weighted least squares over a small
//! neighbourhood), and the displacement field that maps one expansion onto
//! the other is solved iteratively with window-averaged normal equations.
//! A coarse-to-fine pyramid handles displacements larger than the
//! neighbourhood.
//!
//! The estimator is used by the optical-flow similarity metric and can be
//! called directly by flow-field visualization collaborators.

use image::imageops::{self, FilterType};
use imageproc::filter::gaussian_blur_f32;

use crate::analysis::types::GrayF32Image;

/// Parameters for the pyramidal flow estimator.
#[derive(Debug, Clone)]
pub struct FlowParams {
    /// Image scale between pyramid levels (< 1.0).
    pub pyr_scale: f32,
    /// Number of pyramid levels including the original image.
    pub levels: usize,
    /// Averaging window size for the normal equations (odd).
    pub win_size: usize,
    /// Displacement refinement iterations per level.
    pub iterations: usize,
    /// Side of the pixel neighbourhood for polynomial expansion (odd).
    pub poly_n: usize,
    /// Standard deviation of the Gaussian applicability for the expansion.
    pub poly_sigma: f32,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            pyr_scale: 0.5,
            levels: 3,
            win_size: 15,
            iterations: 3,
            poly_n: 5,
            poly_sigma: 1.2,
        }
    }
}

/// Per-pixel displacement field between two frames.
#[derive(Debug, Clone)]
pub struct FlowField {
    width: u32,
    height: u32,
    dx: Vec<f32>,
    dy: Vec<f32>,
}

impl FlowField {
    fn zeros(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            dx: vec![0.0; n],
            dy: vec![0.0; n],
        }
    }

    /// Field width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Field height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Horizontal displacement components, row-major.
    pub fn dx(&self) -> &[f32] {
        &self.dx
    }

    /// Vertical displacement components, row-major.
    pub fn dy(&self) -> &[f32] {
        &self.dy
    }

    /// Decompose into per-pixel magnitude and direction (radians, [0, 2pi)).
    pub fn magnitude_angle(&self) -> (Vec<f32>, Vec<f32>) {
        let mut magnitude = Vec::with_capacity(self.dx.len());
        let mut angle = Vec::with_capacity(self.dx.len());
        for (&u, &v) in self.dx.iter().zip(self.dy.iter()) {
            magnitude.push(u.hypot(v));
            let mut a = v.atan2(u);
            if a < 0.0 {
                a += std::f32::consts::TAU;
            }
            angle.push(a);
        }
        (magnitude, angle)
    }

    /// Mean displacement magnitude over all pixels.
    pub fn mean_magnitude(&self) -> f64 {
        if self.dx.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .dx
            .iter()
            .zip(self.dy.iter())
            .map(|(&u, &v)| u.hypot(v) as f64)
            .sum();
        sum / self.dx.len() as f64
    }
}

/// Circular standard deviation of a set of angles (radians).
///
/// `sqrt(-2 ln R)` where `R` is the length of the mean unit vector.
/// 0.0 for perfectly coherent directions, growing as directions scatter.
pub fn circular_std(angles: &[f32]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }
    let (mut sum_cos, mut sum_sin) = (0.0f64, 0.0f64);
    for &a in angles {
        sum_cos += (a as f64).cos();
        sum_sin += (a as f64).sin();
    }
    let n = angles.len() as f64;
    let r = (sum_cos / n).hypot(sum_sin / n).clamp(1e-12, 1.0);
    (-2.0 * r.ln()).sqrt()
}

/// Estimate the dense displacement field mapping `a` onto `b`.
///
/// Images smaller than the expansion neighbourhood come back with a zero
/// field; there is not enough support to fit the polynomials.
pub fn estimate_flow(a: &GrayF32Image, b: &GrayF32Image, params: &FlowParams) -> FlowField {
    let (width, height) = a.dimensions();
    debug_assert_eq!(a.dimensions(), b.dimensions());

    if width < params.poly_n as u32 * 2 || height < params.poly_n as u32 * 2 {
        return FlowField::zeros(width, height);
    }

    // Coarse-to-fine pyramid; levels that would shrink below the
    // neighbourhood are dropped.
    let pyr_a = build_pyramid(a, params);
    let pyr_b = build_pyramid(b, params);
    let depth = pyr_a.len().min(pyr_b.len());

    let mut flow: Option<FlowField> = None;

    for level in (0..depth).rev() {
        let img_a = &pyr_a[level];
        let img_b = &pyr_b[level];
        let (lw, lh) = img_a.dimensions();

        let mut level_flow = match flow.take() {
            Some(prev) => upscale_flow(&prev, lw, lh, 1.0 / params.pyr_scale),
            None => FlowField::zeros(lw, lh),
        };

        let exp_a = PolyExpansion::compute(img_a, params.poly_n, params.poly_sigma);
        let exp_b = PolyExpansion::compute(img_b, params.poly_n, params.poly_sigma);

        for _ in 0..params.iterations {
            refine_flow(&exp_a, &exp_b, &mut level_flow, params.win_size);
        }

        flow = Some(level_flow);
    }

    flow.unwrap_or_else(|| FlowField::zeros(width, height))
}

/// Gaussian pyramid, finest level first.
fn build_pyramid(img: &GrayF32Image, params: &FlowParams) -> Vec<GrayF32Image> {
    let mut pyramid = vec![img.clone()];
    let min_side = (params.poly_n * 2) as u32;

    for _ in 1..params.levels {
        let last = pyramid.last().map(|l| l.dimensions());
        let (w, h) = match last {
            Some(dims) => dims,
            None => break,
        };
        let nw = ((w as f32) * params.pyr_scale).round() as u32;
        let nh = ((h as f32) * params.pyr_scale).round() as u32;
        if nw < min_side || nh < min_side {
            break;
        }
        // Anti-alias before subsampling.
        let blurred = gaussian_blur_f32(&pyramid[pyramid.len() - 1], 1.0);
        pyramid.push(imageops::resize(&blurred, nw, nh, FilterType::Triangle));
    }

    pyramid
}

/// Resize a flow field to new dimensions, scaling displacement values.
fn upscale_flow(flow: &FlowField, width: u32, height: u32, value_scale: f32) -> FlowField {
    let resize_plane = |plane: &[f32]| -> Vec<f32> {
        let img = GrayF32Image::from_raw(flow.width, flow.height, plane.to_vec())
            .unwrap_or_else(|| GrayF32Image::new(flow.width, flow.height));
        let resized = imageops::resize(&img, width, height, FilterType::Triangle);
        resized.into_raw().iter().map(|&v| v * value_scale).collect()
    };

    FlowField {
        width,
        height,
        dx: resize_plane(&flow.dx),
        dy: resize_plane(&flow.dy),
    }
}

/// Quadratic polynomial expansion of an image.
///
/// Each pixel's neighbourhood is approximated as
/// `f(x) ~ x^T A x + b^T x + c`; the planes store `b` and the symmetric
/// `A` per pixel. The constant term is not needed for flow.
struct PolyExpansion {
    width: usize,
    height: usize,
    bx: Vec<f32>,
    by: Vec<f32>,
    a11: Vec<f32>,
    a12: Vec<f32>,
    a22: Vec<f32>,
}

impl PolyExpansion {
    fn compute(img: &GrayF32Image, poly_n: usize, poly_sigma: f32) -> Self {
        let width = img.width() as usize;
        let height = img.height() as usize;
        let half = (poly_n / 2) as i64;

        // Gaussian applicability over the neighbourhood and the constant
        // normal matrix of the basis {1, x, y, x^2, y^2, xy}. Coordinates
        // are clamped at the border, so the applicability (and therefore
        // the matrix) is the same for every pixel.
        let mut offsets = Vec::with_capacity(poly_n * poly_n);
        for j in -half..=half {
            for i in -half..=half {
                let w = (-((i * i + j * j) as f32) / (2.0 * poly_sigma * poly_sigma)).exp();
                offsets.push((i, j, w as f64));
            }
        }

        let mut g = [[0.0f64; 6]; 6];
        for &(i, j, w) in &offsets {
            let basis = basis_at(i as f64, j as f64);
            for r in 0..6 {
                for c in 0..6 {
                    g[r][c] += w * basis[r] * basis[c];
                }
            }
        }
        let g_inv = invert6(&g);

        let raw = img.as_raw();
        let sample = |x: i64, y: i64| -> f64 {
            let cx = x.clamp(0, width as i64 - 1) as usize;
            let cy = y.clamp(0, height as i64 - 1) as usize;
            raw[cy * width + cx] as f64
        };

        let n = width * height;
        let mut out = Self {
            width,
            height,
            bx: vec![0.0; n],
            by: vec![0.0; n],
            a11: vec![0.0; n],
            a12: vec![0.0; n],
            a22: vec![0.0; n],
        };

        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let mut v = [0.0f64; 6];
                for &(i, j, w) in &offsets {
                    let f = w * sample(x + i, y + j);
                    let basis = basis_at(i as f64, j as f64);
                    for k in 0..6 {
                        v[k] += f * basis[k];
                    }
                }

                let mut r = [0.0f64; 6];
                for row in 0..6 {
                    for col in 0..6 {
                        r[row] += g_inv[row][col] * v[col];
                    }
                }

                let idx = y as usize * width + x as usize;
                out.bx[idx] = r[1] as f32;
                out.by[idx] = r[2] as f32;
                out.a11[idx] = r[3] as f32;
                out.a22[idx] = r[4] as f32;
                // The xy basis carries coefficient 2*a12.
                out.a12[idx] = (r[5] / 2.0) as f32;
            }
        }

        out
    }
}

/// Basis vector {1, x, y, x^2, y^2, xy} at an offset.
fn basis_at(x: f64, y: f64) -> [f64; 6] {
    [1.0, x, y, x * x, y * y, x * y]
}

/// One displacement refinement pass.
///
/// Builds the pointwise normal equations from the two expansions (warping
/// the second by the current flow), averages them over the window, and
/// solves the 2x2 system per pixel.
fn refine_flow(exp_a: &PolyExpansion, exp_b: &PolyExpansion, flow: &mut FlowField, win_size: usize) {
    let width = exp_a.width;
    let height = exp_a.height;
    let n = width * height;

    let mut g11 = vec![0.0f64; n];
    let mut g12 = vec![0.0f64; n];
    let mut g22 = vec![0.0f64; n];
    let mut h1 = vec![0.0f64; n];
    let mut h2 = vec![0.0f64; n];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let fx = flow.dx[idx] as f64;
            let fy = flow.dy[idx] as f64;

            // Look up the second expansion at the displaced position.
            let wx = ((x as f64 + fx).round() as i64).clamp(0, width as i64 - 1) as usize;
            let wy = ((y as f64 + fy).round() as i64).clamp(0, height as i64 - 1) as usize;
            let widx = wy * width + wx;

            let a11 = 0.5 * (exp_a.a11[idx] as f64 + exp_b.a11[widx] as f64);
            let a12 = 0.5 * (exp_a.a12[idx] as f64 + exp_b.a12[widx] as f64);
            let a22 = 0.5 * (exp_a.a22[idx] as f64 + exp_b.a22[widx] as f64);

            let db_x = -0.5 * (exp_b.bx[widx] as f64 - exp_a.bx[idx] as f64) + a11 * fx + a12 * fy;
            let db_y = -0.5 * (exp_b.by[widx] as f64 - exp_a.by[idx] as f64) + a12 * fx + a22 * fy;

            // G = A^T A and h = A^T db for the symmetric A.
            g11[idx] = a11 * a11 + a12 * a12;
            g12[idx] = a12 * (a11 + a22);
            g22[idx] = a22 * a22 + a12 * a12;
            h1[idx] = a11 * db_x + a12 * db_y;
            h2[idx] = a12 * db_x + a22 * db_y;
        }
    }

    let radius = win_size / 2;
    box_blur(&mut g11, width, height, radius);
    box_blur(&mut g12, width, height, radius);
    box_blur(&mut g22, width, height, radius);
    box_blur(&mut h1, width, height, radius);
    box_blur(&mut h2, width, height, radius);

    for idx in 0..n {
        let det = g11[idx] * g22[idx] - g12[idx] * g12[idx];
        if det.abs() < 1e-9 {
            // Degenerate neighbourhood (no texture); keep the prior flow.
            continue;
        }
        flow.dx[idx] = ((g22[idx] * h1[idx] - g12[idx] * h2[idx]) / det) as f32;
        flow.dy[idx] = ((g11[idx] * h2[idx] - g12[idx] * h1[idx]) / det) as f32;
    }
}

/// Normalized separable box filter with edge clamping, in place.
fn box_blur(plane: &mut [f64], width: usize, height: usize, radius: usize) {
    if radius == 0 {
        return;
    }
    let r = radius as i64;
    let mut scratch = vec![0.0f64; plane.len()];

    // Horizontal pass.
    for y in 0..height {
        let row = &plane[y * width..(y + 1) * width];
        for x in 0..width as i64 {
            let lo = (x - r).max(0) as usize;
            let hi = ((x + r) as usize).min(width - 1);
            let sum: f64 = row[lo..=hi].iter().sum();
            scratch[y * width + x as usize] = sum / (hi - lo + 1) as f64;
        }
    }

    // Vertical pass.
    for x in 0..width {
        for y in 0..height as i64 {
            let lo = (y - r).max(0) as usize;
            let hi = ((y + r) as usize).min(height - 1);
            let mut sum = 0.0;
            for row in lo..=hi {
                sum += scratch[row * width + x];
            }
            plane[y as usize * width + x] = sum / (hi - lo + 1) as f64;
        }
    }
}

/// Gauss-Jordan inverse of a 6x6 matrix with partial pivoting.
fn invert6(m: &[[f64; 6]; 6]) -> [[f64; 6]; 6] {
    let mut a = *m;
    let mut inv = [[0.0f64; 6]; 6];
    for (i, row) in inv.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for col in 0..6 {
        // Pivot on the largest remaining entry in this column.
        let mut pivot = col;
        for row in (col + 1)..6 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let diag = a[col][col];
        if diag.abs() < 1e-12 {
            // The Gaussian applicability makes the normal matrix
            // non-singular in practice; bail out to identity-ish rather
            // than dividing by zero.
            continue;
        }
        for k in 0..6 {
            a[col][k] /= diag;
            inv[col][k] /= diag;
        }

        for row in 0..6 {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            for k in 0..6 {
                a[row][k] -= factor * a[col][k];
                inv[row][k] -= factor * inv[col][k];
            }
        }
    }

    inv
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smooth 2D sinusoid with enough texture for the expansion to grip.
    fn textured(width: u32, height: u32, phase: f32) -> GrayF32Image {
        GrayF32Image::from_fn(width, height, |x, y| {
            let v = 128.0
                + 60.0 * ((x as f32 + phase) * 0.22).sin()
                + 50.0 * ((y as f32 + phase) * 0.18).cos();
            image::Luma([v])
        })
    }

    #[test]
    fn identical_images_yield_near_zero_flow() {
        let img = textured(48, 48, 0.0);
        let flow = estimate_flow(&img, &img, &FlowParams::default());
        assert!(flow.mean_magnitude() < 0.05, "got {}", flow.mean_magnitude());
    }

    #[test]
    fn shifted_image_yields_motion() {
        let a = textured(48, 48, 0.0);
        let b = textured(48, 48, 3.0);
        let flow = estimate_flow(&a, &b, &FlowParams::default());
        assert!(flow.mean_magnitude() > 0.2, "got {}", flow.mean_magnitude());
    }

    #[test]
    fn tiny_images_get_zero_field() {
        let a = textured(4, 4, 0.0);
        let b = textured(4, 4, 2.0);
        let flow = estimate_flow(&a, &b, &FlowParams::default());
        assert_eq!(flow.mean_magnitude(), 0.0);
        assert_eq!(flow.width(), 4);
    }

    #[test]
    fn magnitude_angle_quadrants() {
        let field = FlowField {
            width: 2,
            height: 1,
            dx: vec![1.0, -1.0],
            dy: vec![0.0, 0.0],
        };
        let (mag, ang) = field.magnitude_angle();
        assert!((mag[0] - 1.0).abs() < 1e-6);
        assert!(ang[0].abs() < 1e-6);
        assert!((ang[1] - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn circular_std_of_coherent_angles_is_zero() {
        let angles = vec![0.5f32; 100];
        assert!(circular_std(&angles) < 1e-6);
    }

    #[test]
    fn circular_std_grows_with_scatter() {
        let coherent = vec![0.5f32; 64];
        let scattered: Vec<f32> = (0..64)
            .map(|i| i as f32 * std::f32::consts::TAU / 64.0)
            .collect();
        assert!(circular_std(&scattered) > circular_std(&coherent));
    }

    #[test]
    fn wrapped_angles_stay_coherent() {
        // Angles straddling the 0/2pi seam point the same way.
        let angles = vec![0.05f32, std::f32::consts::TAU - 0.05, 0.02, std::f32::consts::TAU - 0.02];
        assert!(circular_std(&angles) < 0.1);
    }

    #[test]
    fn invert6_recovers_identity() {
        let mut m = [[0.0f64; 6]; 6];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 2.0;
        }
        let inv = invert6(&m);
        for (i, row) in inv.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                let expected = if i == j { 0.5 } else { 0.0 };
                assert!((v - expected).abs() < 1e-12);
            }
        }
    }
}
