//! Direct linear transform with Hartley normalization.

use crate::geometry::Point;
use nalgebra::{DMatrix, Matrix3};

/// Similarity that moves the centroid to the origin and scales the mean
/// distance from it to sqrt(2).
fn normalizing_transform(points: &[Point]) -> Option<Matrix3<f64>> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

fn apply(t: &Matrix3<f64>, p: &Point) -> (f64, f64) {
    let v = t * nalgebra::Vector3::new(p.x, p.y, 1.0);
    (v.x / v.z, v.y / v.z)
}

/// Fits `dst ~ H * src` to at least four correspondences.
///
/// Returns `None` for fewer than four pairs, degenerate point sets or a
/// non-finite solution. The result is scaled so `H[(2, 2)] == 1` when that
/// entry is not vanishing.
pub fn fit_homography(src: &[Point], dst: &[Point]) -> Option<Matrix3<f64>> {
    let n = src.len().min(dst.len());
    if n < 4 {
        return None;
    }
    let t_src = normalizing_transform(&src[..n])?;
    let t_dst = normalizing_transform(&dst[..n])?;

    // Padding to at least nine rows keeps the SVD square for minimal samples.
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for i in 0..n {
        let (x, y) = apply(&t_src, &src[i]);
        let (u, v) = apply(&t_dst, &dst[i]);
        let r = 2 * i;
        a.row_mut(r)
            .copy_from_slice(&[-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]);
        a.row_mut(r + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]);
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = v_t.row(min_idx);
    let h_norm = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse()?;
    let mut h = t_dst_inv * h_norm * t_src;
    let scale = h[(2, 2)];
    if scale.abs() > 1e-12 {
        h /= scale;
    }
    if h.iter().all(|v| v.is_finite()) && h.determinant().abs() > 1e-12 {
        Some(h)
    } else {
        None
    }
}

/// Maps `p` through `h`; `None` when the point lands at infinity.
pub fn project(h: &Matrix3<f64>, p: &Point) -> Option<Point> {
    let v = h * nalgebra::Vector3::new(p.x, p.y, 1.0);
    if v.z.abs() < 1e-12 {
        return None;
    }
    Some(Point::new(v.x / v.z, v.y / v.z))
}

/// Squared distance between `h * src` and `dst`, infinite when unmappable.
pub fn transfer_error_sq(h: &Matrix3<f64>, src: &Point, dst: &Point) -> f64 {
    match project(h, src) {
        Some(p) => (p - dst).norm_squared(),
        None => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::{fit_homography, project};
    use crate::geometry::Point;
    use nalgebra::Matrix3;

    fn grid() -> Vec<Point> {
        let mut pts = Vec::new();
        for y in 0..4 {
            for x in 0..5 {
                pts.push(Point::new(x as f64 * 23.0 + 4.0, y as f64 * 17.0 + 9.0));
            }
        }
        pts
    }

    #[test]
    fn recovers_known_projective_map() {
        let truth = Matrix3::new(1.1, 0.05, 12.0, -0.03, 0.95, -4.0, 1e-4, -2e-4, 1.0);
        let src = grid();
        let dst: Vec<Point> = src.iter().map(|p| project(&truth, p).unwrap()).collect();
        let h = fit_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(&dst) {
            let p = project(&h, s).unwrap();
            assert!((p - d).norm() < 1e-6, "{p:?} vs {d:?}");
        }
    }

    #[test]
    fn minimal_sample_is_exact() {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let dst = [
            Point::new(1.0, 2.0),
            Point::new(12.0, 1.0),
            Point::new(13.0, 14.0),
            Point::new(-1.0, 11.0),
        ];
        let h = fit_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(&dst) {
            assert!((project(&h, s).unwrap() - d).norm() < 1e-6);
        }
    }

    #[test]
    fn too_few_or_coincident_points_fail() {
        let p = Point::new(3.0, 3.0);
        assert!(fit_homography(&[p; 3], &[p; 3]).is_none());
        assert!(fit_homography(&[p; 5], &[p; 5]).is_none());
    }
}
