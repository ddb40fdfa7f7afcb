//! Seeded RANSAC around the DLT homography.

use crate::geometry::homography::{fit_homography, transfer_error_sq};
use crate::geometry::Point;
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SAMPLE_SIZE: usize = 4;

/// RANSAC settings.
#[derive(Clone, Copy, Debug)]
pub struct RansacParams {
    /// Maximum reprojection distance in pixels for an inlier.
    pub reproj_threshold: f64,
    /// Upper bound on sampled hypotheses.
    pub max_iters: usize,
    /// Desired probability of drawing at least one all-inlier sample.
    pub confidence: f64,
    /// Seed for the sampler; equal seeds give equal fits.
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            reproj_threshold: 5.0,
            max_iters: 2000,
            confidence: 0.995,
            seed: 0x5eed,
        }
    }
}

/// Best homography found and the correspondences it explains.
#[derive(Clone, Debug, PartialEq)]
pub struct HomographyFit {
    pub matrix: Matrix3<f64>,
    /// One flag per input correspondence.
    pub inlier_mask: Vec<bool>,
    pub inliers: usize,
}

fn collinear(a: &Point, b: &Point, c: &Point) -> bool {
    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    cross.abs() < 1e-6
}

fn degenerate(points: &[Point; SAMPLE_SIZE]) -> bool {
    let [a, b, c, d] = points;
    collinear(a, b, c) || collinear(a, b, d) || collinear(a, c, d) || collinear(b, c, d)
}

fn score(h: &Matrix3<f64>, src: &[Point], dst: &[Point], threshold_sq: f64) -> (Vec<bool>, usize) {
    let mask: Vec<bool> = src
        .iter()
        .zip(dst)
        .map(|(s, d)| transfer_error_sq(h, s, d) <= threshold_sq)
        .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (mask, count)
}

/// Hypotheses needed to reach `confidence` at the given inlier fraction.
fn required_iterations(inlier_fraction: f64, confidence: f64, cap: usize) -> usize {
    let all_inliers = inlier_fraction.powi(SAMPLE_SIZE as i32);
    if all_inliers >= 1.0 - f64::EPSILON {
        return 1;
    }
    if all_inliers <= f64::EPSILON {
        return cap;
    }
    let n = (1.0 - confidence).ln() / (1.0 - all_inliers).ln();
    if n.is_finite() && n >= 0.0 {
        (n.ceil() as usize).clamp(1, cap)
    } else {
        cap
    }
}

/// Robustly fits `dst ~ H * src`.
///
/// Returns `None` when fewer than four correspondences are given or no
/// non-degenerate sample produced a model. The winning hypothesis is refit on
/// its inliers and the refit is kept unless it explains fewer points.
pub fn fit_homography_ransac(
    src: &[Point],
    dst: &[Point],
    params: &RansacParams,
) -> Option<HomographyFit> {
    let n = src.len().min(dst.len());
    if n < SAMPLE_SIZE {
        return None;
    }
    let (src, dst) = (&src[..n], &dst[..n]);
    let threshold_sq = params.reproj_threshold * params.reproj_threshold;
    let cap = params.max_iters.max(1);
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut best: Option<HomographyFit> = None;
    let mut needed = cap;
    let mut iter = 0;
    while iter < needed {
        iter += 1;
        let idx = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
        let s = [src[idx.index(0)], src[idx.index(1)], src[idx.index(2)], src[idx.index(3)]];
        let d = [dst[idx.index(0)], dst[idx.index(1)], dst[idx.index(2)], dst[idx.index(3)]];
        if degenerate(&s) || degenerate(&d) {
            continue;
        }
        let Some(h) = fit_homography(&s, &d) else {
            continue;
        };
        let (mask, count) = score(&h, src, dst, threshold_sq);
        if best.as_ref().map_or(true, |b| count > b.inliers) {
            needed = required_iterations(count as f64 / n as f64, params.confidence, cap);
            best = Some(HomographyFit {
                matrix: h,
                inlier_mask: mask,
                inliers: count,
            });
            if count == n {
                break;
            }
        }
    }

    let mut best = best?;
    if best.inliers >= SAMPLE_SIZE {
        let (in_src, in_dst): (Vec<Point>, Vec<Point>) = src
            .iter()
            .zip(dst)
            .zip(&best.inlier_mask)
            .filter(|(_, &keep)| keep)
            .map(|((s, d), _)| (*s, *d))
            .unzip();
        if let Some(h) = fit_homography(&in_src, &in_dst) {
            let (mask, count) = score(&h, src, dst, threshold_sq);
            if count >= best.inliers {
                best = HomographyFit {
                    matrix: h,
                    inlier_mask: mask,
                    inliers: count,
                };
            }
        }
    }
    Some(best)
}
