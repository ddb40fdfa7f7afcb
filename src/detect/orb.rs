//! Keypoint matching with geometric verification.
//!
//! Descriptors from both images are paired by 2-nearest-neighbor Hamming
//! search and filtered with the ratio test. When at least four good matches
//! remain, a homography is fitted with seeded RANSAC. The decision accepts a
//! pair on a strict path (many good matches and a high inlier ratio) or on a
//! rescue path that tolerates fewer matches when the geometry is convincing.

use crate::backend::VisionBackend;
use crate::config::OrbConfig;
use crate::detect::{DetectorKind, DetectorMetrics, DetectorVerdict};
use crate::features::{Features, OrbParams};
use crate::geometry::{Point, RansacParams};
use crate::image::GrayImage;
use crate::util::{ProdMatchError, ProdMatchResult};
use serde::Serialize;

pub const REASON_NO_FEATURES: &str = "no-features";
pub const REASON_LOW_MATCHES: &str = "orb-low-matches";
pub const REASON_LOW_INLIERS: &str = "orb-low-inliers";

/// Minimum correspondences for a homography.
const MIN_HOMOGRAPHY_MATCHES: usize = 4;

/// Match statistics for one pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrbStats {
    /// Query descriptors that received at least one neighbor.
    pub total_matches: usize,
    /// Matches that passed the ratio test.
    pub good_matches: usize,
    /// Good matches consistent with the fitted homography.
    pub inliers: usize,
    /// `inliers / good_matches`, 0 without a homography.
    pub inlier_ratio: f32,
    pub good_threshold: usize,
    pub inlier_threshold: f32,
}

impl OrbStats {
    pub(crate) fn empty(config: &OrbConfig) -> Self {
        Self {
            total_matches: 0,
            good_matches: 0,
            inliers: 0,
            inlier_ratio: 0.0,
            good_threshold: config.good_match_threshold,
            inlier_threshold: config.inlier_ratio_threshold,
        }
    }
}

/// Accept/reject decision over already measured statistics.
///
/// Returns the failure reason when the pair is rejected.
pub fn decide(stats: &OrbStats, config: &OrbConfig) -> Result<(), &'static str> {
    let strict = stats.good_matches >= config.good_match_threshold
        && stats.inlier_ratio >= config.inlier_ratio_threshold;
    let rescue = stats.inliers >= config.rescue_min_inliers
        || (stats.good_matches >= config.rescue_min_good_matches
            && stats.inlier_ratio >= config.rescue_min_inlier_ratio);
    if strict || rescue {
        Ok(())
    } else if stats.good_matches < config.rescue_min_good_matches {
        Err(REASON_LOW_MATCHES)
    } else {
        Err(REASON_LOW_INLIERS)
    }
}

fn describe<B: VisionBackend>(
    backend: &B,
    gray: &GrayImage,
    params: &OrbParams,
) -> ProdMatchResult<Features> {
    let features = backend.detect_and_compute(gray.view(), params)?;
    if features.is_empty() {
        return Err(ProdMatchError::NoFeatures);
    }
    Ok(features)
}

/// Matches and verifies two feature sets.
pub fn measure<B: VisionBackend>(
    backend: &B,
    config: &OrbConfig,
    query: &Features,
    candidate: &Features,
) -> OrbStats {
    let knn = backend.knn_match(&query.descriptors, &candidate.descriptors, 2);
    let total_matches = knn.iter().filter(|pair| !pair.is_empty()).count();

    let good: Vec<_> = knn
        .iter()
        .filter_map(|pair| match pair.as_slice() {
            [best, second] => {
                let accept = (best.distance as f32) < config.lowe_ratio * second.distance as f32;
                accept.then_some(*best)
            }
            _ => None,
        })
        .collect();

    let mut stats = OrbStats {
        total_matches,
        good_matches: good.len(),
        ..OrbStats::empty(config)
    };
    if good.len() < MIN_HOMOGRAPHY_MATCHES {
        return stats;
    }

    let (src, dst): (Vec<Point>, Vec<Point>) = good
        .iter()
        .map(|m| {
            let q = &query.keypoints[m.query_idx];
            let c = &candidate.keypoints[m.train_idx];
            (
                Point::new(f64::from(q.x), f64::from(q.y)),
                Point::new(f64::from(c.x), f64::from(c.y)),
            )
        })
        .unzip();
    let params = RansacParams {
        reproj_threshold: f64::from(config.ransac_reproj_threshold),
        max_iters: config.ransac_max_iters,
        seed: config.ransac_seed,
        ..RansacParams::default()
    };
    if let Some(fit) = backend.find_homography(&src, &dst, &params) {
        stats.inliers = fit.inliers;
        stats.inlier_ratio = fit.inliers as f32 / good.len() as f32;
    }
    stats
}

pub(crate) fn detect<B: VisionBackend>(
    backend: &B,
    config: &OrbConfig,
    query: &GrayImage,
    candidate: &GrayImage,
) -> ProdMatchResult<DetectorVerdict> {
    let params = OrbParams {
        n_features: config.n_features,
        ..OrbParams::default()
    };
    let features = describe(backend, query, &params)
        .and_then(|q| describe(backend, candidate, &params).map(|c| (q, c)));
    let (query_features, candidate_features) = match features {
        Ok(pair) => pair,
        Err(ProdMatchError::NoFeatures) => {
            return Ok(DetectorVerdict {
                kind: DetectorKind::Orb,
                matched: false,
                metrics: DetectorMetrics::Orb(OrbStats::empty(config)),
                reason: Some(REASON_NO_FEATURES.to_string()),
            });
        }
        Err(err) => return Err(err),
    };

    let stats = measure(backend, config, &query_features, &candidate_features);
    let decision = decide(&stats, config);
    Ok(DetectorVerdict {
        kind: DetectorKind::Orb,
        matched: decision.is_ok(),
        metrics: DetectorMetrics::Orb(stats),
        reason: decision.err().map(str::to_string),
    })
}
