//! ORB-style detection and description.

use crate::features::fast::{detect_fast9, Corner};
use crate::features::{Descriptor, Features, Keypoint, OrbParams, DESCRIPTOR_BYTES};
use crate::image::filter::gaussian_blur;
use crate::image::pyramid::ScalePyramid;
use crate::image::{GrayImage, ImageView};
use crate::util::ProdMatchResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::OnceLock;

/// Radius of the orientation patch.
const HALF_PATCH: isize = 15;
/// Half side of the Harris window.
const HARRIS_HALF_BLOCK: isize = 3;
const HARRIS_K: f64 = 0.04;
/// BRIEF sample offsets stay within this radius before steering.
const PATTERN_RADIUS: i8 = 13;
const PATTERN_SEED: u64 = 0x0b51_7e57;

/// Point-pair sampling pattern, one `[x1, y1, x2, y2]` per descriptor bit.
fn pattern() -> &'static [[i8; 4]] {
    static PATTERN: OnceLock<Vec<[i8; 4]>> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        (0..DESCRIPTOR_BYTES * 8)
            .map(|_| {
                let mut pair = [0i8; 4];
                for v in pair.iter_mut() {
                    *v = rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
                }
                pair
            })
            .collect()
    })
}

/// Keypoint budget per level, geometrically decreasing with scale.
fn level_budgets(n_features: usize, n_levels: usize, scale_factor: f32) -> Vec<usize> {
    let factor = 1.0 / scale_factor as f64;
    let mut budgets = Vec::with_capacity(n_levels);
    let mut desired = if (factor - 1.0).abs() < 1e-9 {
        n_features as f64 / n_levels as f64
    } else {
        n_features as f64 * (1.0 - factor) / (1.0 - factor.powi(n_levels as i32))
    };
    let mut assigned = 0usize;
    for _ in 0..n_levels.saturating_sub(1) {
        let count = desired.round() as usize;
        budgets.push(count);
        assigned += count;
        desired *= factor;
    }
    budgets.push(n_features.saturating_sub(assigned));
    budgets
}

fn harris_response(img: &GrayImage, x: usize, y: usize) -> f32 {
    let mut a = 0.0f64;
    let mut b = 0.0f64;
    let mut c = 0.0f64;
    let px = |xx: isize, yy: isize| f64::from(img.at(xx as usize, yy as usize));
    for dy in -HARRIS_HALF_BLOCK..=HARRIS_HALF_BLOCK {
        for dx in -HARRIS_HALF_BLOCK..=HARRIS_HALF_BLOCK {
            let cx = x as isize + dx;
            let cy = y as isize + dy;
            let ix = (px(cx + 1, cy - 1) + 2.0 * px(cx + 1, cy) + px(cx + 1, cy + 1))
                - (px(cx - 1, cy - 1) + 2.0 * px(cx - 1, cy) + px(cx - 1, cy + 1));
            let iy = (px(cx - 1, cy + 1) + 2.0 * px(cx, cy + 1) + px(cx + 1, cy + 1))
                - (px(cx - 1, cy - 1) + 2.0 * px(cx, cy - 1) + px(cx + 1, cy - 1));
            a += ix * ix;
            b += iy * iy;
            c += ix * iy;
        }
    }
    let det = a * b - c * c;
    let trace = a + b;
    (det - HARRIS_K * trace * trace) as f32
}

fn intensity_centroid_angle(img: &GrayImage, x: usize, y: usize) -> f32 {
    let mut m01 = 0.0f64;
    let mut m10 = 0.0f64;
    for dy in -HALF_PATCH..=HALF_PATCH {
        for dx in -HALF_PATCH..=HALF_PATCH {
            if dx * dx + dy * dy > HALF_PATCH * HALF_PATCH {
                continue;
            }
            let v = f64::from(img.at((x as isize + dx) as usize, (y as isize + dy) as usize));
            m10 += dx as f64 * v;
            m01 += dy as f64 * v;
        }
    }
    m01.atan2(m10) as f32
}

fn steered_brief(smooth: &GrayImage, x: usize, y: usize, angle: f32) -> Descriptor {
    let (sin_a, cos_a) = angle.sin_cos();
    let max_x = smooth.width() as isize - 1;
    let max_y = smooth.height() as isize - 1;
    let sample = |ox: i8, oy: i8| {
        let (ox, oy) = (f32::from(ox), f32::from(oy));
        let rx = (ox * cos_a - oy * sin_a).round() as isize;
        let ry = (ox * sin_a + oy * cos_a).round() as isize;
        let sx = (x as isize + rx).clamp(0, max_x) as usize;
        let sy = (y as isize + ry).clamp(0, max_y) as usize;
        smooth.at(sx, sy)
    };

    let mut descriptor = [0u8; DESCRIPTOR_BYTES];
    for (bit, &[x1, y1, x2, y2]) in pattern().iter().enumerate() {
        if sample(x1, y1) < sample(x2, y2) {
            descriptor[bit / 8] |= 1 << (bit % 8);
        }
    }
    descriptor
}

fn describe_level(
    level: &GrayImage,
    scale: f32,
    octave: usize,
    budget: usize,
    params: &OrbParams,
) -> ProdMatchResult<Features> {
    let mut features = Features::default();
    if budget == 0 {
        return Ok(features);
    }
    let border = params.edge_threshold.max((HALF_PATCH + 1) as usize);
    let corners = detect_fast9(level, params.fast_threshold, border);
    if corners.is_empty() {
        return Ok(features);
    }

    let mut ranked: Vec<(Corner, f32)> = corners
        .into_iter()
        .map(|corner| (corner, harris_response(level, corner.x, corner.y)))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then_with(|| a.0.y.cmp(&b.0.y))
            .then_with(|| a.0.x.cmp(&b.0.x))
    });
    ranked.truncate(budget);

    let smooth = gaussian_blur(level, 3, 2.0)?;
    for (corner, response) in ranked {
        let angle = intensity_centroid_angle(level, corner.x, corner.y);
        features.keypoints.push(Keypoint {
            x: corner.x as f32 * scale,
            y: corner.y as f32 * scale,
            angle,
            response,
            octave,
        });
        features
            .descriptors
            .push(steered_brief(&smooth, corner.x, corner.y, angle));
    }
    Ok(features)
}

/// Detects oriented keypoints and computes their binary descriptors.
///
/// Returns an empty set for images without usable texture.
pub fn detect_and_compute(image: ImageView<'_, u8>, params: &OrbParams) -> ProdMatchResult<Features> {
    let min_side = 2 * params.edge_threshold.max((HALF_PATCH + 1) as usize) + 1;
    if image.width() < min_side || image.height() < min_side {
        return Ok(Features::default());
    }
    let pyramid = ScalePyramid::build(image, params.n_levels, params.scale_factor, min_side)?;
    let budgets = level_budgets(params.n_features, pyramid.levels().len(), params.scale_factor);

    let describe = |(octave, level): (usize, &crate::image::pyramid::PyramidLevel)| {
        describe_level(&level.image, level.scale, octave, budgets[octave], params)
    };

    #[cfg(feature = "rayon")]
    let per_level: Vec<ProdMatchResult<Features>> = {
        use rayon::prelude::*;
        pyramid.levels().par_iter().enumerate().map(describe).collect()
    };
    #[cfg(not(feature = "rayon"))]
    let per_level: Vec<ProdMatchResult<Features>> =
        pyramid.levels().iter().enumerate().map(describe).collect();

    let mut all = Features::default();
    for level in per_level {
        let level = level?;
        all.keypoints.extend(level.keypoints);
        all.descriptors.extend(level.descriptors);
    }
    Ok(all)
}
