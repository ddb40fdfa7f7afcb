//! Color gate: cheap rejection of hue and tone mismatches.
//!
//! Both images are reduced to their central 60%. Hue (36 bins over `[0, 180)`)
//! and saturation (16 bins over `[0, 256)`) histograms are L2-normalized,
//! concatenated and compared by Pearson correlation. Independently, the median
//! CIE76 delta-E in 8-bit Lab units (L* scaled to `[0, 255]`) is taken over
//! pixels that are chromatic in both crops. A pair
//! passes only when the correlation is high enough and the median delta-E is
//! small enough; a pair without shared chromatic pixels never passes.

use crate::backend::VisionBackend;
use crate::config::ColorGateConfig;
use crate::image::color::{delta_e76_8bit, Hsv8};
use crate::image::ImageBuffer;
use crate::util::math::{l2_normalize, median_in_place, pearson};
use crate::util::ProdMatchResult;
use serde::Serialize;

const HUE_BINS: usize = 36;
const SAT_BINS: usize = 16;
const HUE_RANGE: usize = 180;
const SAT_RANGE: usize = 256;
const CENTER_START: f64 = 0.2;
const CENTER_END: f64 = 0.8;

/// Median delta-E reported when the crops share no chromatic pixel.
pub const NO_CHROMATIC_DELTA_E: f32 = 999.0;

/// Outcome of the color gate for one pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorGateVerdict {
    /// Pearson correlation of the hue/saturation descriptors, in `[-1, 1]`.
    pub histogram_correlation: f32,
    /// Median 8-bit Lab delta-E over shared chromatic pixels.
    pub median_delta_e: f32,
    pub passed: bool,
}

/// Crops `[floor(0.2 * d), floor(0.8 * d))` along both axes.
pub fn center_crop(img: &ImageBuffer) -> ProdMatchResult<ImageBuffer> {
    let span = |extent: usize| {
        let start = (extent as f64 * CENTER_START) as usize;
        let end = (extent as f64 * CENTER_END) as usize;
        (start, end.saturating_sub(start))
    };
    let (x0, w) = span(img.width());
    let (y0, h) = span(img.height());
    img.crop(x0, y0, w, h)
}

fn quantize_hue(px: &Hsv8) -> usize {
    (px.h.round() as usize) % HUE_RANGE
}

fn quantize_sat(px: &Hsv8) -> usize {
    (px.s.round() as usize).min(SAT_RANGE - 1)
}

/// Concatenated, separately L2-normalized hue and saturation histograms.
pub fn hue_saturation_descriptor(hsv: &[Hsv8]) -> Vec<f32> {
    let mut hue = [0.0f32; HUE_BINS];
    let mut sat = [0.0f32; SAT_BINS];
    for px in hsv {
        hue[quantize_hue(px) * HUE_BINS / HUE_RANGE] += 1.0;
        sat[quantize_sat(px) * SAT_BINS / SAT_RANGE] += 1.0;
    }
    l2_normalize(&mut hue);
    l2_normalize(&mut sat);
    hue.iter().chain(sat.iter()).copied().collect()
}

/// Evaluates the gate on two preprocessed images.
pub fn evaluate<B: VisionBackend>(
    backend: &B,
    config: &ColorGateConfig,
    query: &ImageBuffer,
    candidate: &ImageBuffer,
) -> ProdMatchResult<ColorGateVerdict> {
    let query = center_crop(query)?;
    let mut candidate = center_crop(candidate)?;

    let query_hsv = backend.to_hsv(&query);
    let mut candidate_hsv = backend.to_hsv(&candidate);
    let histogram_correlation = pearson(
        &hue_saturation_descriptor(&query_hsv),
        &hue_saturation_descriptor(&candidate_hsv),
    );

    if (candidate.width(), candidate.height()) != (query.width(), query.height()) {
        candidate = backend.resize_rgb(&candidate, query.width(), query.height())?;
        candidate_hsv = backend.to_hsv(&candidate);
    }
    let query_lab = backend.to_lab(&query);
    let candidate_lab = backend.to_lab(&candidate);

    let min_sat = config.chromatic_saturation_min;
    let mut distances: Vec<f32> = query_hsv
        .iter()
        .zip(&candidate_hsv)
        .zip(query_lab.iter().zip(&candidate_lab))
        .filter(|((a, b), _)| a.s.round() >= min_sat && b.s.round() >= min_sat)
        .map(|(_, (&la, &lb))| delta_e76_8bit(la, lb))
        .collect();

    let (median_delta_e, has_chroma) = match median_in_place(&mut distances) {
        Some(median) => (median, true),
        None => (NO_CHROMATIC_DELTA_E, false),
    };
    let passed = has_chroma
        && histogram_correlation >= config.hsv_corr_min
        && median_delta_e <= config.delta_e50_max;

    Ok(ColorGateVerdict {
        histogram_correlation,
        median_delta_e,
        passed,
    })
}
