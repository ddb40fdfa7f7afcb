//! Normalized cross-correlation on downscaled grayscale.

use crate::backend::VisionBackend;
use crate::config::NccConfig;
use crate::detect::{DetectorKind, DetectorMetrics, DetectorVerdict};
use crate::image::{GrayImage, OwnedImage};
use crate::util::ProdMatchResult;

/// Guards the division for flat images.
const STD_EPSILON: f64 = 1e-10;

/// Resizes to `width`, keeping the aspect ratio (height truncated, at least 1).
fn resize_to_width<B: VisionBackend>(
    backend: &B,
    gray: &GrayImage,
    width: usize,
) -> ProdMatchResult<GrayImage> {
    let scale = width as f64 / gray.width() as f64;
    let height = ((gray.height() as f64 * scale) as usize).max(1);
    backend.resize_linear(gray.view(), width, height)
}

/// Top `height` rows, shifted to zero mean and scaled to unit variance.
fn standardize(gray: &GrayImage, height: usize) -> ProdMatchResult<OwnedImage<f32>> {
    let width = gray.width();
    let pixels = &gray.data()[..width * height];
    let n = pixels.len() as f64;
    let mean = pixels.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = pixels
        .iter()
        .map(|&v| (f64::from(v) - mean).powi(2))
        .sum::<f64>()
        / n;
    let inv_std = 1.0 / (var.sqrt() + STD_EPSILON);
    let data = pixels
        .iter()
        .map(|&v| ((f64::from(v) - mean) * inv_std) as f32)
        .collect();
    OwnedImage::new(data, width, height)
}

/// Correlation score in `[0, 1]` between two grayscale images.
pub fn correlation<B: VisionBackend>(
    backend: &B,
    query: &GrayImage,
    candidate: &GrayImage,
    resize_width: usize,
) -> ProdMatchResult<f32> {
    let a = resize_to_width(backend, query, resize_width)?;
    let b = resize_to_width(backend, candidate, resize_width)?;
    let height = a.height().min(b.height());
    let a = standardize(&a, height)?;
    let b = standardize(&b, height)?;
    let peak = backend.match_template(a.view(), b.view())?;
    Ok(peak.score.max(0.0))
}

pub(crate) fn detect<B: VisionBackend>(
    backend: &B,
    config: &NccConfig,
    query: &GrayImage,
    candidate: &GrayImage,
) -> ProdMatchResult<DetectorVerdict> {
    let score = correlation(backend, query, candidate, config.resize_width)?;
    Ok(DetectorVerdict {
        kind: DetectorKind::Ncc,
        matched: score >= config.score_threshold,
        metrics: DetectorMetrics::Ncc {
            score,
            threshold: config.score_threshold,
        },
        reason: None,
    })
}
