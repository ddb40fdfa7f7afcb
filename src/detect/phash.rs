//! Perceptual hash built from low DCT frequencies.
//!
//! The grayscale image is area-resized to `4n x 4n`, transformed with an
//! orthonormal 2D DCT-II, and the top-left `n x n` coefficients are
//! thresholded against their own mean. Two images match when their hashes
//! differ in at most `hamming_threshold` bits.

use crate::backend::VisionBackend;
use crate::config::PhashConfig;
use crate::detect::{DetectorKind, DetectorMetrics, DetectorVerdict};
use crate::image::GrayImage;
use crate::util::ProdMatchResult;

/// Hash bits, row-major over the low-frequency block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerceptualHash {
    bits: Vec<bool>,
}

impl PerceptualHash {
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of differing bits; hashes of different length differ in the
    /// surplus bits too.
    pub fn hamming(&self, other: &PerceptualHash) -> u32 {
        let common = self
            .bits
            .iter()
            .zip(&other.bits)
            .filter(|(a, b)| a != b)
            .count();
        (common + self.len().abs_diff(other.len())) as u32
    }
}

/// Orthonormal DCT-II basis, `basis[k * n + i] = c(k) cos(pi (2i + 1) k / 2n)`.
fn dct_basis(n: usize) -> Vec<f64> {
    let mut basis = Vec::with_capacity(n * n);
    for k in 0..n {
        let scale = if k == 0 {
            (1.0 / n as f64).sqrt()
        } else {
            (2.0 / n as f64).sqrt()
        };
        for i in 0..n {
            let angle = std::f64::consts::PI * (2 * i + 1) as f64 * k as f64 / (2 * n) as f64;
            basis.push(scale * angle.cos());
        }
    }
    basis
}

/// Top-left `keep x keep` block of the 2D DCT-II of a square image.
fn dct_low_block(pixels: &[u8], n: usize, keep: usize) -> Vec<f64> {
    let basis = dct_basis(n);
    // Row transform, only the kept frequencies.
    let mut rows = vec![0.0f64; n * keep];
    for y in 0..n {
        let row = &pixels[y * n..(y + 1) * n];
        for u in 0..keep {
            let b = &basis[u * n..(u + 1) * n];
            rows[y * keep + u] = row.iter().zip(b).map(|(&p, &w)| f64::from(p) * w).sum();
        }
    }
    let mut block = vec![0.0f64; keep * keep];
    for v in 0..keep {
        let b = &basis[v * n..(v + 1) * n];
        for u in 0..keep {
            block[v * keep + u] = (0..n).map(|y| rows[y * keep + u] * b[y]).sum();
        }
    }
    block
}

/// Computes the perceptual hash of a grayscale image.
pub fn compute<B: VisionBackend>(
    backend: &B,
    gray: &GrayImage,
    hash_size: usize,
) -> ProdMatchResult<PerceptualHash> {
    let side = hash_size * 4;
    let small = backend.resize_area(gray.view(), side, side)?;
    let block = dct_low_block(small.data(), side, hash_size);
    let mean = block.iter().sum::<f64>() / block.len() as f64;
    Ok(PerceptualHash {
        bits: block.iter().map(|&c| c > mean).collect(),
    })
}

pub(crate) fn detect<B: VisionBackend>(
    backend: &B,
    config: &PhashConfig,
    query: &GrayImage,
    candidate: &GrayImage,
) -> ProdMatchResult<DetectorVerdict> {
    let a = compute(backend, query, config.hash_size)?;
    let b = compute(backend, candidate, config.hash_size)?;
    let distance = a.hamming(&b);
    let matched = distance <= config.hamming_threshold;
    Ok(DetectorVerdict {
        kind: DetectorKind::Phash,
        matched,
        metrics: DetectorMetrics::Phash {
            distance: Some(distance),
            threshold: config.hamming_threshold,
        },
        reason: None,
    })
}
