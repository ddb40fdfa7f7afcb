//! Zero-mean normalized cross-correlation kernels.
//!
//! A `TemplatePlan` holds the zero-mean template and its energy; scans slide it
//! over every valid placement in an image and keep the best-scoring one. The
//! score at a placement is
//! `sum(t' * i) / sqrt(sum(t'^2) * (sum(i^2) - sum(i)^2 / n))`, so it is
//! invariant to affine intensity changes of either input and lies in [-1, 1].

use crate::image::ImageView;
use crate::util::{ProdMatchError, ProdMatchResult};

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;

/// Windows with variance at or below this energy score 0.
const MIN_VARIANCE: f64 = 1e-8;

/// Best placement of a template inside an image (top-left coordinates).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub x: usize,
    pub y: usize,
    pub score: f32,
}

impl Peak {
    /// Returns `true` when `self` should replace `other` as the best peak.
    ///
    /// Higher scores win; equal scores keep the lower row, then lower column.
    pub(crate) fn beats(&self, other: &Peak) -> bool {
        match self.score.total_cmp(&other.score) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => (self.y, self.x) < (other.y, other.x),
        }
    }
}

/// Precomputed zero-mean template for ZNCC scans.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    zero_mean: Vec<f32>,
    energy: f64,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, f32>) -> ProdMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width * height;

        let mut sum = 0.0f64;
        for y in 0..height {
            let row = tpl.row(y).ok_or(ProdMatchError::BufferTooSmall {
                needed: (y + 1) * tpl.stride(),
                got: tpl.as_slice().len(),
            })?;
            sum += row.iter().map(|&v| f64::from(v)).sum::<f64>();
        }
        let mean = sum / count as f64;

        let mut zero_mean = Vec::with_capacity(count);
        let mut energy = 0.0f64;
        for y in 0..height {
            if let Some(row) = tpl.row(y) {
                for &v in row {
                    let d = f64::from(v) - mean;
                    energy += d * d;
                    zero_mean.push(d as f32);
                }
            }
        }

        Ok(Self {
            width,
            height,
            zero_mean,
            energy,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `true` when the template has no intensity variation.
    pub fn is_flat(&self) -> bool {
        self.energy <= MIN_VARIANCE
    }

    /// Number of valid placements along each axis, or an error when the
    /// template does not fit.
    pub(crate) fn placements(&self, image: ImageView<'_, f32>) -> ProdMatchResult<(usize, usize)> {
        if image.width() < self.width || image.height() < self.height {
            return Err(ProdMatchError::RoiOutOfBounds {
                x: 0,
                y: 0,
                width: self.width,
                height: self.height,
                img_width: image.width(),
                img_height: image.height(),
            });
        }
        Ok((
            image.width() - self.width + 1,
            image.height() - self.height + 1,
        ))
    }

    /// ZNCC score with the template's top-left corner at `(x, y)`.
    ///
    /// The caller guarantees the placement is valid.
    pub(crate) fn score_at(&self, image: ImageView<'_, f32>, x: usize, y: usize) -> f32 {
        if self.is_flat() {
            return 0.0;
        }
        let mut dot = 0.0f64;
        let mut sum_i = 0.0f64;
        let mut sum_i2 = 0.0f64;
        for ty in 0..self.height {
            let Some(row) = image.row(y + ty) else {
                return 0.0;
            };
            let tpl_row = &self.zero_mean[ty * self.width..(ty + 1) * self.width];
            for (&t, &v) in tpl_row.iter().zip(&row[x..x + self.width]) {
                let v = f64::from(v);
                dot += f64::from(t) * v;
                sum_i += v;
                sum_i2 += v * v;
            }
        }
        let n = (self.width * self.height) as f64;
        let var_i = sum_i2 - sum_i * sum_i / n;
        if var_i <= MIN_VARIANCE {
            return 0.0;
        }
        let score = dot / (self.energy * var_i).sqrt();
        if score.is_finite() {
            score.clamp(-1.0, 1.0) as f32
        } else {
            0.0
        }
    }
}

/// Finds the best placement of `template` inside `image`.
///
/// Uses the row-parallel scan when the `rayon` feature is enabled.
pub fn best_match(image: ImageView<'_, f32>, template: ImageView<'_, f32>) -> ProdMatchResult<Peak> {
    let plan = TemplatePlan::from_view(template)?;
    #[cfg(feature = "rayon")]
    {
        self::rayon::scan_best_par(image, &plan)
    }
    #[cfg(not(feature = "rayon"))]
    {
        scalar::scan_best(image, &plan)
    }
}

#[cfg(test)]
mod tests {
    use super::{best_match, Peak, TemplatePlan};
    use crate::image::ImageView;

    fn ramp(width: usize, height: usize) -> Vec<f32> {
        (0..width * height)
            .map(|i| {
                let (x, y) = ((i % width) as u32, (i / width) as u32);
                let h = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503).rotate_left(13);
                (h.wrapping_mul(2_246_822_519) >> 24) as f32
            })
            .collect()
    }

    #[test]
    fn identical_inputs_score_one() {
        let data = ramp(12, 9);
        let view = ImageView::from_slice(&data, 12, 9).unwrap();
        let peak = best_match(view, view).unwrap();
        assert_eq!((peak.x, peak.y), (0, 0));
        assert!((peak.score - 1.0).abs() < 1e-5, "score {}", peak.score);
    }

    #[test]
    fn finds_embedded_template() {
        let data = ramp(20, 16);
        let image = ImageView::from_slice(&data, 20, 16).unwrap();
        let tpl = image.roi(6, 4, 7, 5).unwrap().to_owned_image();
        let peak = best_match(image, tpl.view()).unwrap();
        assert_eq!((peak.x, peak.y), (6, 4));
        assert!(peak.score > 0.999);
    }

    #[test]
    fn affine_intensity_change_keeps_score() {
        let data = ramp(10, 10);
        let scaled: Vec<f32> = data.iter().map(|v| v * 3.0 - 7.0).collect();
        let a = ImageView::from_slice(&data, 10, 10).unwrap();
        let b = ImageView::from_slice(&scaled, 10, 10).unwrap();
        let peak = best_match(a, b).unwrap();
        assert!((peak.score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn flat_template_scores_zero() {
        let data = ramp(8, 8);
        let flat = vec![5.0f32; 9];
        let image = ImageView::from_slice(&data, 8, 8).unwrap();
        let tpl = ImageView::from_slice(&flat, 3, 3).unwrap();
        assert!(TemplatePlan::from_view(tpl).unwrap().is_flat());
        assert_eq!(best_match(image, tpl).unwrap().score, 0.0);
    }

    #[test]
    fn oversized_template_is_rejected() {
        let small = vec![1.0f32; 4];
        let big = ramp(3, 3);
        let image = ImageView::from_slice(&small, 2, 2).unwrap();
        let tpl = ImageView::from_slice(&big, 3, 3).unwrap();
        assert!(best_match(image, tpl).is_err());
    }

    #[test]
    fn ties_prefer_top_left() {
        let a = Peak { x: 3, y: 1, score: 0.5 };
        let b = Peak { x: 0, y: 2, score: 0.5 };
        assert!(a.beats(&b));
        assert!(!b.beats(&a));
    }
}
