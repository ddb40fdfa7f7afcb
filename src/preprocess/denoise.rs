//! Edge-preserving bilateral filter on RGB8 images.

use crate::image::ImageBuffer;
use crate::util::ProdMatchResult;

/// Bilateral filter parameters.
#[derive(Clone, Copy, Debug)]
pub struct BilateralParams {
    /// Neighborhood radius in pixels.
    pub radius: usize,
    /// Spatial Gaussian sigma in pixels.
    pub sigma_space: f32,
    /// Range Gaussian sigma in RGB units (Euclidean over the three channels).
    pub sigma_color: f32,
}

impl Default for BilateralParams {
    fn default() -> Self {
        Self {
            radius: 2,
            sigma_space: 2.0,
            sigma_color: 20.0,
        }
    }
}

/// Smooths flat regions while keeping edges whose color step is large
/// relative to `sigma_color`.
pub fn bilateral_rgb(img: &ImageBuffer, params: BilateralParams) -> ProdMatchResult<ImageBuffer> {
    let width = img.width();
    let height = img.height();
    let r = params.radius as isize;
    let space_coeff = -0.5 / (params.sigma_space * params.sigma_space);
    let color_coeff = -0.5 / (params.sigma_color * params.sigma_color);

    let side = 2 * params.radius + 1;
    let mut space_weights = Vec::with_capacity(side * side);
    for dy in -r..=r {
        for dx in -r..=r {
            let d2 = (dx * dx + dy * dy) as f32;
            space_weights.push((d2 * space_coeff).exp());
        }
    }

    let src = img.as_raw();
    let mut out = Vec::with_capacity(src.len());
    for y in 0..height {
        for x in 0..width {
            let center = img.pixel(x, y);
            let mut acc = [0.0f32; 3];
            let mut total = 0.0f32;
            let mut k = 0usize;
            for dy in -r..=r {
                let sy = (y as isize + dy).clamp(0, height as isize - 1) as usize;
                for dx in -r..=r {
                    let sx = (x as isize + dx).clamp(0, width as isize - 1) as usize;
                    let idx = (sy * width + sx) * 3;
                    let px = [src[idx], src[idx + 1], src[idx + 2]];
                    let mut d2 = 0.0f32;
                    for c in 0..3 {
                        let d = f32::from(px[c]) - f32::from(center[c]);
                        d2 += d * d;
                    }
                    let w = space_weights[k] * (d2 * color_coeff).exp();
                    k += 1;
                    for c in 0..3 {
                        acc[c] += w * f32::from(px[c]);
                    }
                    total += w;
                }
            }
            for value in acc {
                out.push((value / total).round().clamp(0.0, 255.0) as u8);
            }
        }
    }
    ImageBuffer::from_raw(out, width, height)
}

#[cfg(test)]
mod tests {
    use super::{bilateral_rgb, BilateralParams};
    use crate::image::ImageBuffer;

    #[test]
    fn flat_image_is_unchanged() {
        let img = ImageBuffer::from_fn(9, 7, |_, _| [40, 120, 200]).unwrap();
        let out = bilateral_rgb(&img, BilateralParams::default()).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn strong_edges_survive() {
        let img = ImageBuffer::from_fn(12, 6, |x, _| if x < 6 { [0, 0, 0] } else { [255, 255, 255] })
            .unwrap();
        let out = bilateral_rgb(&img, BilateralParams::default()).unwrap();
        assert_eq!(out.pixel(5, 3), [0, 0, 0]);
        assert_eq!(out.pixel(6, 3), [255, 255, 255]);
    }
}
