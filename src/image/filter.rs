//! Separable Gaussian smoothing for grayscale images.

use crate::image::{GrayImage, OwnedImage};
use crate::util::ProdMatchResult;

fn gaussian_kernel(radius: usize, sigma: f32) -> Vec<f32> {
    let coeff = -0.5 / (sigma * sigma);
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (d * d * coeff).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    kernel
}

/// Blurs with a `(2 * radius + 1)`-tap Gaussian, replicating border pixels.
pub fn gaussian_blur(img: &GrayImage, radius: usize, sigma: f32) -> ProdMatchResult<GrayImage> {
    let width = img.width();
    let height = img.height();
    let kernel = gaussian_kernel(radius, sigma);
    let r = radius as isize;

    let mut horizontal = vec![0.0f32; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - r).clamp(0, width as isize - 1) as usize;
                acc += w * f32::from(img.at(sx, y));
            }
            horizontal[y * width + x] = acc;
        }
    }

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - r).clamp(0, height as isize - 1) as usize;
                acc += w * horizontal[sy * width + x];
            }
            out.push(acc.round().clamp(0.0, 255.0) as u8);
        }
    }
    OwnedImage::new(out, width, height)
}
