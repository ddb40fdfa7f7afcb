#![allow(dead_code)]

use prodmatch::image::io::save_png;
use palette::{Hsv, IntoColor, ShiftHue, Srgb};
use prodmatch::{Config, ImageBuffer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// Saturated colors; every entry changes under a hue shift.
const PALETTE: [[u8; 3]; 8] = [
    [220, 40, 40],
    [40, 180, 60],
    [40, 70, 210],
    [230, 200, 30],
    [200, 50, 190],
    [30, 190, 200],
    [240, 130, 20],
    [120, 40, 200],
];

/// A collage of overlapping colored rectangles on a colored background.
pub fn product(seed: u64, background: usize, width: usize, height: usize) -> ImageBuffer {
    let mut rng = StdRng::seed_from_u64(seed);
    let background = PALETTE[background % PALETTE.len()];
    let rects: Vec<(usize, usize, usize, usize, [u8; 3])> = (0..48)
        .map(|_| {
            let w = rng.random_range(10..width / 4);
            let h = rng.random_range(10..height / 4);
            let x = rng.random_range(0..width - w);
            let y = rng.random_range(0..height - h);
            (x, y, w, h, PALETTE[rng.random_range(0..PALETTE.len())])
        })
        .collect();
    ImageBuffer::from_fn(width, height, |px, py| {
        rects
            .iter()
            .rev()
            .find(|&&(x, y, w, h, _)| px >= x && px < x + w && py >= y && py < y + h)
            .map_or(background, |r| r.4)
    })
    .unwrap()
}

/// Default test product.
pub fn sample_product() -> ImageBuffer {
    product(7, 0, 240, 240)
}

/// Same layout with every hue shifted by `degrees` in HSV space.
pub fn hue_shifted(img: &ImageBuffer, degrees: f32) -> ImageBuffer {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.pixel(x, y);
        let hsv: Hsv = Srgb::new(r, g, b).into_format::<f32>().into_color();
        let shifted: Srgb = hsv.shift_hue(degrees).into_color();
        let out: Srgb<u8> = shifted.into_format();
        [out.red, out.green, out.blue]
    })
    .unwrap()
}

/// Rotates by `degrees` about the center with bilinear sampling; samples
/// outside the source clamp to the nearest edge pixel.
pub fn rotated(img: &ImageBuffer, degrees: f32) -> ImageBuffer {
    let (w, h) = (img.width(), img.height());
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (cx, cy) = ((w as f32 - 1.0) / 2.0, (h as f32 - 1.0) / 2.0);
    let clamp = |v: f32, max: usize| v.clamp(0.0, (max - 1) as f32);
    ImageBuffer::from_fn(w, h, |x, y| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let sx = clamp(cos * dx + sin * dy + cx, w);
        let sy = clamp(-sin * dx + cos * dy + cy, h);
        let (x0, y0) = (sx.floor() as usize, sy.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
        let (fx, fy) = (sx - x0 as f32, sy - y0 as f32);
        let (p00, p10) = (img.pixel(x0, y0), img.pixel(x1, y0));
        let (p01, p11) = (img.pixel(x0, y1), img.pixel(x1, y1));
        std::array::from_fn(|c| {
            let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
            let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
            (top * (1.0 - fy) + bottom * fy).round() as u8
        })
    })
    .unwrap()
}

/// Uniformly brightened copy.
pub fn brightened(img: &ImageBuffer, delta: u8) -> ImageBuffer {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        img.pixel(x, y).map(|c| c.saturating_add(delta))
    })
    .unwrap()
}

pub fn flat(width: usize, height: usize, value: u8) -> ImageBuffer {
    ImageBuffer::from_fn(width, height, |_, _| [value; 3]).unwrap()
}

pub fn write_png(dir: &Path, name: &str, img: &ImageBuffer) -> PathBuf {
    let path = dir.join(name);
    save_png(img, &path).unwrap();
    path
}

/// Configuration whose color gate accepts any pair.
pub fn open_gate_config() -> Config {
    let mut config = Config::default();
    config.color_gate.hsv_corr_min = -1.0;
    config.color_gate.delta_e50_max = 1000.0;
    config.color_gate.chromatic_saturation_min = 0.0;
    config
}
