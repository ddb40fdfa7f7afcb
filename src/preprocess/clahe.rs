//! Contrast-limited adaptive histogram equalization (CLAHE) on one channel.
//!
//! The image is split into a `tiles x tiles` grid; each tile gets a clipped,
//! redistributed histogram turned into a lookup table, and every pixel is
//! mapped by bilinear interpolation between the four nearest tile tables.

use crate::image::{GrayImage, OwnedImage};
use crate::util::ProdMatchResult;

/// CLAHE parameters.
#[derive(Clone, Copy, Debug)]
pub struct ClaheParams {
    /// Histogram clip limit relative to a uniform histogram.
    pub clip_limit: f32,
    /// Tiles per axis.
    pub tiles: usize,
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tiles: 8,
        }
    }
}

fn tile_lut(img: &GrayImage, x0: usize, x1: usize, y0: usize, y1: usize, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[img.at(x, y) as usize] += 1;
        }
    }
    let area = ((x1 - x0) * (y1 - y0)) as u32;

    let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }
    let share = excess / 256;
    let mut residual = excess % 256;
    for bin in hist.iter_mut() {
        *bin += share;
        if residual > 0 {
            *bin += 1;
            residual -= 1;
        }
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    let scale = 255.0 / area.max(1) as f32;
    for (value, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[value] = (cdf as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Applies CLAHE to a single-channel 8-bit image.
pub fn clahe(img: &GrayImage, params: ClaheParams) -> ProdMatchResult<GrayImage> {
    let width = img.width();
    let height = img.height();
    let tiles_x = params.tiles.clamp(1, width);
    let tiles_y = params.tiles.clamp(1, height);

    let bound = |t: usize, tiles: usize, extent: usize| t * extent / tiles;
    let mut luts = Vec::with_capacity(tiles_x * tiles_y);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            luts.push(tile_lut(
                img,
                bound(tx, tiles_x, width),
                bound(tx + 1, tiles_x, width),
                bound(ty, tiles_y, height),
                bound(ty + 1, tiles_y, height),
                params.clip_limit,
            ));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;
    // Tile index pair and interpolation weight toward the second tile.
    let locate = |pos: usize, tile: f32, tiles: usize| {
        let f = (pos as f32 + 0.5) / tile - 0.5;
        let i0 = f.floor().max(0.0) as usize;
        let i0 = i0.min(tiles - 1);
        let i1 = (i0 + 1).min(tiles - 1);
        let w = (f - i0 as f32).clamp(0.0, 1.0);
        (i0, i1, w)
    };

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let (ty0, ty1, wy) = locate(y, tile_h, tiles_y);
        for x in 0..width {
            let (tx0, tx1, wx) = locate(x, tile_w, tiles_x);
            let v = img.at(x, y) as usize;
            let a = f32::from(luts[ty0 * tiles_x + tx0][v]);
            let b = f32::from(luts[ty0 * tiles_x + tx1][v]);
            let c = f32::from(luts[ty1 * tiles_x + tx0][v]);
            let d = f32::from(luts[ty1 * tiles_x + tx1][v]);
            let top = a * (1.0 - wx) + b * wx;
            let bottom = c * (1.0 - wx) + d * wx;
            out.push((top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8);
        }
    }
    OwnedImage::new(out, width, height)
}
