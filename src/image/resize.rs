//! Grayscale resampling.
//!
//! `resize_area` averages every source pixel that overlaps a destination cell
//! with fractional coverage weights, the right choice when shrinking.
//! `resize_bilinear` samples at pixel centers and is used for upscaling and
//! for the feature pyramid.

use crate::image::{GrayImage, ImageBuffer, ImageView, OwnedImage};
use crate::util::{ProdMatchError, ProdMatchResult};

/// Area-weighted resize of a grayscale view.
pub fn resize_area(
    src: ImageView<'_, u8>,
    dst_width: usize,
    dst_height: usize,
) -> ProdMatchResult<GrayImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(ProdMatchError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }
    if dst_width > src.width() || dst_height > src.height() {
        return resize_bilinear(src, dst_width, dst_height);
    }

    let x_spans = coverage(src.width(), dst_width);
    let y_spans = coverage(src.height(), dst_height);
    let mut out = Vec::with_capacity(dst_width * dst_height);
    for y_span in &y_spans {
        for x_span in &x_spans {
            let mut acc = 0.0f64;
            let mut weight = 0.0f64;
            for &(sy, wy) in y_span {
                let row = src.row(sy).ok_or(ProdMatchError::BufferTooSmall {
                    needed: (sy + 1) * src.stride(),
                    got: src.as_slice().len(),
                })?;
                for &(sx, wx) in x_span {
                    let w = wy * wx;
                    acc += f64::from(row[sx]) * w;
                    weight += w;
                }
            }
            let value = if weight > 0.0 { acc / weight } else { 0.0 };
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }
    OwnedImage::new(out, dst_width, dst_height)
}

/// Per destination index, the source indices it covers and their weights.
fn coverage(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f64)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let lo = start.max(s as f64);
                    let hi = end.min(s as f64 + 1.0);
                    let w = hi - lo;
                    (w > 1e-9).then_some((s, w))
                })
                .collect()
        })
        .collect()
}

/// Bilinear resize of a grayscale view using pixel-center alignment.
pub fn resize_bilinear(
    src: ImageView<'_, u8>,
    dst_width: usize,
    dst_height: usize,
) -> ProdMatchResult<GrayImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(ProdMatchError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }
    let src_width = src.width();
    let src_height = src.height();
    let sx = src_width as f32 / dst_width as f32;
    let sy = src_height as f32 / dst_height as f32;
    let max_x = (src_width - 1) as f32;
    let max_y = (src_height - 1) as f32;

    let mut out = Vec::with_capacity(dst_width * dst_height);
    for y in 0..dst_height {
        let fy = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y);
        let y0 = fy.floor() as usize;
        let y1 = (y0 + 1).min(src_height - 1);
        let wy = fy - y0 as f32;
        let row0 = src.row(y0).ok_or(ProdMatchError::BufferTooSmall {
            needed: (y0 + 1) * src.stride(),
            got: src.as_slice().len(),
        })?;
        let row1 = src.row(y1).ok_or(ProdMatchError::BufferTooSmall {
            needed: (y1 + 1) * src.stride(),
            got: src.as_slice().len(),
        })?;
        for x in 0..dst_width {
            let fx = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x);
            let x0 = fx.floor() as usize;
            let x1 = (x0 + 1).min(src_width - 1);
            let wx = fx - x0 as f32;

            let top = f32::from(row0[x0]) * (1.0 - wx) + f32::from(row0[x1]) * wx;
            let bottom = f32::from(row1[x0]) * (1.0 - wx) + f32::from(row1[x1]) * wx;
            let value = top * (1.0 - wy) + bottom * wy;
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }
    OwnedImage::new(out, dst_width, dst_height)
}

/// Resizes each RGB channel with [`resize_area`].
pub fn resize_rgb(src: &ImageBuffer, dst_width: usize, dst_height: usize) -> ProdMatchResult<ImageBuffer> {
    let mut channels = Vec::with_capacity(3);
    for c in 0..3 {
        let plane: Vec<u8> = src.pixels().map(|px| px[c]).collect();
        let view = ImageView::from_slice(&plane, src.width(), src.height())?;
        channels.push(resize_area(view, dst_width, dst_height)?);
    }
    let mut data = Vec::with_capacity(dst_width * dst_height * 3);
    for i in 0..dst_width * dst_height {
        data.extend(channels.iter().map(|plane| plane.data()[i]));
    }
    ImageBuffer::from_raw(data, dst_width, dst_height)
}
