//! Image buffers and views.
//!
//! `ImageBuffer` is the owned RGB8 pixel grid that flows through the matching
//! pipeline. Single-channel data (grayscale, normalized floats) lives in
//! `OwnedImage<T>`, and `ImageView` is a borrowed 2D view into a 1D buffer with
//! an explicit stride. The stride counts elements between the starts of
//! consecutive rows, so a stride larger than the width represents padded rows.
//! ROI slices are zero-copy views into the same backing slice and retain the
//! original stride.

use crate::util::{ProdMatchError, ProdMatchResult};

pub mod color;
pub mod filter;
pub mod io;
pub mod pyramid;
pub mod resize;

/// Owned grayscale image.
pub type GrayImage = OwnedImage<u8>;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> ProdMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> ProdMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(ProdMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy ROI view into the same backing buffer.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> ProdMatchResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(ProdMatchError::InvalidDimensions { width, height });
        }
        let out_of_bounds = ProdMatchError::RoiOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(x))
            .ok_or(ProdMatchError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self
            .data
            .get(start..)
            .ok_or(ProdMatchError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        ImageView::new(data, width, height, self.stride)
    }
}

impl<T: Copy> ImageView<'_, T> {
    /// Copies the view into a contiguous owned image.
    pub fn to_owned_image(&self) -> OwnedImage<T> {
        let mut data = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            let start = y * self.stride;
            data.extend_from_slice(&self.data[start..start + self.width]);
        }
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> ProdMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(ProdMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(ProdMatchError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(ProdMatchError::InvalidDimensions { width, height })?;
    Ok(needed)
}

/// Owned contiguous single-channel image.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> OwnedImage<T> {
    /// Creates an image from a row-major buffer of exactly `width * height`
    /// elements.
    pub fn new(data: Vec<T>, width: usize, height: usize) -> ProdMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ProdMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(ProdMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(ProdMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(ProdMatchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major pixel buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, T> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}

impl<T: Copy> OwnedImage<T> {
    /// Returns the pixel at `(x, y)`; panics when out of bounds.
    #[inline]
    pub(crate) fn at(&self, x: usize, y: usize) -> T {
        self.data[y * self.width + x]
    }
}

/// Owned, decoded RGB8 pixel grid.
///
/// Produced by the preprocessor and never mutated afterwards; every stage that
/// changes pixels returns a new buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl ImageBuffer {
    /// Wraps an interleaved RGB8 buffer of exactly `width * height * 3` bytes.
    pub fn from_raw(data: Vec<u8>, width: usize, height: usize) -> ProdMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ProdMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or(ProdMatchError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(ProdMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Builds an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> [u8; 3],
    ) -> ProdMatchResult<Self> {
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::from_raw(data, width, height)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the interleaved RGB8 bytes.
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Returns the RGB triple at `(x, y)`; panics when out of bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Iterates over RGB triples in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|px| [px[0], px[1], px[2]])
    }

    /// Copies a rectangular region into a new buffer.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> ProdMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ProdMatchError::InvalidDimensions { width, height });
        }
        if x + width > self.width || y + height > self.height {
            return Err(ProdMatchError::RoiOutOfBounds {
                x,
                y,
                width,
                height,
                img_width: self.width,
                img_height: self.height,
            });
        }
        let mut data = Vec::with_capacity(width * height * 3);
        for row in y..y + height {
            let start = (row * self.width + x) * 3;
            data.extend_from_slice(&self.data[start..start + width * 3]);
        }
        Self::from_raw(data, width, height)
    }

    /// Keeps `[floor(f * d), floor((1 - f) * d))` along each axis, dropping a
    /// margin of fraction `f` on every side.
    pub fn crop_margin(&self, fraction: f64) -> ProdMatchResult<Self> {
        let span = |extent: usize| {
            let start = (extent as f64 * fraction) as usize;
            let end = (extent as f64 * (1.0 - fraction)) as usize;
            (start, end.saturating_sub(start))
        };
        let (x0, w) = span(self.width);
        let (y0, h) = span(self.height);
        self.crop(x0, y0, w, h)
    }

    /// Converts to luma with ITU-R BT.601 weights.
    pub fn to_gray(&self) -> GrayImage {
        let data = self
            .pixels()
            .map(|[r, g, b]| {
                let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
                luma.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        OwnedImage {
            data,
            width: self.width,
            height: self.height,
        }
    }
}
