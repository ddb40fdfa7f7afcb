//! Scale pyramid for grayscale `u8` images.
//!
//! Each level is the previous one shrunk by `scale_factor` with bilinear
//! sampling; keypoint coordinates found on level `i` map back to the base
//! image by multiplying with `scale(i) = scale_factor^i`. Construction stops
//! early once a level would fall below `min_side` pixels.

use crate::image::resize::resize_bilinear;
use crate::image::{GrayImage, ImageView};
use crate::util::ProdMatchResult;

/// One pyramid level together with its scale relative to the base.
pub struct PyramidLevel {
    /// Level image.
    pub image: GrayImage,
    /// Base-image pixels per level pixel.
    pub scale: f32,
}

/// Owned scale pyramid built from a base level.
pub struct ScalePyramid {
    levels: Vec<PyramidLevel>,
}

impl ScalePyramid {
    /// Builds a pyramid from a base grayscale view.
    ///
    /// `max_levels` is clamped to at least 1 so the base level is always present.
    pub fn build(
        base: ImageView<'_, u8>,
        max_levels: usize,
        scale_factor: f32,
        min_side: usize,
    ) -> ProdMatchResult<Self> {
        let max_levels = max_levels.max(1);
        let mut levels = Vec::with_capacity(max_levels);
        levels.push(PyramidLevel {
            image: base.to_owned_image(),
            scale: 1.0,
        });

        let mut scale = 1.0f32;
        while levels.len() < max_levels {
            scale *= scale_factor;
            let width = (base.width() as f32 / scale).round() as usize;
            let height = (base.height() as f32 / scale).round() as usize;
            if width < min_side || height < min_side {
                break;
            }
            let image = resize_bilinear(base, width, height)?;
            levels.push(PyramidLevel { image, scale });
        }

        Ok(Self { levels })
    }

    /// Returns all pyramid levels (level 0 is the base resolution).
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::ScalePyramid;
    use crate::image::ImageView;

    #[test]
    fn pyramid_stops_at_min_side() {
        let data = vec![7u8; 100 * 80];
        let view = ImageView::from_slice(&data, 100, 80).unwrap();
        let pyramid = ScalePyramid::build(view, 8, 1.2, 40).unwrap();
        let levels = pyramid.levels();
        assert_eq!(levels[0].image.width(), 100);
        assert!(levels.len() < 8);
        for level in levels {
            assert!(level.image.width() >= 40 && level.image.height() >= 40);
        }
        let last = levels.last().unwrap();
        assert!((last.scale - 1.2f32.powi(levels.len() as i32 - 1)).abs() < 1e-4);
    }
}
