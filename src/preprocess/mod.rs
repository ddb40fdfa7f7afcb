//! Image normalization applied before any comparison.
//!
//! Steps, in order: decode, optional bilateral denoise, optional CLAHE on the
//! CIE L* channel (a* and b* untouched), and removal of a 5% border on every
//! side. The result is the `ImageBuffer` every later stage works on.

pub mod clahe;
pub mod denoise;

use crate::backend::VisionBackend;
use crate::config::PreprocessConfig;
use crate::image::{ImageBuffer, OwnedImage};
use crate::trace::trace_span;
use crate::util::ProdMatchResult;
use std::path::Path;

/// Fraction of width/height dropped from each side.
pub const MARGIN_FRACTION: f64 = 0.05;

/// L* spans [0, 100]; this maps it onto the 8-bit range CLAHE works on.
const L_TO_U8: f32 = 2.55;

/// Applies the configured preprocessing chain through a backend.
pub struct Preprocessor<'a, B: VisionBackend> {
    backend: &'a B,
    config: &'a PreprocessConfig,
}

impl<'a, B: VisionBackend> Preprocessor<'a, B> {
    pub fn new(backend: &'a B, config: &'a PreprocessConfig) -> Self {
        Self { backend, config }
    }

    /// Loads and preprocesses an image file.
    pub fn load(&self, path: &Path) -> ProdMatchResult<ImageBuffer> {
        let _span = trace_span!("preprocess").entered();
        let decoded = self.backend.load(path)?;
        self.process(decoded)
    }

    /// Decodes and preprocesses an encoded image held in memory.
    pub fn decode(&self, bytes: &[u8], label: &str) -> ProdMatchResult<ImageBuffer> {
        let _span = trace_span!("preprocess").entered();
        let decoded = self.backend.decode(bytes, label)?;
        self.process(decoded)
    }

    /// Runs denoise, contrast enhancement and margin crop on a decoded image.
    pub fn process(&self, img: ImageBuffer) -> ProdMatchResult<ImageBuffer> {
        let img = if self.config.denoise {
            self.backend.denoise(&img)?
        } else {
            img
        };
        let img = if self.config.enhance_contrast {
            self.enhance_lightness(&img)?
        } else {
            img
        };
        img.crop_margin(MARGIN_FRACTION)
    }

    fn enhance_lightness(&self, img: &ImageBuffer) -> ProdMatchResult<ImageBuffer> {
        let mut lab = self.backend.to_lab(img);
        let lightness = lab
            .iter()
            .map(|px| (px.l * L_TO_U8).round().clamp(0.0, 255.0) as u8)
            .collect();
        let lightness = OwnedImage::new(lightness, img.width(), img.height())?;
        let equalized = self.backend.equalize_local(&lightness)?;
        for (px, &l) in lab.iter_mut().zip(equalized.data()) {
            px.l = f32::from(l) / L_TO_U8;
        }
        self.backend.from_lab(&lab, img.width(), img.height())
    }
}

#[cfg(test)]
mod tests {
    use super::Preprocessor;
    use crate::backend::NativeBackend;
    use crate::config::PreprocessConfig;
    use crate::image::ImageBuffer;
    use crate::util::ProdMatchError;

    fn plain() -> PreprocessConfig {
        PreprocessConfig {
            denoise: false,
            enhance_contrast: false,
        }
    }

    #[test]
    fn margin_only_pipeline_crops() {
        let backend = NativeBackend::default();
        let config = plain();
        let pre = Preprocessor::new(&backend, &config);
        let img = ImageBuffer::from_fn(200, 100, |x, y| [x as u8, y as u8, 7]).unwrap();
        let out = pre.process(img).unwrap();
        assert_eq!((out.width(), out.height()), (180, 90));
        assert_eq!(out.pixel(0, 0), [10, 5, 7]);
    }

    #[test]
    fn full_pipeline_keeps_gray_neutral() {
        let backend = NativeBackend::default();
        let config = PreprocessConfig::default();
        let pre = Preprocessor::new(&backend, &config);
        let img = ImageBuffer::from_fn(64, 64, |x, y| {
            let v = (60 + (x * 3 + y * 2) % 120) as u8;
            [v, v, v]
        })
        .unwrap();
        let out = pre.process(img).unwrap();
        assert_eq!((out.width(), out.height()), (57, 57));
        for [r, g, b] in out.pixels() {
            assert!(r.abs_diff(g) <= 2 && g.abs_diff(b) <= 2, "tinted pixel {r} {g} {b}");
        }
    }

    #[test]
    fn undecodable_bytes_are_image_load_errors() {
        let backend = NativeBackend::default();
        let config = plain();
        let pre = Preprocessor::new(&backend, &config);
        let err = pre.decode(b"definitely not a png", "junk.png").unwrap_err();
        assert!(matches!(err, ProdMatchError::ImageLoad { ref path, .. } if path == "junk.png"));
    }
}
