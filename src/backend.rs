//! Image-processing primitives behind a swappable backend.
//!
//! Every pixel operation the matching pipeline performs goes through
//! [`VisionBackend`]. [`NativeBackend`] is the bundled pure-Rust
//! implementation; an engine can be built over any other type that provides
//! the same primitives (for example an OpenCV binding).

use crate::features::{self, DescriptorMatch, Features, OrbParams};
use crate::geometry::{self, HomographyFit, Point, RansacParams};
use crate::image::color::{self, Hsv8};
use crate::image::{io, resize, GrayImage, ImageBuffer, ImageView};
use crate::kernel::{self, Peak};
use crate::preprocess::clahe::{self, ClaheParams};
use crate::preprocess::denoise::{self, BilateralParams};
use crate::util::ProdMatchResult;
use palette::Lab;
use std::path::Path;

/// Primitive operations used by the preprocessor, the color gate and the
/// detectors.
///
/// Implementations must be deterministic: the same inputs give the same
/// outputs on every call.
pub trait VisionBackend: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Decodes an encoded PNG or JPEG buffer; `label` names the source in
    /// errors.
    fn decode(&self, bytes: &[u8], label: &str) -> ProdMatchResult<ImageBuffer>;

    /// Reads and decodes an image file.
    fn load(&self, path: &Path) -> ProdMatchResult<ImageBuffer>;

    /// Luma conversion.
    fn to_gray(&self, img: &ImageBuffer) -> GrayImage;

    /// Area-weighted grayscale resize.
    fn resize_area(&self, img: ImageView<'_, u8>, width: usize, height: usize)
        -> ProdMatchResult<GrayImage>;

    /// Bilinear grayscale resize.
    fn resize_linear(
        &self,
        img: ImageView<'_, u8>,
        width: usize,
        height: usize,
    ) -> ProdMatchResult<GrayImage>;

    /// Color resize.
    fn resize_rgb(&self, img: &ImageBuffer, width: usize, height: usize)
        -> ProdMatchResult<ImageBuffer>;

    /// Per-pixel 8-bit HSV, row-major.
    fn to_hsv(&self, img: &ImageBuffer) -> Vec<Hsv8>;

    /// Per-pixel CIE L*a*b*, row-major.
    fn to_lab(&self, img: &ImageBuffer) -> Vec<Lab>;

    /// Rebuilds an RGB image from row-major Lab pixels.
    fn from_lab(&self, lab: &[Lab], width: usize, height: usize) -> ProdMatchResult<ImageBuffer>;

    /// Edge-preserving smoothing.
    fn denoise(&self, img: &ImageBuffer) -> ProdMatchResult<ImageBuffer>;

    /// Local contrast equalization of one 8-bit channel.
    fn equalize_local(&self, channel: &GrayImage) -> ProdMatchResult<GrayImage>;

    /// Oriented keypoints with binary descriptors.
    fn detect_and_compute(
        &self,
        gray: ImageView<'_, u8>,
        params: &OrbParams,
    ) -> ProdMatchResult<Features>;

    /// `k` nearest train descriptors per query descriptor by Hamming distance.
    fn knn_match(
        &self,
        query: &[features::Descriptor],
        train: &[features::Descriptor],
        k: usize,
    ) -> Vec<Vec<DescriptorMatch>>;

    /// Robust homography `dst ~ H * src`.
    fn find_homography(
        &self,
        src: &[Point],
        dst: &[Point],
        params: &RansacParams,
    ) -> Option<HomographyFit>;

    /// Best ZNCC placement of `template` inside `image`.
    fn match_template(
        &self,
        image: ImageView<'_, f32>,
        template: ImageView<'_, f32>,
    ) -> ProdMatchResult<Peak>;
}

/// Pure-Rust backend built from this crate's modules.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeBackend {
    pub bilateral: BilateralParams,
    pub clahe: ClaheParams,
}

impl VisionBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn decode(&self, bytes: &[u8], label: &str) -> ProdMatchResult<ImageBuffer> {
        io::decode_bytes(bytes, label)
    }

    fn load(&self, path: &Path) -> ProdMatchResult<ImageBuffer> {
        io::load_image(path)
    }

    fn to_gray(&self, img: &ImageBuffer) -> GrayImage {
        img.to_gray()
    }

    fn resize_area(
        &self,
        img: ImageView<'_, u8>,
        width: usize,
        height: usize,
    ) -> ProdMatchResult<GrayImage> {
        resize::resize_area(img, width, height)
    }

    fn resize_linear(
        &self,
        img: ImageView<'_, u8>,
        width: usize,
        height: usize,
    ) -> ProdMatchResult<GrayImage> {
        resize::resize_bilinear(img, width, height)
    }

    fn resize_rgb(
        &self,
        img: &ImageBuffer,
        width: usize,
        height: usize,
    ) -> ProdMatchResult<ImageBuffer> {
        resize::resize_rgb(img, width, height)
    }

    fn to_hsv(&self, img: &ImageBuffer) -> Vec<Hsv8> {
        img.pixels().map(color::rgb_to_hsv8).collect()
    }

    fn to_lab(&self, img: &ImageBuffer) -> Vec<Lab> {
        img.pixels().map(color::rgb_to_lab).collect()
    }

    fn from_lab(&self, lab: &[Lab], width: usize, height: usize) -> ProdMatchResult<ImageBuffer> {
        let data = lab.iter().flat_map(|&px| color::lab_to_rgb(px)).collect();
        ImageBuffer::from_raw(data, width, height)
    }

    fn denoise(&self, img: &ImageBuffer) -> ProdMatchResult<ImageBuffer> {
        denoise::bilateral_rgb(img, self.bilateral)
    }

    fn equalize_local(&self, channel: &GrayImage) -> ProdMatchResult<GrayImage> {
        clahe::clahe(channel, self.clahe)
    }

    fn detect_and_compute(
        &self,
        gray: ImageView<'_, u8>,
        params: &OrbParams,
    ) -> ProdMatchResult<Features> {
        features::detect_and_compute(gray, params)
    }

    fn knn_match(
        &self,
        query: &[features::Descriptor],
        train: &[features::Descriptor],
        k: usize,
    ) -> Vec<Vec<DescriptorMatch>> {
        features::knn_match(query, train, k)
    }

    fn find_homography(
        &self,
        src: &[Point],
        dst: &[Point],
        params: &RansacParams,
    ) -> Option<HomographyFit> {
        geometry::fit_homography_ransac(src, dst, params)
    }

    fn match_template(
        &self,
        image: ImageView<'_, f32>,
        template: ImageView<'_, f32>,
    ) -> ProdMatchResult<Peak> {
        kernel::best_match(image, template)
    }
}
