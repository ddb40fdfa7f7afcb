//! Error types for prodmatch.

use thiserror::Error;

/// Result alias for prodmatch operations.
pub type ProdMatchResult<T> = std::result::Result<T, ProdMatchError>;

/// Errors that can occur while loading images or running the matchers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProdMatchError {
    /// An image file or buffer could not be read or decoded.
    #[error("failed to load image {path}: {reason}")]
    ImageLoad { path: String, reason: String },
    /// The feature detector found no descriptors in an image.
    #[error("no features detected")]
    NoFeatures,
    /// The configuration is malformed or holds an out-of-range value.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Width or height is zero or would overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer does not hold enough elements.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Region of interest does not fit inside the image.
    #[error(
        "roi ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height} image"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Filesystem access failed.
    #[error("io error at {path}: {reason}")]
    Io { path: String, reason: String },
    /// The batch report could not be serialized.
    #[error("report serialization failed: {0}")]
    Report(String),
}

impl ProdMatchError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        ProdMatchError::Io {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }
}
