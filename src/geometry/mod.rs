//! Planar geometry: homography estimation and robust fitting.

mod homography;
mod ransac;

pub use homography::{fit_homography, project, transfer_error_sq};
pub use ransac::{fit_homography_ransac, HomographyFit, RansacParams};

/// 2D point in pixel coordinates.
pub type Point = nalgebra::Point2<f64>;
