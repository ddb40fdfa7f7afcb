//! Oriented binary keypoint features.
//!
//! `detect_and_compute` runs the ORB-style pipeline: FAST-9 corners on a
//! scale pyramid, Harris ranking with a per-level feature budget, intensity
//! centroid orientation, and a steered 256-bit BRIEF descriptor computed on a
//! smoothed copy of each level. `knn_match` pairs descriptors by Hamming
//! distance.

pub mod fast;
pub mod matcher;
mod orb;

pub use matcher::knn_match;
pub use orb::detect_and_compute;

/// Length of a binary descriptor in bytes.
pub const DESCRIPTOR_BYTES: usize = 32;

/// 256-bit binary descriptor.
pub type Descriptor = [u8; DESCRIPTOR_BYTES];

/// Keypoint in base-image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Orientation in radians.
    pub angle: f32,
    /// Harris response on the detection level.
    pub response: f32,
    /// Pyramid level the keypoint was found on.
    pub octave: usize,
}

/// Keypoints and their descriptors, index-aligned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    /// Number of described keypoints.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` when no descriptor was extracted.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// One neighbor returned by descriptor matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorMatch {
    /// Index into the query descriptors.
    pub query_idx: usize,
    /// Index into the train descriptors.
    pub train_idx: usize,
    /// Hamming distance in bits.
    pub distance: u32,
}

/// Detector settings.
#[derive(Clone, Copy, Debug)]
pub struct OrbParams {
    /// Maximum keypoints over all levels.
    pub n_features: usize,
    /// Pyramid levels.
    pub n_levels: usize,
    /// Scale step between levels.
    pub scale_factor: f32,
    /// FAST intensity threshold.
    pub fast_threshold: u8,
    /// Minimum distance from the level border for a keypoint.
    pub edge_threshold: usize,
}

impl Default for OrbParams {
    fn default() -> Self {
        Self {
            n_features: 500,
            n_levels: 8,
            scale_factor: 1.2,
            fast_threshold: 20,
            edge_threshold: 19,
        }
    }
}
