//! prodmatch decides whether two product photos show the same physical item.
//!
//! A pair goes through preprocessing (denoise, lightness CLAHE, margin crop),
//! a color gate that rejects hue and tone mismatches, and three independent
//! detectors: a DCT perceptual hash, ORB-style keypoint matching verified by a
//! RANSAC homography, and normalized cross-correlation. The pair matches when
//! the gate passes and enough detectors vote for it. Batches match one query
//! against a directory of candidates in parallel (feature `rayon`, on by
//! default) and can be written out as a JSON report. Enable the `tracing`
//! feature for spans and events.
//!
//! ```no_run
//! use prodmatch::{Config, Engine};
//!
//! let engine = Engine::new(Config::default())?;
//! let result = engine.match_pair("listing.jpg", "supplier.jpg");
//! println!("votes: {} matched: {}", result.vote_count, result.matched);
//! # Ok::<(), prodmatch::ProdMatchError>(())
//! ```

pub mod backend;
pub mod config;
pub mod detect;
pub mod engine;
pub mod features;
pub mod gate;
pub mod geometry;
pub mod image;
pub mod kernel;
pub mod preprocess;
mod trace;
pub mod util;

pub use backend::{NativeBackend, VisionBackend};
pub use config::Config;
pub use detect::{DetectorKind, DetectorMetrics, DetectorVerdict};
pub use engine::batch::{
    BatchMatchReport, BatchOptions, BatchSummary, CancelToken, CandidateResult,
};
pub use engine::report::default_report_path;
pub use engine::{Engine, PairMatchResult, PreparedImage};
pub use gate::ColorGateVerdict;
pub use image::{GrayImage, ImageBuffer, ImageView, OwnedImage};
pub use util::{ProdMatchError, ProdMatchResult};
