//! The three similarity detectors that vote on a pair.
//!
//! Each detector compares two preprocessed grayscale images and returns a
//! [`DetectorVerdict`]. Detectors never abort a pair: an error inside one of
//! them becomes a non-matching verdict whose `reason` carries the message,
//! and the remaining detectors still run.

pub mod ncc;
pub mod orb;
pub mod phash;

use crate::backend::VisionBackend;
use crate::config::Config;
use crate::image::GrayImage;
use crate::trace::trace_debug;
use crate::util::ProdMatchResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Detector identity; the ordering fixes report and map order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    Phash,
    Orb,
    Ncc,
}

impl DetectorKind {
    pub const ALL: [DetectorKind; 3] = [DetectorKind::Phash, DetectorKind::Orb, DetectorKind::Ncc];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Phash => "phash",
            DetectorKind::Orb => "orb",
            DetectorKind::Ncc => "ncc",
        }
    }

    /// Returns `true` when the configuration enables this detector.
    pub fn enabled_in(&self, config: &Config) -> bool {
        match self {
            DetectorKind::Phash => config.phash.enabled,
            DetectorKind::Orb => config.orb.enabled,
            DetectorKind::Ncc => config.ncc.enabled,
        }
    }

    /// Metrics reported when the detector could not produce a measurement.
    fn empty_metrics(&self, config: &Config) -> DetectorMetrics {
        match self {
            DetectorKind::Phash => DetectorMetrics::Phash {
                distance: None,
                threshold: config.phash.hamming_threshold,
            },
            DetectorKind::Orb => DetectorMetrics::Orb(orb::OrbStats::empty(&config.orb)),
            DetectorKind::Ncc => DetectorMetrics::Ncc {
                score: 0.0,
                threshold: config.ncc.score_threshold,
            },
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector-specific measurements.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DetectorMetrics {
    Phash {
        /// Hamming distance between the hashes; `None` when no hash was built.
        distance: Option<u32>,
        threshold: u32,
    },
    Orb(orb::OrbStats),
    Ncc {
        /// Best correlation, clipped at 0.
        score: f32,
        threshold: f32,
    },
}

/// One detector's vote on a pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectorVerdict {
    pub kind: DetectorKind,
    pub matched: bool,
    pub metrics: DetectorMetrics,
    /// Why the detector did not match, when it did not.
    pub reason: Option<String>,
}

/// Runs one detector; errors become non-matching verdicts.
pub fn run_detector<B: VisionBackend>(
    kind: DetectorKind,
    backend: &B,
    config: &Config,
    query: &GrayImage,
    candidate: &GrayImage,
) -> DetectorVerdict {
    let outcome: ProdMatchResult<DetectorVerdict> = match kind {
        DetectorKind::Phash => phash::detect(backend, &config.phash, query, candidate),
        DetectorKind::Orb => orb::detect(backend, &config.orb, query, candidate),
        DetectorKind::Ncc => ncc::detect(backend, &config.ncc, query, candidate),
    };
    let verdict = outcome.unwrap_or_else(|err| DetectorVerdict {
        kind,
        matched: false,
        metrics: kind.empty_metrics(config),
        reason: Some(err.to_string()),
    });
    trace_debug!(
        "detector",
        detector = kind.as_str(),
        matched = verdict.matched,
        reason = verdict.reason.as_deref().unwrap_or("")
    );
    verdict
}

/// Runs every enabled detector in [`DetectorKind`] order.
pub fn run_enabled<B: VisionBackend>(
    backend: &B,
    config: &Config,
    query: &GrayImage,
    candidate: &GrayImage,
) -> BTreeMap<DetectorKind, DetectorVerdict> {
    DetectorKind::ALL
        .iter()
        .filter(|kind| kind.enabled_in(config))
        .map(|&kind| (kind, run_detector(kind, backend, config, query, candidate)))
        .collect()
}
