//! Pair and batch matching.
//!
//! An [`Engine`] owns a validated [`Config`] and a [`VisionBackend`]. Matching
//! a pair runs preprocessing, the color gate and, when the gate passes, every
//! enabled detector; [`vote::aggregate`] turns the verdicts into a
//! [`PairMatchResult`]. The engine holds no per-call state, so one instance
//! can serve any number of concurrent calls.

pub mod batch;
pub mod report;
pub mod vote;

use crate::backend::{NativeBackend, VisionBackend};
use crate::config::Config;
use crate::detect;
use crate::gate;
use crate::image::{GrayImage, ImageBuffer};
use crate::preprocess::Preprocessor;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::ProdMatchResult;
use std::path::Path;
pub use vote::PairMatchResult;

/// A preprocessed image together with its grayscale rendition.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub color: ImageBuffer,
    pub gray: GrayImage,
}

/// Visual product matcher.
pub struct Engine<B: VisionBackend = NativeBackend> {
    config: Config,
    backend: B,
}

impl Engine<NativeBackend> {
    /// Builds an engine over the bundled backend.
    pub fn new(config: Config) -> ProdMatchResult<Self> {
        Self::with_backend(config, NativeBackend::default())
    }
}

impl<B: VisionBackend> Engine<B> {
    /// Builds an engine over a custom backend after validating `config`.
    pub fn with_backend(config: Config, backend: B) -> ProdMatchResult<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn preprocessor(&self) -> Preprocessor<'_, B> {
        Preprocessor::new(&self.backend, &self.config.preprocessing)
    }

    /// Preprocesses a decoded image.
    pub fn prepare(&self, img: ImageBuffer) -> ProdMatchResult<PreparedImage> {
        let color = self.preprocessor().process(img)?;
        let gray = self.backend.to_gray(&color);
        Ok(PreparedImage { color, gray })
    }

    /// Loads and preprocesses an image file.
    pub fn prepare_path(&self, path: &Path) -> ProdMatchResult<PreparedImage> {
        let color = self.preprocessor().load(path)?;
        let gray = self.backend.to_gray(&color);
        Ok(PreparedImage { color, gray })
    }

    /// Decodes and preprocesses an encoded image.
    pub fn prepare_encoded(&self, bytes: &[u8], label: &str) -> ProdMatchResult<PreparedImage> {
        let color = self.preprocessor().decode(bytes, label)?;
        let gray = self.backend.to_gray(&color);
        Ok(PreparedImage { color, gray })
    }

    /// Compares two preprocessed images.
    pub fn compare(&self, query: &PreparedImage, candidate: &PreparedImage) -> PairMatchResult {
        let gate = match gate::evaluate(
            &self.backend,
            &self.config.color_gate,
            &query.color,
            &candidate.color,
        ) {
            Ok(gate) => gate,
            Err(err) => {
                trace_warn!("color_gate_error", error = err.to_string().as_str());
                return PairMatchResult::failed(&err);
            }
        };
        trace_event!(
            "color_gate",
            corr = gate.histogram_correlation,
            delta_e = gate.median_delta_e,
            passed = gate.passed
        );
        if !gate.passed {
            return PairMatchResult::color_mismatch(gate);
        }

        let detectors = detect::run_enabled(&self.backend, &self.config, &query.gray, &candidate.gray);
        let result = vote::aggregate(gate, detectors, self.config.voting.required_votes);
        trace_event!(
            "pair_result",
            votes = result.vote_count,
            matched = result.matched
        );
        result
    }

    /// Matches two image files.
    ///
    /// Never fails: load errors produce a non-matching result with `error`
    /// set.
    pub fn match_pair(&self, query: impl AsRef<Path>, candidate: impl AsRef<Path>) -> PairMatchResult {
        let (query, candidate) = (query.as_ref(), candidate.as_ref());
        let _span = trace_span!("match_pair", backend = self.backend.name()).entered();
        let prepared = self
            .prepare_path(query)
            .and_then(|q| self.prepare_path(candidate).map(|c| (q, c)));
        match prepared {
            Ok((q, c)) => self.compare(&q, &c),
            Err(err) => {
                trace_warn!("load_failed", error = err.to_string().as_str());
                PairMatchResult::failed(&err)
            }
        }
    }

    /// Matches two already decoded RGB images.
    pub fn match_images(&self, query: &ImageBuffer, candidate: &ImageBuffer) -> PairMatchResult {
        let _span = trace_span!("match_pair", backend = self.backend.name()).entered();
        let prepared = self
            .prepare(query.clone())
            .and_then(|q| self.prepare(candidate.clone()).map(|c| (q, c)));
        match prepared {
            Ok((q, c)) => self.compare(&q, &c),
            Err(err) => PairMatchResult::failed(&err),
        }
    }

    /// Matches two encoded (PNG or JPEG) images held in memory.
    pub fn match_encoded(&self, query: &[u8], candidate: &[u8]) -> PairMatchResult {
        let _span = trace_span!("match_pair", backend = self.backend.name()).entered();
        let prepared = self
            .prepare_encoded(query, "query")
            .and_then(|q| self.prepare_encoded(candidate, "candidate").map(|c| (q, c)));
        match prepared {
            Ok((q, c)) => self.compare(&q, &c),
            Err(err) => {
                trace_warn!("load_failed", error = err.to_string().as_str());
                PairMatchResult::failed(&err)
            }
        }
    }
}
