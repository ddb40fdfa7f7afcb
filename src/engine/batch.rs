//! One query against many candidates.
//!
//! The query is preprocessed once. Candidates are matched on a bounded rayon
//! pool (when the `rayon` feature is on) and collected back in candidate
//! order, so the result never depends on scheduling. Cancellation and the
//! deadline are checked before each candidate starts; candidates that never
//! start are recorded as non-matches, keeping exactly one entry per
//! candidate.

use crate::backend::VisionBackend;
use crate::engine::vote::{PairMatchResult, REASON_CANCELLED, REASON_COLOR_MISMATCH, REASON_DEADLINE};
use crate::engine::{Engine, PreparedImage};
use crate::image::io::has_image_extension;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{ProdMatchError, ProdMatchResult};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared flag that stops a running batch before its next candidate.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Batch execution controls.
#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Worker threads; `None` uses one per available core.
    pub threads: Option<usize>,
    /// Candidates not started by this instant are skipped.
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelToken>,
}

/// Result for one candidate file.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateResult {
    pub path: PathBuf,
    /// File name used as the candidate identifier in reports.
    pub filename: String,
    pub result: PairMatchResult,
}

/// Counts over a batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchSummary {
    pub total_candidates: usize,
    pub matched_count: usize,
    pub color_mismatches: usize,
    /// Failure reason to number of non-matching candidates.
    pub failure_reasons: BTreeMap<String, usize>,
}

impl BatchSummary {
    pub fn from_results(results: &[CandidateResult]) -> Self {
        let mut summary = BatchSummary {
            total_candidates: results.len(),
            ..BatchSummary::default()
        };
        for entry in results {
            let r = &entry.result;
            if r.matched {
                summary.matched_count += 1;
                continue;
            }
            if r.failure_reason.as_deref() == Some(REASON_COLOR_MISMATCH) {
                summary.color_mismatches += 1;
            }
            if let Some(reason) = &r.failure_reason {
                *summary.failure_reasons.entry(reason.clone()).or_insert(0) += 1;
            }
        }
        summary
    }
}

/// Outcome of matching one query against a candidate set.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchMatchReport {
    pub query: PathBuf,
    pub folder: PathBuf,
    pub candidate_count: usize,
    /// One entry per candidate, in candidate order.
    pub results: Vec<CandidateResult>,
    /// Index of the candidate with the most votes; earlier entries win ties.
    pub best: Option<usize>,
    pub summary: BatchSummary,
    pub generated_at: DateTime<Local>,
}

impl BatchMatchReport {
    pub fn best_result(&self) -> Option<&CandidateResult> {
        self.best.and_then(|idx| self.results.get(idx))
    }
}

/// Highest `vote_count`, first seen on ties; `None` only for an empty list.
pub fn select_best(results: &[CandidateResult]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, entry) in results.iter().enumerate() {
        let better = match best {
            None => true,
            Some(b) => entry.result.vote_count > results[b].result.vote_count,
        };
        if better {
            best = Some(idx);
        }
    }
    best
}

/// Image files (`png`, `jpg`, `jpeg`) directly inside `dir`, sorted by name.
///
/// A missing directory, an unreadable one, or one without images is an `Io`
/// error.
pub fn list_candidates(dir: &Path) -> ProdMatchResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|err| ProdMatchError::io(dir, err))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| ProdMatchError::io(dir, err))?.path();
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    if files.is_empty() {
        return Err(ProdMatchError::Io {
            path: dir.display().to_string(),
            reason: "no candidate images found".to_string(),
        });
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Directory shared by every candidate, or empty when they differ.
fn common_folder(candidates: &[PathBuf]) -> PathBuf {
    let mut parents = candidates.iter().map(|p| p.parent());
    match parents.next().flatten() {
        Some(first) if parents.all(|p| p == Some(first)) => first.to_path_buf(),
        _ => PathBuf::new(),
    }
}

impl<B: VisionBackend> Engine<B> {
    /// Matches `query` against every image in `dir` with default options.
    pub fn match_batch(
        &self,
        query: impl AsRef<Path>,
        dir: impl AsRef<Path>,
    ) -> ProdMatchResult<BatchMatchReport> {
        let dir = dir.as_ref();
        let candidates = list_candidates(dir)?;
        let mut report = self.match_batch_with(query, &candidates, &BatchOptions::default())?;
        report.folder = dir.to_path_buf();
        Ok(report)
    }

    /// Matches `query` against an explicit candidate list.
    pub fn match_batch_with(
        &self,
        query: impl AsRef<Path>,
        candidates: &[PathBuf],
        options: &BatchOptions,
    ) -> ProdMatchResult<BatchMatchReport> {
        let query = query.as_ref();
        let _span = trace_span!("match_batch", candidates = candidates.len()).entered();

        let prepared = self.prepare_path(query);
        if let Err(err) = &prepared {
            trace_warn!("query_load_failed", error = err.to_string().as_str());
        }
        let run_one = |path: &PathBuf| -> PairMatchResult {
            if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return PairMatchResult::skipped(REASON_CANCELLED);
            }
            if options.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return PairMatchResult::skipped(REASON_DEADLINE);
            }
            match &prepared {
                Ok(q) => self.match_prepared(q, path),
                Err(err) => PairMatchResult::failed(err),
            }
        };

        let pair_results = self.run_candidates(candidates, options, run_one)?;
        let results: Vec<CandidateResult> = candidates
            .iter()
            .zip(pair_results)
            .map(|(path, result)| CandidateResult {
                path: path.clone(),
                filename: file_name(path),
                result,
            })
            .collect();

        let summary = BatchSummary::from_results(&results);
        let best = select_best(&results);
        trace_event!(
            "batch_summary",
            total = summary.total_candidates,
            matched = summary.matched_count,
            color_mismatches = summary.color_mismatches
        );
        Ok(BatchMatchReport {
            query: query.to_path_buf(),
            folder: common_folder(candidates),
            candidate_count: candidates.len(),
            results,
            best,
            summary,
            generated_at: Local::now(),
        })
    }

    fn match_prepared(&self, query: &PreparedImage, candidate: &Path) -> PairMatchResult {
        match self.prepare_path(candidate) {
            Ok(c) => self.compare(query, &c),
            Err(err) => {
                trace_warn!("load_failed", error = err.to_string().as_str());
                PairMatchResult::failed(&err)
            }
        }
    }

    #[cfg(feature = "rayon")]
    fn run_candidates<F>(
        &self,
        candidates: &[PathBuf],
        options: &BatchOptions,
        run_one: F,
    ) -> ProdMatchResult<Vec<PairMatchResult>>
    where
        F: Fn(&PathBuf) -> PairMatchResult + Sync,
    {
        use rayon::prelude::*;
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = options.threads {
            builder = builder.num_threads(threads.max(1));
        }
        let pool = builder
            .build()
            .map_err(|err| ProdMatchError::Configuration(format!("thread pool: {err}")))?;
        Ok(pool.install(|| candidates.par_iter().map(&run_one).collect()))
    }

    #[cfg(not(feature = "rayon"))]
    fn run_candidates<F>(
        &self,
        candidates: &[PathBuf],
        _options: &BatchOptions,
        run_one: F,
    ) -> ProdMatchResult<Vec<PairMatchResult>>
    where
        F: Fn(&PathBuf) -> PairMatchResult + Sync,
    {
        Ok(candidates.iter().map(run_one).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{common_folder, select_best, BatchSummary, CancelToken, CandidateResult};
    use crate::engine::vote::PairMatchResult;
    use std::path::PathBuf;

    fn entry(name: &str, votes: usize, reason: Option<&str>) -> CandidateResult {
        let mut result = PairMatchResult::skipped(reason.unwrap_or("x"));
        result.vote_count = votes;
        result.matched = reason.is_none();
        if reason.is_none() {
            result.failure_reason = None;
        }
        CandidateResult {
            path: PathBuf::from(name),
            filename: name.to_string(),
            result,
        }
    }

    #[test]
    fn best_prefers_first_of_equal_votes() {
        let results = vec![
            entry("a.png", 1, Some("insufficient-votes")),
            entry("b.png", 3, None),
            entry("c.png", 3, None),
        ];
        assert_eq!(select_best(&results), Some(1));
    }

    #[test]
    fn all_zero_votes_still_have_a_best() {
        let results = vec![
            entry("a.png", 0, Some("color-mismatch")),
            entry("b.png", 0, Some("color-mismatch")),
        ];
        assert_eq!(select_best(&results), Some(0));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn summary_counts_reasons_of_non_matches() {
        let results = vec![
            entry("a.png", 0, Some("color-mismatch")),
            entry("b.png", 2, None),
            entry("c.png", 1, Some("insufficient-votes")),
            entry("d.png", 0, Some("color-mismatch")),
        ];
        let summary = BatchSummary::from_results(&results);
        assert_eq!(summary.total_candidates, 4);
        assert_eq!(summary.matched_count, 1);
        assert_eq!(summary.color_mismatches, 2);
        assert_eq!(summary.failure_reasons.get("color-mismatch"), Some(&2));
        assert_eq!(summary.failure_reasons.get("insufficient-votes"), Some(&1));
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn common_folder_of_siblings() {
        let files = vec![PathBuf::from("/x/y/a.png"), PathBuf::from("/x/y/b.jpg")];
        assert_eq!(common_folder(&files), PathBuf::from("/x/y"));
        let mixed = vec![PathBuf::from("/x/a.png"), PathBuf::from("/z/b.png")];
        assert_eq!(common_folder(&mixed), PathBuf::new());
    }
}
