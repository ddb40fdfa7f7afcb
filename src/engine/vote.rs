//! Voting over the color gate and detector verdicts.

use crate::detect::{DetectorKind, DetectorVerdict};
use crate::gate::ColorGateVerdict;
use crate::util::ProdMatchError;
use serde::Serialize;
use std::collections::BTreeMap;

pub const REASON_COLOR_MISMATCH: &str = "color-mismatch";
pub const REASON_INSUFFICIENT_VOTES: &str = "insufficient-votes";
pub const REASON_LOAD_ERROR: &str = "load-error";
pub const REASON_ERROR: &str = "error";
pub const REASON_CANCELLED: &str = "cancelled";
pub const REASON_DEADLINE: &str = "deadline-exceeded";

/// Final decision for one query/candidate pair.
///
/// `matched` holds exactly when the gate passed and at least the required
/// number of detectors voted for the pair. A failed gate leaves `detectors`
/// empty and `vote_count` at 0. `color_gate` is `None` only when the pair
/// never reached the gate (load failure or a skipped candidate).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PairMatchResult {
    pub vote_count: usize,
    pub matched: bool,
    pub color_gate: Option<ColorGateVerdict>,
    pub detectors: BTreeMap<DetectorKind, DetectorVerdict>,
    pub failure_reason: Option<String>,
    pub error: Option<String>,
}

impl PairMatchResult {
    /// Result for a pair whose gate rejected it.
    pub fn color_mismatch(gate: ColorGateVerdict) -> Self {
        Self {
            vote_count: 0,
            matched: false,
            color_gate: Some(gate),
            detectors: BTreeMap::new(),
            failure_reason: Some(REASON_COLOR_MISMATCH.to_string()),
            error: None,
        }
    }

    /// Result for a pair that could not be evaluated.
    pub fn failed(err: &ProdMatchError) -> Self {
        let reason = match err {
            ProdMatchError::ImageLoad { .. } => REASON_LOAD_ERROR,
            _ => REASON_ERROR,
        };
        Self {
            error: Some(err.to_string()),
            ..Self::skipped(reason)
        }
    }

    /// Result for a candidate that was never started.
    pub fn skipped(reason: &str) -> Self {
        Self {
            vote_count: 0,
            matched: false,
            color_gate: None,
            detectors: BTreeMap::new(),
            failure_reason: Some(reason.to_string()),
            error: None,
        }
    }

    /// Returns `true` when the gate ran and rejected the pair.
    pub fn is_color_mismatch(&self) -> bool {
        self.color_gate.as_ref().is_some_and(|gate| !gate.passed)
    }
}

/// Combines a gate verdict with the verdicts of the enabled detectors.
///
/// Detector verdicts passed alongside a failed gate are dropped.
pub fn aggregate(
    gate: ColorGateVerdict,
    detectors: BTreeMap<DetectorKind, DetectorVerdict>,
    required_votes: usize,
) -> PairMatchResult {
    if !gate.passed {
        return PairMatchResult::color_mismatch(gate);
    }
    let vote_count = detectors.values().filter(|v| v.matched).count();
    let matched = vote_count >= required_votes;
    PairMatchResult {
        vote_count,
        matched,
        color_gate: Some(gate),
        detectors,
        failure_reason: (!matched).then(|| REASON_INSUFFICIENT_VOTES.to_string()),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{aggregate, PairMatchResult, REASON_COLOR_MISMATCH, REASON_INSUFFICIENT_VOTES};
    use crate::detect::{DetectorKind, DetectorMetrics, DetectorVerdict};
    use crate::gate::ColorGateVerdict;
    use crate::util::ProdMatchError;
    use std::collections::BTreeMap;

    fn gate(passed: bool) -> ColorGateVerdict {
        ColorGateVerdict {
            histogram_correlation: if passed { 0.97 } else { 0.4 },
            median_delta_e: if passed { 2.0 } else { 30.0 },
            passed,
        }
    }

    fn verdicts(votes: [bool; 3]) -> BTreeMap<DetectorKind, DetectorVerdict> {
        DetectorKind::ALL
            .iter()
            .zip(votes)
            .map(|(&kind, matched)| {
                let verdict = DetectorVerdict {
                    kind,
                    matched,
                    metrics: DetectorMetrics::Ncc {
                        score: 0.0,
                        threshold: 0.45,
                    },
                    reason: None,
                };
                (kind, verdict)
            })
            .collect()
    }

    #[test]
    fn two_of_three_matches() {
        let result = aggregate(gate(true), verdicts([true, false, true]), 2);
        assert_eq!(result.vote_count, 2);
        assert!(result.matched);
        assert_eq!(result.failure_reason, None);
    }

    #[test]
    fn one_vote_is_not_enough() {
        let result = aggregate(gate(true), verdicts([false, false, true]), 2);
        assert_eq!(result.vote_count, 1);
        assert!(!result.matched);
        assert_eq!(result.failure_reason.as_deref(), Some(REASON_INSUFFICIENT_VOTES));
    }

    #[test]
    fn failed_gate_discards_votes() {
        let result = aggregate(gate(false), verdicts([true, true, true]), 2);
        assert_eq!(result.vote_count, 0);
        assert!(!result.matched);
        assert!(result.detectors.is_empty());
        assert!(result.is_color_mismatch());
        assert_eq!(result.failure_reason.as_deref(), Some(REASON_COLOR_MISMATCH));
    }

    #[test]
    fn load_failures_carry_the_error() {
        let err = ProdMatchError::ImageLoad {
            path: "a.png".into(),
            reason: "truncated".into(),
        };
        let result = PairMatchResult::failed(&err);
        assert!(!result.matched);
        assert!(result.color_gate.is_none());
        assert!(result.error.as_deref().unwrap().contains("a.png"));
        assert_eq!(result.failure_reason.as_deref(), Some("load-error"));
    }
}
