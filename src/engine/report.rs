//! JSON rendering of batch results.

use crate::backend::VisionBackend;
use crate::detect::{DetectorKind, DetectorMetrics, DetectorVerdict};
use crate::engine::batch::{BatchMatchReport, CandidateResult};
use crate::engine::Engine;
use crate::trace::trace_event;
use crate::util::{ProdMatchError, ProdMatchResult};
use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const REPORT_TITLE: &str = "Product image match report";

/// Directory used when no explicit report path is given.
pub const DEFAULT_REPORT_DIR: &str = "reports";

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    title: &'static str,
    timestamp: String,
    query_image: String,
    candidate_folder: String,
    summary: SummaryDocument<'a>,
    details: Vec<DetailDocument<'a>>,
}

#[derive(Debug, Serialize)]
struct SummaryDocument<'a> {
    total_candidates: usize,
    matched_count: usize,
    color_mismatches: usize,
    failure_reasons: &'a BTreeMap<String, usize>,
    best_match: Option<BestMatchDocument<'a>>,
}

#[derive(Debug, Serialize)]
struct BestMatchDocument<'a> {
    filename: &'a str,
    votes: usize,
    matched: bool,
}

#[derive(Debug, Serialize)]
struct DetailDocument<'a> {
    filename: &'a str,
    matched: bool,
    votes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    algorithms: AlgorithmsDocument,
}

#[derive(Debug, Default, Serialize)]
struct AlgorithmsDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<ColorDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phash: Option<PhashDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orb: Option<OrbDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ncc: Option<NccDocument>,
}

#[derive(Debug, Serialize)]
struct ColorDocument {
    corr: f32,
    #[serde(rename = "deltaE50")]
    delta_e50: f32,
    passed: bool,
}

#[derive(Debug, Serialize)]
struct PhashDocument {
    matched: bool,
    /// -1 when no distance was measured.
    distance: i64,
}

#[derive(Debug, Serialize)]
struct OrbDocument {
    matched: bool,
    good_matches: usize,
    inliers: usize,
    inlier_ratio: f32,
}

#[derive(Debug, Serialize)]
struct NccDocument {
    matched: bool,
    score: f32,
}

fn algorithms(entry: &CandidateResult) -> AlgorithmsDocument {
    let result = &entry.result;
    let mut doc = AlgorithmsDocument {
        color: result.color_gate.as_ref().map(|gate| ColorDocument {
            corr: gate.histogram_correlation,
            delta_e50: gate.median_delta_e,
            passed: gate.passed,
        }),
        ..AlgorithmsDocument::default()
    };
    for (kind, verdict) in &result.detectors {
        let DetectorVerdict {
            matched, metrics, ..
        } = verdict;
        match (kind, metrics) {
            (DetectorKind::Phash, DetectorMetrics::Phash { distance, .. }) => {
                doc.phash = Some(PhashDocument {
                    matched: *matched,
                    distance: distance.map_or(-1, i64::from),
                });
            }
            (DetectorKind::Orb, DetectorMetrics::Orb(stats)) => {
                doc.orb = Some(OrbDocument {
                    matched: *matched,
                    good_matches: stats.good_matches,
                    inliers: stats.inliers,
                    inlier_ratio: stats.inlier_ratio,
                });
            }
            (DetectorKind::Ncc, DetectorMetrics::Ncc { score, .. }) => {
                doc.ncc = Some(NccDocument {
                    matched: *matched,
                    score: *score,
                });
            }
            _ => {}
        }
    }
    doc
}

fn document(report: &BatchMatchReport) -> ReportDocument<'_> {
    let details = report
        .results
        .iter()
        .map(|entry| DetailDocument {
            filename: &entry.filename,
            matched: entry.result.matched,
            votes: entry.result.vote_count,
            reason: entry.result.failure_reason.as_deref(),
            error: entry.result.error.as_deref(),
            algorithms: algorithms(entry),
        })
        .collect();
    ReportDocument {
        title: REPORT_TITLE,
        timestamp: report
            .generated_at
            .to_rfc3339_opts(SecondsFormat::Secs, false),
        query_image: report.query.display().to_string(),
        candidate_folder: report.folder.display().to_string(),
        summary: SummaryDocument {
            total_candidates: report.summary.total_candidates,
            matched_count: report.summary.matched_count,
            color_mismatches: report.summary.color_mismatches,
            failure_reasons: &report.summary.failure_reasons,
            best_match: report.best_result().map(|best| BestMatchDocument {
                filename: &best.filename,
                votes: best.result.vote_count,
                matched: best.result.matched,
            }),
        },
        details,
    }
}

impl BatchMatchReport {
    /// Renders the report document as pretty-printed JSON.
    pub fn to_json(&self) -> ProdMatchResult<String> {
        serde_json::to_string_pretty(&document(self))
            .map_err(|err| ProdMatchError::Report(err.to_string()))
    }

    /// Writes the report document to `path`, creating parent directories.
    pub fn write_json(&self, path: &Path) -> ProdMatchResult<()> {
        let text = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| ProdMatchError::io(parent, err))?;
        }
        std::fs::write(path, text).map_err(|err| ProdMatchError::io(path, err))
    }
}

/// `reports/report_<YYYYmmdd_HHMMSS>.json` for the given instant.
pub fn default_report_path(at: &DateTime<Local>) -> PathBuf {
    Path::new(DEFAULT_REPORT_DIR).join(format!("report_{}.json", at.format("%Y%m%d_%H%M%S")))
}

impl<B: VisionBackend> Engine<B> {
    /// Runs [`Engine::match_batch`] and writes the JSON report to `output`.
    pub fn generate_report(
        &self,
        query: impl AsRef<Path>,
        dir: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> ProdMatchResult<BatchMatchReport> {
        let report = self.match_batch(query, dir)?;
        let output = output.as_ref();
        report.write_json(output)?;
        trace_event!("report_written", path = output.display().to_string().as_str());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::default_report_path;
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;

    #[test]
    fn default_path_uses_compact_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_report_path(&at),
            PathBuf::from("reports/report_20240309_140507.json")
        );
    }
}
