mod common;

use common::{flat, open_gate_config, sample_product, write_png};
use prodmatch::detect::orb::REASON_NO_FEATURES;
use prodmatch::{BatchOptions, CancelToken, Config, DetectorKind, Engine, ProdMatchError};
use std::path::{Path, PathBuf};
use std::time::Instant;

struct Fixture {
    _dir: tempfile::TempDir,
    query: PathBuf,
    folder: PathBuf,
}

/// Query plus a folder holding two exact copies, a blank image, a corrupt
/// file and a non-image file.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let img = sample_product();
    let query = write_png(dir.path(), "query.png", &img);
    let folder = dir.path().join("candidates");
    std::fs::create_dir(&folder).unwrap();
    write_png(&folder, "a_copy.png", &img);
    write_png(&folder, "b_copy.png", &img);
    write_png(&folder, "c_blank.png", &flat(240, 240, 128));
    std::fs::write(folder.join("d_broken.png"), b"not an image").unwrap();
    std::fs::write(folder.join("notes.txt"), b"ignored").unwrap();
    Fixture {
        _dir: dir,
        query,
        folder,
    }
}

fn candidates(folder: &Path) -> Vec<PathBuf> {
    prodmatch::engine::batch::list_candidates(folder).unwrap()
}

#[test]
fn batch_has_one_entry_per_candidate() {
    let fx = fixture();
    let engine = Engine::new(open_gate_config()).unwrap();
    let report = engine.match_batch(&fx.query, &fx.folder).unwrap();

    let names: Vec<&str> = report.results.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, ["a_copy.png", "b_copy.png", "c_blank.png", "d_broken.png"]);
    assert_eq!(report.candidate_count, 4);
    assert_eq!(report.folder, fx.folder);

    let summary = &report.summary;
    assert_eq!(summary.total_candidates, 4);
    assert_eq!(summary.matched_count, 2);
    assert_eq!(summary.color_mismatches, 0);
    assert_eq!(summary.failure_reasons.get("load-error"), Some(&1));
    assert_eq!(summary.failure_reasons.get("insufficient-votes"), Some(&1));
}

#[test]
fn best_match_prefers_first_of_tied_candidates() {
    let fx = fixture();
    let engine = Engine::new(open_gate_config()).unwrap();
    let report = engine.match_batch(&fx.query, &fx.folder).unwrap();

    assert_eq!(report.best, Some(0));
    let best = report.best_result().unwrap();
    assert_eq!(best.filename, "a_copy.png");
    assert_eq!(best.result.vote_count, 3);
    let max_votes = report.results.iter().map(|r| r.result.vote_count).max();
    assert_eq!(Some(best.result.vote_count), max_votes);
}

#[test]
fn blank_candidate_reports_no_features_without_aborting() {
    let fx = fixture();
    let engine = Engine::new(open_gate_config()).unwrap();
    let report = engine.match_batch(&fx.query, &fx.folder).unwrap();

    let blank = &report.results[2].result;
    assert!(!blank.matched);
    assert!(blank.color_gate.as_ref().unwrap().passed);
    let orb = blank.detectors.get(&DetectorKind::Orb).unwrap();
    assert!(!orb.matched);
    assert_eq!(orb.reason.as_deref(), Some(REASON_NO_FEATURES));
    assert_eq!(blank.failure_reason.as_deref(), Some("insufficient-votes"));

    let broken = &report.results[3].result;
    assert_eq!(broken.failure_reason.as_deref(), Some("load-error"));
    assert!(broken.error.is_some());
}

#[test]
fn default_gate_rejects_blank_candidate() {
    let fx = fixture();
    let engine = Engine::new(Config::default()).unwrap();
    let report = engine.match_batch(&fx.query, &fx.folder).unwrap();

    let blank = &report.results[2].result;
    assert!(blank.is_color_mismatch());
    assert_eq!(report.summary.color_mismatches, 1);
}

#[test]
fn cancelled_batch_still_lists_every_candidate() {
    let fx = fixture();
    let engine = Engine::new(Config::default()).unwrap();
    let token = CancelToken::new();
    token.cancel();
    let options = BatchOptions {
        cancel: Some(token),
        ..BatchOptions::default()
    };
    let report = engine
        .match_batch_with(&fx.query, &candidates(&fx.folder), &options)
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert!(report
        .results
        .iter()
        .all(|r| r.result.failure_reason.as_deref() == Some("cancelled")));
    assert_eq!(report.summary.failure_reasons.get("cancelled"), Some(&4));
    assert_eq!(report.summary.matched_count, 0);
}

#[test]
fn expired_deadline_skips_candidates() {
    let fx = fixture();
    let engine = Engine::new(Config::default()).unwrap();
    let options = BatchOptions {
        deadline: Some(Instant::now()),
        ..BatchOptions::default()
    };
    let report = engine
        .match_batch_with(&fx.query, &candidates(&fx.folder), &options)
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert!(report
        .results
        .iter()
        .all(|r| r.result.failure_reason.as_deref() == Some("deadline-exceeded")));
    assert_eq!(report.folder, fx.folder);
}

#[test]
fn unreadable_query_fails_every_candidate() {
    let fx = fixture();
    let engine = Engine::new(Config::default()).unwrap();
    let report = engine
        .match_batch(fx.folder.join("d_broken.png"), &fx.folder)
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert_eq!(report.summary.failure_reasons.get("load-error"), Some(&4));
    assert!(report.results.iter().all(|r| r.result.error.is_some()));
}

#[test]
fn missing_or_empty_folder_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Engine::new(Config::default()).unwrap();
    let query = write_png(dir.path(), "query.png", &sample_product());

    let missing = engine.match_batch(&query, dir.path().join("nope"));
    assert!(matches!(missing, Err(ProdMatchError::Io { .. })));

    let empty = dir.path().join("empty");
    std::fs::create_dir(&empty).unwrap();
    let err = engine.match_batch(&query, &empty).unwrap_err();
    assert!(matches!(err, ProdMatchError::Io { ref reason, .. } if reason.contains("no candidate")));
}

#[test]
fn report_document_carries_expected_keys() {
    let fx = fixture();
    let engine = Engine::new(open_gate_config()).unwrap();
    let output = fx.folder.join("out").join("report.json");
    let report = engine
        .generate_report(&fx.query, &fx.folder, &output)
        .unwrap();
    assert_eq!(report.results.len(), 4);

    let text = std::fs::read_to_string(&output).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    for key in ["title", "timestamp", "query_image", "candidate_folder", "summary", "details"] {
        assert!(doc.get(key).is_some(), "missing top-level key {key}");
    }
    let summary = &doc["summary"];
    assert_eq!(summary["total_candidates"], 4);
    assert_eq!(summary["matched_count"], 2);
    assert_eq!(summary["color_mismatches"], 0);
    assert_eq!(summary["failure_reasons"]["load-error"], 1);
    assert_eq!(summary["best_match"]["filename"], "a_copy.png");
    assert_eq!(summary["best_match"]["votes"], 3);
    assert_eq!(summary["best_match"]["matched"], true);

    let details = doc["details"].as_array().unwrap();
    assert_eq!(details.len(), 4);
    let first = &details[0];
    assert_eq!(first["filename"], "a_copy.png");
    assert_eq!(first["votes"], 3);
    assert!(first.get("reason").is_none());
    let algorithms = &first["algorithms"];
    assert_eq!(algorithms["color"]["passed"], true);
    assert!(algorithms["color"]["corr"].is_number());
    assert!(algorithms["color"]["deltaE50"].is_number());
    assert_eq!(algorithms["phash"]["distance"], 0);
    assert_eq!(algorithms["orb"]["matched"], true);
    for key in ["good_matches", "inliers", "inlier_ratio"] {
        assert!(algorithms["orb"][key].is_number(), "missing orb.{key}");
    }
    assert!(algorithms["ncc"]["score"].as_f64().unwrap() > 0.99);

    let broken = &details[3];
    assert_eq!(broken["reason"], "load-error");
    assert!(broken["error"].is_string());
    assert!(broken["algorithms"].get("color").is_none());
}
