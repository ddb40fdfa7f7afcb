#![cfg(feature = "rayon")]

mod common;

use common::{brightened, hue_shifted, product, sample_product, write_png};
use prodmatch::engine::batch::list_candidates;
use prodmatch::{BatchOptions, Config, Engine};

#[test]
fn parallel_batch_matches_single_thread() {
    let dir = tempfile::tempdir().unwrap();
    let img = sample_product();
    let query = write_png(dir.path(), "query.png", &img);
    let folder = dir.path().join("candidates");
    std::fs::create_dir(&folder).unwrap();
    write_png(&folder, "01_copy.png", &img);
    write_png(&folder, "02_bright.png", &brightened(&img, 15));
    write_png(&folder, "03_hue.png", &hue_shifted(&img, 90.0));
    write_png(&folder, "04_other.png", &product(99, 3, 240, 240));
    write_png(&folder, "05_copy.png", &img);
    let candidates = list_candidates(&folder).unwrap();

    let engine = Engine::new(Config::default()).unwrap();
    let sequential = engine
        .match_batch_with(
            &query,
            &candidates,
            &BatchOptions {
                threads: Some(1),
                ..BatchOptions::default()
            },
        )
        .unwrap();
    let parallel = engine
        .match_batch_with(&query, &candidates, &BatchOptions::default())
        .unwrap();
    let four_threads = engine
        .match_batch_with(
            &query,
            &candidates,
            &BatchOptions {
                threads: Some(4),
                ..BatchOptions::default()
            },
        )
        .unwrap();

    assert_eq!(sequential.results, parallel.results);
    assert_eq!(sequential.results, four_threads.results);
    assert_eq!(sequential.best, parallel.best);
    assert_eq!(sequential.summary, parallel.summary);
    assert_eq!(sequential.best, Some(0));
}
