use prodmatch::{Config, Engine, ProdMatchError};

fn configuration_message(err: ProdMatchError) -> String {
    match err {
        ProdMatchError::Configuration(msg) => msg,
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let msg = configuration_message(Config::load(dir.path().join("absent.json")).unwrap_err());
    assert!(msg.contains("absent.json"), "{msg}");
}

#[test]
fn file_round_trips_through_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prodmatch.json");
    let mut config = Config::default();
    config.ncc.score_threshold = 0.5;
    config.orb.rescue_min_inliers = 25;
    std::fs::write(&path, config.to_json_pretty().unwrap()).unwrap();
    assert_eq!(Config::load(&path).unwrap(), config);
}

#[test]
fn misspelled_section_is_rejected() {
    let err = Config::from_json_str(r#"{"colourGate": {"hsvCorrMin": 0.9}}"#).unwrap_err();
    let msg = configuration_message(err);
    assert!(msg.contains("colourGate"), "{msg}");
}

#[test]
fn wrong_value_type_is_rejected() {
    let err = Config::from_json_str(r#"{"ncc": {"resizeWidth": "wide"}}"#).unwrap_err();
    configuration_message(err);
}

#[test]
fn out_of_range_values_fail_engine_construction() {
    let cases: [(&str, fn(&mut Config)); 5] = [
        ("hashSize", |c| c.phash.hash_size = 1),
        ("nFeatures", |c| c.orb.n_features = 0),
        ("ransacReprojThreshold", |c| c.orb.ransac_reproj_threshold = 0.0),
        ("resizeWidth", |c| c.ncc.resize_width = 4),
        ("requiredVotes", |c| c.voting.required_votes = 4),
    ];
    for (key, mutate) in cases {
        let mut config = Config::default();
        mutate(&mut config);
        let err = match Engine::new(config) {
            Ok(_) => panic!("{key}: invalid value accepted"),
            Err(err) => err,
        };
        let msg = configuration_message(err);
        assert!(msg.contains(key), "{key}: {msg}");
    }
}

#[test]
fn every_detector_disabled_is_rejected() {
    let err = Config::from_json_str(
        r#"{"phash": {"enabled": false}, "orb": {"enabled": false}, "ncc": {"enabled": false}}"#,
    )
    .unwrap_err();
    let msg = configuration_message(err);
    assert!(msg.contains("detector"), "{msg}");
}
