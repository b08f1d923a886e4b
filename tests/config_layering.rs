use std::fs;

use kindred_rs::config::{DedupOverrides, TimelineOverrides, DEFAULT_MATCH_THRESHOLD};
use kindred_rs::{ConfigOverrides, KindredConfig, RelationshipCheck, Severity};
use tempfile::TempDir;

#[test]
fn defaults_without_file() {
    let config = KindredConfig::from_env(None).unwrap();
    assert_eq!(config.dedup.threshold, DEFAULT_MATCH_THRESHOLD);
    assert_eq!(config.coverage.generations, 4);
}

#[test]
fn file_values_override_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kindred.toml");
    fs::write(
        &path,
        r#"
[dedup]
threshold = 0.8
year_gap_cap = 3

[dedup.weights]
sources = 0.0

[relationships]
checks = ["circular", "orphans"]
max_concurrent_spouses = 2

[timeline]
min_severity = "warning"
"#,
    )
    .unwrap();

    let config = KindredConfig::from_env(Some(&path)).unwrap();
    assert_eq!(config.dedup.threshold, 0.8);
    assert_eq!(config.dedup.year_gap_cap, 3);
    assert_eq!(config.dedup.weights.sources, 0.0);
    assert_eq!(config.dedup.weights.surname, 0.25);
    assert_eq!(
        config.relationships.checks,
        vec![RelationshipCheck::Circular, RelationshipCheck::Orphans]
    );
    assert_eq!(config.relationships.max_concurrent_spouses, 2);
    assert_eq!(config.timeline.min_severity, Severity::Warning);
}

#[test]
fn overrides_beat_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kindred.toml");
    fs::write(&path, "[dedup]\nthreshold = 0.8\n").unwrap();

    let overrides = ConfigOverrides {
        dedup: Some(DedupOverrides {
            threshold: Some(0.9),
            ..DedupOverrides::default()
        }),
        timeline: Some(TimelineOverrides {
            min_severity: Some(Severity::Critical),
            ..TimelineOverrides::default()
        }),
    };
    let config = KindredConfig::load(Some(&path), overrides).unwrap();
    assert_eq!(config.dedup.threshold, 0.9);
    assert_eq!(config.timeline.min_severity, Severity::Critical);
}

#[test]
fn environment_beats_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kindred.toml");
    fs::write(&path, "[timeline]\nmax_parent_age = 65\n").unwrap();

    std::env::set_var("KINDRED_TIMELINE__MAX_PARENT_AGE", "70");
    let config = KindredConfig::from_env(Some(&path));
    std::env::remove_var("KINDRED_TIMELINE__MAX_PARENT_AGE");

    assert_eq!(config.unwrap().timeline.max_parent_age, 70);
}

#[test]
fn invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();

    let weights = dir.path().join("weights.toml");
    fs::write(&weights, "[dedup.weights]\nsurname = 0.9\n").unwrap();
    assert!(KindredConfig::from_env(Some(&weights)).is_err());

    let bounds = dir.path().join("bounds.toml");
    fs::write(&bounds, "[timeline]\nmin_parent_age = -1\n").unwrap();
    let err = KindredConfig::from_env(Some(&bounds)).unwrap_err();
    assert!(err.to_string().contains("min_parent_age"));

    let malformed = dir.path().join("malformed.toml");
    fs::write(&malformed, "[dedup]\nthreshold = \"high\"\n").unwrap();
    assert!(KindredConfig::from_env(Some(&malformed)).is_err());
}
