mod support;

use kindred_rs::config::DedupConfig;
use kindred_rs::linker::{compare_persons, find_duplicate_clusters, find_likely_duplicates};
use kindred_rs::scoring::{Disqualification, Factor};
use kindred_rs::test_support::generate_tree;
use kindred_rs::{DedupOptions, PersonId};
use support::TreeBuilder;

fn ids(raw: &[&str]) -> Vec<PersonId> {
    raw.iter().map(|id| PersonId::from(*id)).collect()
}

#[test]
fn accented_and_plain_spellings_cluster() {
    let snapshot = TreeBuilder::new()
        .person("P1", "José María", "Martínez")
        .born("P1", "1900")
        .person("P2", "Jose Maria", "Martinez")
        .born("P2", "1901")
        .build();

    let clusters =
        find_duplicate_clusters(&snapshot, &DedupOptions::default(), &DedupConfig::default())
            .unwrap();

    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].members, ids(&["P1", "P2"]));
    assert!((clusters[0].links[0].score - 0.95).abs() < 1e-9);
}

#[test]
fn abbreviations_expand_before_matching() {
    let snapshot = TreeBuilder::new()
        .person("A", "Ma. Guadalupe", "Glez.")
        .born_at("A", 1875, "Guadalajara, Jalisco")
        .person("B", "María Guadalupe", "González")
        .born_at("B", 1875, "Guadalajara")
        .build();

    let breakdown = compare_persons(
        &snapshot,
        &"A".into(),
        &"B".into(),
        &DedupConfig::default(),
    )
    .unwrap();
    assert_eq!(breakdown.factor(Factor::Surname).unwrap().similarity, Some(1.0));
    assert_eq!(breakdown.factor(Factor::GivenName).unwrap().similarity, Some(1.0));
    assert_eq!(breakdown.factor(Factor::BirthPlace).unwrap().similarity, Some(1.0));
    assert!((breakdown.total - 1.0).abs() < 1e-9);
}

#[test]
fn clusters_are_transitive() {
    // A~B and B~C match; A and C differ too much to match directly.
    let snapshot = TreeBuilder::new()
        .person("A", "Juan", "Ibarra")
        .born("A", "1850")
        .person("B", "Juan", "Ibarra")
        .born("B", "1852")
        .person("C", "Juan", "Ibarra")
        .born("C", "1854")
        .build();
    let config = DedupConfig::default();

    let ac = compare_persons(&snapshot, &"A".into(), &"C".into(), &config).unwrap();
    assert!(ac.total < 0.85);

    let options = DedupOptions::default().with_threshold(0.85);
    let clusters = find_duplicate_clusters(&snapshot, &options, &config).unwrap();
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].members, ids(&["A", "B", "C"]));
    assert_eq!(clusters[0].links.len(), 2);
}

#[test]
fn unrelated_persons_stay_apart() {
    let snapshot = TreeBuilder::new()
        .person("A", "Thomas", "Turner")
        .born("A", "1820")
        .person("B", "Rosa", "Ibarra")
        .born("B", "1820")
        .build();
    let clusters =
        find_duplicate_clusters(&snapshot, &DedupOptions::default(), &DedupConfig::default())
            .unwrap();
    assert!(clusters.is_empty());
}

#[test]
fn same_named_father_and_son_stay_apart() {
    let snapshot = TreeBuilder::new()
        .person("FATHER", "Juan", "Martinez")
        .born("FATHER", "1900")
        .person("SON", "Juan", "Martinez")
        .born("SON", "1930")
        .parent("FATHER", "SON")
        .build();
    let config = DedupConfig::default();

    let breakdown = compare_persons(&snapshot, &"FATHER".into(), &"SON".into(), &config).unwrap();
    assert_eq!(breakdown.disqualified, Some(Disqualification::ParentChild));
    assert_eq!(breakdown.total, 0.0);

    let clusters = find_duplicate_clusters(&snapshot, &DedupOptions::default(), &config).unwrap();
    assert!(clusters.is_empty());
}

#[test]
fn distant_birth_years_rule_out_a_match() {
    let snapshot = TreeBuilder::new()
        .person("A", "Juan", "Martinez")
        .born("A", "1900")
        .person("B", "Juan", "Martinez")
        .born("B", "1930")
        .build();
    let config = DedupConfig::default();

    let breakdown = compare_persons(&snapshot, &"A".into(), &"B".into(), &config).unwrap();
    assert_eq!(
        breakdown.disqualified,
        Some(Disqualification::YearConflict(Factor::BirthYear))
    );
    assert!(find_likely_duplicates(&snapshot, 0.0, &config)
        .unwrap()
        .iter()
        .all(|pair| pair.score == 0.0));
    let clusters = find_duplicate_clusters(&snapshot, &DedupOptions::default(), &config).unwrap();
    assert!(clusters.is_empty());
}

#[test]
fn repeated_runs_are_identical() {
    let tree = generate_tree(40, 0.3, 7).unwrap();
    let config = DedupConfig::default();

    let first = find_duplicate_clusters(&tree.snapshot, &DedupOptions::default(), &config).unwrap();
    let second =
        find_duplicate_clusters(&tree.snapshot, &DedupOptions::default(), &config).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn planted_duplicates_are_found() {
    let tree = generate_tree(25, 0.5, 11).unwrap();
    assert!(!tree.planted_duplicates.is_empty());

    let clusters = find_duplicate_clusters(
        &tree.snapshot,
        &DedupOptions::default(),
        &DedupConfig::default(),
    )
    .unwrap();
    for (original, copy) in &tree.planted_duplicates {
        assert!(
            clusters
                .iter()
                .any(|cluster| cluster.contains(original) && cluster.contains(copy)),
            "{} and {} should share a cluster",
            original,
            copy
        );
    }
}

#[test]
fn likely_duplicates_sorted_best_first() {
    let tree = generate_tree(20, 0.5, 3).unwrap();
    let pairs = find_likely_duplicates(&tree.snapshot, 0.85, &DedupConfig::default()).unwrap();
    assert!(pairs.iter().all(|pair| pair.score >= 0.85 && pair.a < pair.b));
    assert!(pairs.windows(2).all(|w| w[0].score >= w[1].score));
}
