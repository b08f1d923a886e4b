//! # Linker Module
//!
//! The duplicate detection pipeline: profile every in-scope person, index
//! their phonetic keys, block candidate pairs, score them (in parallel when
//! configured) and merge the matches into transitively closed clusters.
//!
//! All run state lives in a [`DedupContext`] owned by one invocation.

use crate::blocking::CandidateBlocker;
use crate::config::DedupConfig;
use crate::dsu::{build_clusters, DuplicateCluster, MatchedPair};
use crate::error::{ensure_in_range, AnalysisError, AnalysisResult};
use crate::graph::FamilyGraph;
use crate::index::PhoneticIndex;
use crate::model::{Person, PersonId};
use crate::normalize::fold_text;
use crate::profile::{build_profiles, PersonProfile};
use crate::scoring::{CandidatePair, ScoreBreakdown, SimilarityScorer};
use crate::store::{PersonIdx, Snapshot};
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Per-call options for [`find_duplicate_clusters`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOptions {
    /// Only persons with a surname containing this text take part
    pub surname_filter: Option<String>,
    /// Overrides the configured match threshold
    pub threshold: Option<f64>,
}

impl DedupOptions {
    pub fn with_surname(mut self, surname: impl Into<String>) -> Self {
        self.surname_filter = Some(surname.into());
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// Run-scoped state of one duplicate detection call.
#[derive(Debug)]
pub struct DedupContext<'a> {
    snapshot: &'a Snapshot,
    profiles: Vec<PersonProfile>,
    /// Position of each person's profile, `None` when out of scope
    positions: Vec<Option<usize>>,
    index: PhoneticIndex,
    scorer: SimilarityScorer,
    max_block_size: usize,
    parallel: bool,
}

impl<'a> DedupContext<'a> {
    /// Profile and index the given persons
    pub fn new(
        snapshot: &'a Snapshot,
        persons: &[PersonIdx],
        config: &DedupConfig,
    ) -> AnalysisResult<Self> {
        let scorer = SimilarityScorer::from_config(config)?;
        let graph = FamilyGraph::build(snapshot);
        let profiles = build_profiles(snapshot, &graph, persons);

        let mut positions = vec![None; snapshot.len()];
        for (position, profile) in profiles.iter().enumerate() {
            positions[profile.idx as usize] = Some(position);
        }
        let index = PhoneticIndex::build(&profiles);
        debug!(
            profiles = profiles.len(),
            keys = index.len(),
            "dedup context ready"
        );

        Ok(Self {
            snapshot,
            profiles,
            positions,
            index,
            scorer,
            max_block_size: config.max_block_size,
            parallel: config.parallel,
        })
    }

    /// Context over every person in the snapshot
    pub fn for_snapshot(snapshot: &'a Snapshot, config: &DedupConfig) -> AnalysisResult<Self> {
        let everyone: Vec<PersonIdx> = (0..snapshot.len()).map(|i| i as PersonIdx).collect();
        Self::new(snapshot, &everyone, config)
    }

    pub fn profiles(&self) -> &[PersonProfile] {
        &self.profiles
    }

    pub fn index(&self) -> &PhoneticIndex {
        &self.index
    }

    pub fn profile(&self, idx: PersonIdx) -> Option<&PersonProfile> {
        let position = (*self.positions.get(idx as usize)?)?;
        self.profiles.get(position)
    }

    pub fn candidates(&self) -> Vec<(PersonIdx, PersonIdx)> {
        CandidateBlocker::new(&self.index, self.max_block_size).generate_candidates()
    }

    fn score_pair(&self, a: PersonIdx, b: PersonIdx) -> Option<ScoreBreakdown> {
        Some(self.scorer.score(self.profile(a)?, self.profile(b)?))
    }

    /// Score every blocked candidate pair, in ascending pair order
    pub fn score_candidates(&self) -> Vec<(PersonIdx, PersonIdx, ScoreBreakdown)> {
        let candidates = self.candidates();
        let score = |&(a, b): &(PersonIdx, PersonIdx)| {
            self.score_pair(a, b).map(|breakdown| (a, b, breakdown))
        };

        let mut scored: Vec<_> = if self.parallel {
            candidates.par_iter().filter_map(score).collect()
        } else {
            candidates.iter().filter_map(score).collect()
        };
        scored.sort_by(|x, y| (x.0, x.1).cmp(&(y.0, y.1)));
        debug!(candidates = candidates.len(), scored = scored.len(), "candidates scored");
        scored
    }

    fn candidate_pair(&self, a: PersonIdx, b: PersonIdx, breakdown: ScoreBreakdown) -> CandidatePair {
        CandidatePair {
            a: self.snapshot.person_at(a).id.clone(),
            b: self.snapshot.person_at(b).id.clone(),
            score: breakdown.total,
            breakdown,
        }
    }
}

fn surname_matches(person: &Person, needle: &str) -> bool {
    person
        .names
        .iter()
        .any(|name| fold_text(&name.surname).contains(needle))
}

/// Find clusters of persons that are probably the same individual.
#[instrument(skip(snapshot, config), level = "debug")]
pub fn find_duplicate_clusters(
    snapshot: &Snapshot,
    options: &DedupOptions,
    config: &DedupConfig,
) -> AnalysisResult<Vec<DuplicateCluster>> {
    let threshold = options.threshold.unwrap_or(config.threshold);
    ensure_in_range("threshold", threshold, 0.0, 1.0)?;

    let persons: Vec<PersonIdx> = match options.surname_filter.as_deref() {
        Some(filter) => {
            let needle = fold_text(filter);
            if needle.is_empty() {
                return Err(AnalysisError::input("surname filter must not be blank"));
            }
            snapshot
                .persons()
                .iter()
                .enumerate()
                .filter(|(_, person)| surname_matches(person, &needle))
                .map(|(i, _)| i as PersonIdx)
                .collect()
        }
        None => (0..snapshot.len()).map(|i| i as PersonIdx).collect(),
    };

    let context = DedupContext::new(snapshot, &persons, config)?;
    let matches: Vec<MatchedPair> = context
        .score_candidates()
        .into_iter()
        .filter(|(_, _, breakdown)| breakdown.total >= threshold)
        .map(|(a, b, breakdown)| MatchedPair {
            a,
            b,
            score: breakdown.total,
        })
        .collect();

    let clusters = build_clusters(snapshot, &matches);
    debug!(
        persons = persons.len(),
        matches = matches.len(),
        clusters = clusters.len(),
        "duplicate clusters built"
    );
    Ok(clusters)
}

/// Scored pairs at or above `threshold`, best first.
#[instrument(skip(snapshot, config), level = "debug")]
pub fn find_likely_duplicates(
    snapshot: &Snapshot,
    threshold: f64,
    config: &DedupConfig,
) -> AnalysisResult<Vec<CandidatePair>> {
    ensure_in_range("threshold", threshold, 0.0, 1.0)?;

    let context = DedupContext::for_snapshot(snapshot, config)?;
    let mut pairs: Vec<CandidatePair> = context
        .score_candidates()
        .into_iter()
        .filter(|(_, _, breakdown)| breakdown.total >= threshold)
        .map(|(a, b, breakdown)| context.candidate_pair(a, b, breakdown))
        .collect();

    pairs.sort_by(|x, y| {
        y.score
            .total_cmp(&x.score)
            .then_with(|| (&x.a, &x.b).cmp(&(&y.a, &y.b)))
    });
    debug!(pairs = pairs.len(), "likely duplicates found");
    Ok(pairs)
}

/// Explain how two specific persons compare, blocked or not.
pub fn compare_persons(
    snapshot: &Snapshot,
    a: &PersonId,
    b: &PersonId,
    config: &DedupConfig,
) -> AnalysisResult<ScoreBreakdown> {
    let a = snapshot.require(a)?;
    let b = snapshot.require(b)?;
    let context = DedupContext::new(snapshot, &[a, b], config)?;
    context
        .score_pair(a, b)
        .ok_or_else(|| AnalysisError::input("person outside the comparison scope"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::DateRange;

    fn person(id: &str, given: &str, surname: &str, born: i32) -> Person {
        Person::new(id)
            .with_name(given, surname)
            .with_birth(DateRange::year(born))
    }

    fn sample() -> Snapshot {
        Snapshot::new(
            vec![
                person("P1", "José María", "Martínez", 1900),
                person("P2", "Jose Maria", "Martinez", 1901),
                person("P3", "Ana", "Soto", 1850),
                person("P4", "Ana", "Sotto", 1850),
            ],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_clusters_at_default_threshold() {
        let snapshot = sample();
        let clusters =
            find_duplicate_clusters(&snapshot, &DedupOptions::default(), &DedupConfig::default())
                .unwrap();
        let p1: PersonId = "P1".into();
        let p2: PersonId = "P2".into();

        let cluster = clusters.iter().find(|c| c.contains(&p1)).unwrap();
        assert_eq!(cluster.members, vec![p1, p2]);
        assert_eq!(cluster.links.len(), 1);
        assert!(cluster.links[0].score >= 0.75);
    }

    #[test]
    fn test_surname_filter_limits_scope() {
        let snapshot = sample();
        let options = DedupOptions::default().with_surname("martinez");
        let clusters =
            find_duplicate_clusters(&snapshot, &options, &DedupConfig::default()).unwrap();
        assert_eq!(clusters.len(), 1);
        assert!(!clusters[0].contains(&"P3".into()));

        let blank = DedupOptions::default().with_surname("  ");
        assert!(find_duplicate_clusters(&snapshot, &blank, &DedupConfig::default()).is_err());
    }

    #[test]
    fn test_threshold_out_of_range() {
        let snapshot = sample();
        let options = DedupOptions::default().with_threshold(1.2);
        assert!(matches!(
            find_duplicate_clusters(&snapshot, &options, &DedupConfig::default()),
            Err(AnalysisError::Configuration(_))
        ));
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let snapshot = sample();
        let parallel = DedupConfig::default();
        let sequential = DedupConfig {
            parallel: false,
            ..DedupConfig::default()
        };
        let a = find_likely_duplicates(&snapshot, 0.5, &parallel).unwrap();
        let b = find_likely_duplicates(&snapshot, 0.5, &sequential).unwrap();
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_compare_persons_breakdown() {
        let snapshot = sample();
        let breakdown = compare_persons(
            &snapshot,
            &"P1".into(),
            &"P2".into(),
            &DedupConfig::default(),
        )
        .unwrap();
        assert!((breakdown.available_weight - 0.60).abs() < 1e-9);
        assert!((breakdown.total - 0.95).abs() < 1e-9);

        assert!(compare_persons(&snapshot, &"P1".into(), &"NOPE".into(), &DedupConfig::default())
            .is_err());
    }
}
