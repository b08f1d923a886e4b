//! # Kindred
//!
//! Duplicate-person resolution and structural/timeline validation for
//! genealogical family-tree snapshots.
//!
//! Every analysis is a pure function over an immutable [`Snapshot`]: the
//! duplicate pipeline produces [`DuplicateCluster`]s, the validators produce
//! [`ValidationIssue`]s, and nothing is rendered or written back.

pub mod blocking;
pub mod config;
pub mod coverage;
pub mod dsu;
pub mod error;
pub mod graph;
pub mod index;
pub mod issues;
pub mod linker;
pub mod model;
pub mod normalize;
pub mod persistence;
pub mod phonetic;
pub mod profile;
pub mod relationships;
pub mod scoring;
pub mod store;
pub mod temporal;
pub mod test_support;
pub mod timeline;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigOverrides, KindredConfig};
pub use coverage::ResearchPriority;
pub use dsu::DuplicateCluster;
pub use error::{AnalysisError, AnalysisResult, LoadError};
pub use issues::{Severity, ValidationIssue};
pub use linker::DedupOptions;
pub use model::{Person, PersonId, Relationship};
pub use relationships::{RelationshipCheck, RelationshipOptions};
pub use scoring::{CandidatePair, Disqualification, ScoreBreakdown};
pub use store::{QueryScope, Snapshot, SnapshotSource};
pub use temporal::DateRange;
pub use timeline::TimelineOptions;

use serde::Serialize;

/// Output of [`Kindred::run_all`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub persons: usize,
    pub relationships: usize,
    pub duplicate_clusters: Vec<DuplicateCluster>,
    pub relationship_issues: Vec<ValidationIssue>,
    pub timeline_issues: Vec<ValidationIssue>,
}

/// Main API: one snapshot plus the configuration analyses run with.
#[derive(Debug, Clone)]
pub struct Kindred {
    snapshot: Snapshot,
    config: KindredConfig,
}

impl Kindred {
    /// Validates the configuration before any analysis can run
    pub fn new(snapshot: Snapshot, config: KindredConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self { snapshot, config })
    }

    /// Load a snapshot from a source and wrap it
    pub fn load(
        source: &dyn SnapshotSource,
        scope: &QueryScope,
        config: KindredConfig,
    ) -> Result<Self, LoadError> {
        let snapshot = source.load(scope)?;
        Ok(Self::new(snapshot, config)?)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &KindredConfig {
        &self.config
    }

    pub fn find_duplicate_clusters(
        &self,
        options: &DedupOptions,
    ) -> AnalysisResult<Vec<DuplicateCluster>> {
        linker::find_duplicate_clusters(&self.snapshot, options, &self.config.dedup)
    }

    /// Pairs at or above the configured likely-duplicate threshold
    pub fn find_likely_duplicates(&self) -> AnalysisResult<Vec<CandidatePair>> {
        linker::find_likely_duplicates(
            &self.snapshot,
            self.config.dedup.likely_threshold,
            &self.config.dedup,
        )
    }

    pub fn compare_persons(&self, a: &PersonId, b: &PersonId) -> AnalysisResult<ScoreBreakdown> {
        linker::compare_persons(&self.snapshot, a, b, &self.config.dedup)
    }

    /// Structural checks, optionally limited to one person's family
    pub fn validate_relationships(
        &self,
        start_person: Option<&PersonId>,
    ) -> AnalysisResult<Vec<ValidationIssue>> {
        let mut options = self.config.relationships.options();
        options.start_person = start_person.cloned();
        relationships::validate_relationships(&self.snapshot, &options)
    }

    /// Chronology checks, optionally limited to one person
    pub fn validate_timeline(
        &self,
        person: Option<&PersonId>,
    ) -> AnalysisResult<Vec<ValidationIssue>> {
        let mut options = self.config.timeline.options();
        options.person = person.cloned();
        timeline::validate_timeline(&self.snapshot, &options)
    }

    /// Research priorities over the configured number of ancestor generations
    pub fn source_coverage(&self, root: &PersonId) -> AnalysisResult<Vec<ResearchPriority>> {
        coverage::analyze_source_coverage(&self.snapshot, root, self.config.coverage.generations)
    }

    /// Run the three pipelines concurrently over the whole snapshot.
    pub fn run_all(&self) -> AnalysisResult<AnalysisReport> {
        let (clusters, (relationship_issues, timeline_issues)) = rayon::join(
            || self.find_duplicate_clusters(&DedupOptions::default()),
            || {
                rayon::join(
                    || self.validate_relationships(None),
                    || self.validate_timeline(None),
                )
            },
        );

        Ok(AnalysisReport {
            persons: self.snapshot.len(),
            relationships: self.snapshot.relationships().len(),
            duplicate_clusters: clusters?,
            relationship_issues: relationship_issues?,
            timeline_issues: timeline_issues?,
        })
    }
}
