//! # Source Coverage
//!
//! Research prioritization over a person's ancestry: which ancestors have
//! vital or important facts that no source supports, weighted so that close
//! relatives and completely unsourced persons come first.

use crate::error::AnalysisResult;
use crate::graph::FamilyGraph;
use crate::model::{FactKind, Person, PersonId};
use crate::store::Snapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

const GENERATION_POINTS: u32 = 10;
const VITAL_MISSING_POINTS: u32 = 5;
const IMPORTANT_MISSING_POINTS: u32 = 2;
const UNSOURCED_POINTS: u32 = 10;

/// Unsupported facts of one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonCoverage {
    pub total_sources: usize,
    pub vital_missing: usize,
    pub important_missing: usize,
    /// Kinds of the unsupported facts, in fact order
    pub missing_events: Vec<FactKind>,
}

/// One ancestor worth researching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPriority {
    pub person: PersonId,
    pub name: String,
    /// Distance from the root person, who is generation 0
    pub generation: u32,
    pub priority_score: u32,
    #[serde(flatten)]
    pub coverage: PersonCoverage,
}

/// Fact kinds a person's sources are tagged with. A reference such as
/// `Birth:parish-register-12` supports birth facts.
fn tagged_kinds(person: &Person) -> BTreeSet<FactKind> {
    person
        .sources
        .iter()
        .filter_map(|reference| reference.split_once(':'))
        .map(|(tag, _)| FactKind::from_label(tag))
        .filter(|kind| *kind != FactKind::Other)
        .collect()
}

pub fn person_coverage(person: &Person) -> PersonCoverage {
    let supported = tagged_kinds(person);
    let missing: Vec<FactKind> = person
        .facts
        .iter()
        .map(|fact| fact.kind)
        .filter(|kind| (kind.is_vital() || kind.is_important()) && !supported.contains(kind))
        .collect();

    PersonCoverage {
        total_sources: person.sources.len(),
        vital_missing: missing.iter().filter(|kind| kind.is_vital()).count(),
        important_missing: missing.iter().filter(|kind| kind.is_important()).count(),
        missing_events: missing,
    }
}

/// Walk up to `generations` of ancestors from `root` and rank them by how
/// urgently their facts need sources, highest score first.
#[instrument(skip(snapshot), level = "debug")]
pub fn analyze_source_coverage(
    snapshot: &Snapshot,
    root: &PersonId,
    generations: u32,
) -> AnalysisResult<Vec<ResearchPriority>> {
    let root = snapshot.require(root)?;
    let graph = FamilyGraph::build(snapshot);

    let mut priorities: Vec<ResearchPriority> = graph
        .ancestors(root, generations)
        .into_iter()
        .map(|(idx, generation)| {
            let person = snapshot.person_at(idx);
            let coverage = person_coverage(person);
            let unsourced = if coverage.total_sources == 0 {
                UNSOURCED_POINTS
            } else {
                0
            };
            let priority_score = (generations - generation + 1) * GENERATION_POINTS
                + coverage.vital_missing as u32 * VITAL_MISSING_POINTS
                + coverage.important_missing as u32 * IMPORTANT_MISSING_POINTS
                + unsourced;
            ResearchPriority {
                person: person.id.clone(),
                name: person.label(),
                generation,
                priority_score,
                coverage,
            }
        })
        .collect();

    priorities.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.person.cmp(&b.person))
    });
    debug!(ancestors = priorities.len(), "source coverage analyzed");
    Ok(priorities)
}
