//! # Relationship Graph Validation
//!
//! Structural checks over the family graph:
//!
//! - circular ancestry, via an iterative colour DFS along parent→child edges
//! - orphan references, edges naming ids absent from the snapshot
//! - invalid unions, spouses whose marriages are definitely concurrent
//!   beyond the allowance, or a union with oneself
//! - excess parents, more biological parents than possible
//!
//! The graph may be malformed; a cycle in one branch never stops the
//! traversal of another, and every finding is returned.

use crate::config::{
    RelationshipConfig, DEFAULT_MAX_BIOLOGICAL_PARENTS, DEFAULT_MAX_CONCURRENT_SPOUSES,
};
use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::FamilyGraph;
use crate::issues::{sort_issues, ValidationIssue};
use crate::model::{Gender, PersonId};
use crate::store::{PersonIdx, Snapshot};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// A structural check that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipCheck {
    Circular,
    Orphans,
    Marriages,
    Parents,
}

impl RelationshipCheck {
    pub const ALL: [RelationshipCheck; 4] = [
        RelationshipCheck::Circular,
        RelationshipCheck::Orphans,
        RelationshipCheck::Marriages,
        RelationshipCheck::Parents,
    ];
}

/// Options for one validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipOptions {
    /// Restrict the checks to this person's connected family
    pub start_person: Option<PersonId>,
    pub checks: BTreeSet<RelationshipCheck>,
    /// Spouses a person may have at the same instant
    pub max_concurrent_spouses: usize,
    pub max_biological_parents: usize,
}

impl Default for RelationshipOptions {
    fn default() -> Self {
        Self {
            start_person: None,
            checks: RelationshipCheck::ALL.into_iter().collect(),
            max_concurrent_spouses: DEFAULT_MAX_CONCURRENT_SPOUSES,
            max_biological_parents: DEFAULT_MAX_BIOLOGICAL_PARENTS,
        }
    }
}

impl RelationshipOptions {
    pub fn from_config(config: &RelationshipConfig) -> Self {
        Self {
            start_person: None,
            checks: config.checks.iter().copied().collect(),
            max_concurrent_spouses: config.max_concurrent_spouses,
            max_biological_parents: config.max_biological_parents,
        }
    }

    pub fn with_start_person(mut self, id: impl Into<PersonId>) -> Self {
        self.start_person = Some(id.into());
        self
    }

    pub fn with_checks(mut self, checks: impl IntoIterator<Item = RelationshipCheck>) -> Self {
        self.checks = checks.into_iter().collect();
        self
    }

    fn validate(&self) -> AnalysisResult<()> {
        if self.checks.is_empty() {
            return Err(AnalysisError::input("at least one relationship check is required"));
        }
        if self.max_concurrent_spouses == 0 {
            return Err(AnalysisError::configuration(
                "max_concurrent_spouses must be at least 1",
            ));
        }
        if self.max_biological_parents == 0 {
            return Err(AnalysisError::configuration(
                "max_biological_parents must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Run the requested structural checks and return every finding in report order.
#[instrument(skip(snapshot, options), level = "debug")]
pub fn validate_relationships(
    snapshot: &Snapshot,
    options: &RelationshipOptions,
) -> AnalysisResult<Vec<ValidationIssue>> {
    options.validate()?;
    let graph = FamilyGraph::build(snapshot);
    let scope = match &options.start_person {
        Some(id) => Scope::Component(graph.component_of(snapshot.require(id)?)),
        None => Scope::All,
    };

    let mut issues = Vec::new();
    for check in &options.checks {
        let before = issues.len();
        match check {
            RelationshipCheck::Circular => find_cycles(snapshot, &graph, &scope, &mut issues),
            RelationshipCheck::Orphans => find_orphans(snapshot, &graph, &scope, &mut issues),
            RelationshipCheck::Marriages => {
                find_invalid_unions(snapshot, &graph, &scope, options, &mut issues)
            }
            RelationshipCheck::Parents => {
                find_excess_parents(snapshot, &graph, &scope, options, &mut issues)
            }
        }
        debug!(check = ?check, found = issues.len() - before, "relationship check finished");
    }

    sort_issues(&mut issues);
    Ok(issues)
}

enum Scope {
    All,
    Component(Vec<bool>),
}

impl Scope {
    fn contains(&self, idx: PersonIdx) -> bool {
        match self {
            Scope::All => true,
            Scope::Component(mask) => mask[idx as usize],
        }
    }

    fn is_restricted(&self) -> bool {
        matches!(self, Scope::Component(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    White,
    Grey,
    Black,
}

fn find_cycles(
    snapshot: &Snapshot,
    graph: &FamilyGraph,
    scope: &Scope,
    issues: &mut Vec<ValidationIssue>,
) {
    let n = graph.len();
    let mut colour = vec![Colour::White; n];
    let mut reported: FxHashSet<Vec<PersonIdx>> = FxHashSet::default();

    // Roots first, then whatever remains (pure cycles have no root).
    let starts = graph
        .roots()
        .chain(0..n as PersonIdx)
        .filter(|&idx| scope.contains(idx));

    let mut path: Vec<PersonIdx> = Vec::new();
    let mut frames: Vec<(PersonIdx, usize)> = Vec::new();
    for start in starts {
        if colour[start as usize] != Colour::White {
            continue;
        }
        colour[start as usize] = Colour::Grey;
        path.push(start);
        frames.push((start, 0));

        while let Some(frame) = frames.last_mut() {
            let (node, cursor) = *frame;
            let children = graph.children(node);
            if cursor == children.len() {
                colour[node as usize] = Colour::Black;
                frames.pop();
                path.pop();
                continue;
            }
            frame.1 += 1;

            let child = children[cursor];
            match colour[child as usize] {
                Colour::White => {
                    colour[child as usize] = Colour::Grey;
                    path.push(child);
                    frames.push((child, 0));
                }
                Colour::Grey => {
                    let Some(at) = path.iter().position(|&idx| idx == child) else {
                        continue;
                    };
                    let cycle = canonical_cycle(&path[at..]);
                    if reported.insert(cycle.clone()) {
                        issues.push(cycle_issue(snapshot, &cycle, node, child));
                    }
                }
                Colour::Black => {}
            }
        }
    }
}

/// Rotate a cycle so its smallest member comes first, keeping edge order.
fn canonical_cycle(members: &[PersonIdx]) -> Vec<PersonIdx> {
    let Some(pivot) = members
        .iter()
        .enumerate()
        .min_by_key(|(_, idx)| **idx)
        .map(|(position, _)| position)
    else {
        return Vec::new();
    };
    members[pivot..]
        .iter()
        .chain(&members[..pivot])
        .copied()
        .collect()
}

fn cycle_issue(
    snapshot: &Snapshot,
    cycle: &[PersonIdx],
    from: PersonIdx,
    to: PersonIdx,
) -> ValidationIssue {
    let id = |idx: PersonIdx| snapshot.person_at(idx).id.clone();
    let explanation = if cycle.len() == 1 {
        format!("{} is recorded as their own parent", snapshot.person_at(to).label())
    } else {
        let chain: Vec<String> = cycle
            .iter()
            .chain(cycle.first())
            .map(|&idx| id(idx).to_string())
            .collect();
        format!(
            "ancestry loops back on itself: {} (closed by {} -> {})",
            chain.join(" -> "),
            id(from),
            id(to)
        )
    };
    ValidationIssue::CircularAncestry {
        cycle: cycle.iter().map(|&idx| id(idx)).collect(),
        closing_edge: (id(from), id(to)),
        explanation,
    }
}

fn find_orphans(
    snapshot: &Snapshot,
    graph: &FamilyGraph,
    scope: &Scope,
    issues: &mut Vec<ValidationIssue>,
) {
    for edge in graph.dangling() {
        let present = [&edge.from, &edge.to]
            .into_iter()
            .filter_map(|id| snapshot.index_of(id))
            .collect::<Vec<_>>();
        let in_scope = if present.is_empty() {
            !scope.is_restricted()
        } else {
            present.iter().any(|&idx| scope.contains(idx))
        };
        if !in_scope {
            continue;
        }

        for missing in &edge.missing {
            issues.push(ValidationIssue::OrphanReference {
                missing: missing.clone(),
                relationship: edge.kind,
                from: edge.from.clone(),
                to: edge.to.clone(),
                explanation: format!(
                    "{} edge {} -> {} references {}, which is not in the tree",
                    edge.kind, edge.from, edge.to, missing
                ),
            });
        }
    }
}

fn find_invalid_unions(
    snapshot: &Snapshot,
    graph: &FamilyGraph,
    scope: &Scope,
    options: &RelationshipOptions,
    issues: &mut Vec<ValidationIssue>,
) {
    for &idx in graph.self_unions() {
        if !scope.contains(idx) {
            continue;
        }
        let person = snapshot.person_at(idx);
        issues.push(ValidationIssue::InvalidUnion {
            person: person.id.clone(),
            spouses: vec![person.id.clone()],
            explanation: format!("{} is recorded as married to themselves", person.label()),
        });
    }

    for idx in (0..graph.len() as PersonIdx).filter(|&idx| scope.contains(idx)) {
        let concurrent = concurrent_spouses(snapshot, graph, idx, options.max_concurrent_spouses);
        if concurrent.is_empty() {
            continue;
        }
        let person = snapshot.person_at(idx);
        let spouses: Vec<PersonId> = concurrent
            .iter()
            .map(|&spouse| snapshot.person_at(spouse).id.clone())
            .collect();
        let names: Vec<String> = concurrent
            .iter()
            .map(|&spouse| snapshot.person_at(spouse).label())
            .collect();
        issues.push(ValidationIssue::InvalidUnion {
            person: person.id.clone(),
            spouses,
            explanation: format!(
                "{} was married to more than {} spouse(s) at once: {}",
                person.label(),
                options.max_concurrent_spouses,
                names.join(", ")
            ),
        });
    }
}

/// Spouses involved in any instant where more than `allowance` marriages of
/// `idx` are definitely in force, sorted. A marriage is definitely in force
/// from the latest possible wedding date until the earliest possible death
/// of either spouse; without all three dates it never is.
fn concurrent_spouses(
    snapshot: &Snapshot,
    graph: &FamilyGraph,
    idx: PersonIdx,
    allowance: usize,
) -> Vec<PersonIdx> {
    let Some(own_death) = snapshot.person_at(idx).death() else {
        return Vec::new();
    };

    // (key, opens, spouse); opens sort before closes at the same key
    let mut events: Vec<(i32, bool, PersonIdx)> = Vec::new();
    for link in graph.spouses(idx) {
        let (Some(married), Some(spouse_death)) =
            (link.date, snapshot.person_at(link.spouse).death())
        else {
            continue;
        };
        let start = married.latest;
        let end = own_death.earliest.min(spouse_death.earliest);
        if married.is_unknown() || start > end {
            continue;
        }
        events.push((start, true, link.spouse));
        events.push((end, false, link.spouse));
    }
    if events.len() / 2 <= allowance {
        return Vec::new();
    }
    events.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

    let mut active: Vec<PersonIdx> = Vec::new();
    let mut flagged: BTreeSet<PersonIdx> = BTreeSet::new();
    for (_, opens, spouse) in events {
        if opens {
            active.push(spouse);
            if active.len() > allowance {
                flagged.extend(active.iter().copied());
            }
        } else if let Some(position) = active.iter().position(|&s| s == spouse) {
            active.swap_remove(position);
        }
    }
    flagged.into_iter().collect()
}

fn find_excess_parents(
    snapshot: &Snapshot,
    graph: &FamilyGraph,
    scope: &Scope,
    options: &RelationshipOptions,
    issues: &mut Vec<ValidationIssue>,
) {
    for idx in (0..graph.len() as PersonIdx).filter(|&idx| scope.contains(idx)) {
        let mut biological: Vec<PersonIdx> = graph
            .parents(idx)
            .iter()
            .filter(|link| link.role.is_biological())
            .map(|link| link.parent)
            .collect();
        biological.sort_unstable();

        let count_gender = |gender: Gender| {
            biological
                .iter()
                .filter(|&&parent| snapshot.person_at(parent).gender == gender)
                .count()
        };
        let (mothers, fathers) = (count_gender(Gender::Female), count_gender(Gender::Male));

        let child = snapshot.person_at(idx);
        let reason = if biological.len() > options.max_biological_parents {
            format!(
                "{} has {} biological parents (at most {} expected)",
                child.label(),
                biological.len(),
                options.max_biological_parents
            )
        } else if mothers > 1 {
            format!("{} has {} biological mothers", child.label(), mothers)
        } else if fathers > 1 {
            format!("{} has {} biological fathers", child.label(), fathers)
        } else {
            continue;
        };

        issues.push(ValidationIssue::ExcessParents {
            child: child.id.clone(),
            parents: biological
                .iter()
                .map(|&parent| snapshot.person_at(parent).id.clone())
                .collect(),
            explanation: reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParentRole, Person, Relationship};
    use crate::temporal::DateRange;

    fn snapshot(persons: Vec<Person>, relationships: Vec<Relationship>) -> Snapshot {
        Snapshot::new(persons, relationships).unwrap()
    }

    fn people(ids: &[&str]) -> Vec<Person> {
        ids.iter().map(|id| Person::new(*id)).collect()
    }

    #[test]
    fn test_three_cycle_reported_once() {
        let snapshot = snapshot(
            people(&["P1", "P2", "P3"]),
            vec![
                Relationship::parent_child("P1", "P2"),
                Relationship::parent_child("P2", "P3"),
                Relationship::parent_child("P3", "P1"),
            ],
        );
        let issues = validate_relationships(&snapshot, &RelationshipOptions::default()).unwrap();

        assert_eq!(issues.len(), 1);
        match &issues[0] {
            ValidationIssue::CircularAncestry {
                cycle, closing_edge, ..
            } => {
                let ids: Vec<&str> = cycle.iter().map(PersonId::as_str).collect();
                assert_eq!(ids, vec!["P1", "P2", "P3"]);
                assert_eq!(closing_edge.0.as_str(), "P3");
                assert_eq!(closing_edge.1.as_str(), "P1");
            }
            other => panic!("unexpected issue {:?}", other),
        }
    }

    #[test]
    fn test_cycle_does_not_hide_other_branches() {
        let snapshot = snapshot(
            people(&["A", "B", "C", "D"]),
            vec![
                Relationship::parent_child("A", "A"),
                Relationship::parent_child("B", "C"),
                Relationship::parent_child("C", "D"),
                Relationship::parent_child("D", "C"),
                Relationship::parent_child("GHOST", "B"),
            ],
        );
        let issues = validate_relationships(&snapshot, &RelationshipOptions::default()).unwrap();
        let kinds: Vec<&str> = issues.iter().map(ValidationIssue::kind).collect();
        assert_eq!(
            kinds,
            vec!["circular_ancestry", "circular_ancestry", "orphan_reference"]
        );
    }

    #[test]
    fn test_start_person_limits_to_component() {
        let snapshot = snapshot(
            people(&["A", "B", "X", "Y"]),
            vec![
                Relationship::parent_child("A", "B"),
                Relationship::parent_child("B", "A"),
                Relationship::parent_child("X", "Y"),
                Relationship::parent_child("Y", "X"),
            ],
        );
        let options = RelationshipOptions::default().with_start_person("X");
        let issues = validate_relationships(&snapshot, &options).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].involves(&"Y".into()));

        let unknown = RelationshipOptions::default().with_start_person("nobody");
        assert!(matches!(
            validate_relationships(&snapshot, &unknown),
            Err(AnalysisError::Input(_))
        ));
    }

    #[test]
    fn test_empty_check_set_rejected() {
        let snapshot = snapshot(people(&["A"]), Vec::new());
        let options = RelationshipOptions::default().with_checks([]);
        assert!(matches!(
            validate_relationships(&snapshot, &options),
            Err(AnalysisError::Input(_))
        ));
    }

    #[test]
    fn test_concurrent_marriages_need_complete_dates() {
        let husband = Person::new("H").with_death(DateRange::year(1950));
        let first = Person::new("W1").with_death(DateRange::year(1940));
        let second = Person::new("W2").with_death(DateRange::year(1960));
        let third = Person::new("W3");
        let snapshot = snapshot(
            vec![husband, first, second, third],
            vec![
                Relationship::spouse("H", "W1").with_date(DateRange::year(1900)),
                Relationship::spouse("H", "W2").with_date(DateRange::year(1920)),
                Relationship::spouse("H", "W3").with_date(DateRange::year(1910)),
            ],
        );
        let options = RelationshipOptions::default().with_checks([RelationshipCheck::Marriages]);
        let issues = validate_relationships(&snapshot, &options).unwrap();

        assert_eq!(issues.len(), 1);
        match &issues[0] {
            ValidationIssue::InvalidUnion {
                person, spouses, ..
            } => {
                assert_eq!(person.as_str(), "H");
                let ids: Vec<&str> = spouses.iter().map(PersonId::as_str).collect();
                assert_eq!(ids, vec!["W1", "W2"]);
            }
            other => panic!("unexpected issue {:?}", other),
        }

        let allowance = RelationshipOptions {
            max_concurrent_spouses: 2,
            ..options
        };
        assert!(validate_relationships(&snapshot, &allowance).unwrap().is_empty());
    }

    #[test]
    fn test_sequential_marriages_are_fine() {
        let snapshot = snapshot(
            vec![
                Person::new("H").with_death(DateRange::year(1950)),
                Person::new("W1").with_death(DateRange::year(1905)),
                Person::new("W2").with_death(DateRange::year(1960)),
            ],
            vec![
                Relationship::spouse("H", "W1").with_date(DateRange::year(1900)),
                Relationship::spouse("W2", "H").with_date(DateRange::year(1910)),
            ],
        );
        let options = RelationshipOptions::default().with_checks([RelationshipCheck::Marriages]);
        assert!(validate_relationships(&snapshot, &options).unwrap().is_empty());
    }

    #[test]
    fn test_self_union() {
        let snapshot = snapshot(people(&["A"]), vec![Relationship::spouse("A", "A")]);
        let issues = validate_relationships(&snapshot, &RelationshipOptions::default()).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind(), "invalid_union");
    }

    #[test]
    fn test_excess_parents() {
        let mut persons = people(&["C", "M1", "M2", "S"]);
        persons[1].gender = Gender::Female;
        persons[2].gender = Gender::Female;
        let snapshot = snapshot(
            persons,
            vec![
                Relationship::parent_child("M1", "C"),
                Relationship::parent_child("M2", "C"),
                Relationship::parent_child("S", "C").with_role(ParentRole::Step),
            ],
        );
        let options = RelationshipOptions::default().with_checks([RelationshipCheck::Parents]);
        let issues = validate_relationships(&snapshot, &options).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].explanation().contains("2 biological mothers"));
    }
}
