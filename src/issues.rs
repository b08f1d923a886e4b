//! # Validation Issues
//!
//! Data-quality findings reported by the relationship and timeline
//! validators. Findings are plain values carrying the implicated person ids
//! and a factual explanation; presentation is left to callers.

use crate::model::{PersonId, RelationshipKind};
use crate::temporal::YearSpan;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// How serious a finding is.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// Which chronological rule an `ImpossibleDate` breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateConflict {
    DeathBeforeBirth,
    LifespanExceeded,
    ParentDiedBeforeBirth,
    MarriageOutsideLifespan,
}

/// Which side of the parent-age window was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBound {
    BelowMinimum,
    AboveMaximum,
}

/// A single data-quality finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// Parent/child edges that lead back to where they started
    CircularAncestry {
        /// Cycle members in edge order, starting from the smallest id
        cycle: Vec<PersonId>,
        /// The parent→child edge that closed the cycle
        closing_edge: (PersonId, PersonId),
        explanation: String,
    },
    /// An edge naming a person that is not in the snapshot
    OrphanReference {
        missing: PersonId,
        relationship: RelationshipKind,
        from: PersonId,
        to: PersonId,
        explanation: String,
    },
    /// More concurrent spouses than allowed, or a union with oneself
    InvalidUnion {
        person: PersonId,
        spouses: Vec<PersonId>,
        explanation: String,
    },
    ImpossibleDate {
        person: PersonId,
        reason: DateConflict,
        /// The other person involved, for parent and marriage conflicts
        #[serde(default, skip_serializing_if = "Option::is_none")]
        related: Option<PersonId>,
        explanation: String,
    },
    AgeOutOfBounds {
        parent: PersonId,
        child: PersonId,
        bound: AgeBound,
        /// Possible ages of the parent at the child's birth
        age: YearSpan,
        explanation: String,
    },
    /// Spouses whose lifespans cannot have overlapped
    OverlappingLifespan {
        person: PersonId,
        spouse: PersonId,
        explanation: String,
    },
    /// More biological parents than a person can have
    ExcessParents {
        child: PersonId,
        parents: Vec<PersonId>,
        explanation: String,
    },
}

impl ValidationIssue {
    /// Stable snake_case name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationIssue::CircularAncestry { .. } => "circular_ancestry",
            ValidationIssue::OrphanReference { .. } => "orphan_reference",
            ValidationIssue::InvalidUnion { .. } => "invalid_union",
            ValidationIssue::ImpossibleDate { .. } => "impossible_date",
            ValidationIssue::AgeOutOfBounds { .. } => "age_out_of_bounds",
            ValidationIssue::OverlappingLifespan { .. } => "overlapping_lifespan",
            ValidationIssue::ExcessParents { .. } => "excess_parents",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ValidationIssue::CircularAncestry { .. } => 0,
            ValidationIssue::OrphanReference { .. } => 1,
            ValidationIssue::InvalidUnion { .. } => 2,
            ValidationIssue::ExcessParents { .. } => 3,
            ValidationIssue::ImpossibleDate { .. } => 4,
            ValidationIssue::AgeOutOfBounds { .. } => 5,
            ValidationIssue::OverlappingLifespan { .. } => 6,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ValidationIssue::CircularAncestry { .. } => Severity::Critical,
            ValidationIssue::OrphanReference { .. } => Severity::Warning,
            ValidationIssue::InvalidUnion { .. } => Severity::Warning,
            ValidationIssue::ExcessParents { .. } => Severity::Warning,
            ValidationIssue::ImpossibleDate { reason, .. } => match reason {
                DateConflict::LifespanExceeded => Severity::Warning,
                DateConflict::DeathBeforeBirth
                | DateConflict::ParentDiedBeforeBirth
                | DateConflict::MarriageOutsideLifespan => Severity::Critical,
            },
            ValidationIssue::AgeOutOfBounds { bound, .. } => match bound {
                AgeBound::BelowMinimum => Severity::Critical,
                AgeBound::AboveMaximum => Severity::Warning,
            },
            ValidationIssue::OverlappingLifespan { .. } => Severity::Critical,
        }
    }

    /// Every person id the finding mentions
    pub fn persons(&self) -> Vec<&PersonId> {
        match self {
            ValidationIssue::CircularAncestry { cycle, .. } => cycle.iter().collect(),
            ValidationIssue::OrphanReference { from, to, .. } => vec![from, to],
            ValidationIssue::InvalidUnion {
                person, spouses, ..
            } => std::iter::once(person).chain(spouses).collect(),
            ValidationIssue::ImpossibleDate {
                person, related, ..
            } => std::iter::once(person).chain(related).collect(),
            ValidationIssue::AgeOutOfBounds { parent, child, .. } => vec![parent, child],
            ValidationIssue::OverlappingLifespan { person, spouse, .. } => vec![person, spouse],
            ValidationIssue::ExcessParents { child, parents, .. } => {
                std::iter::once(child).chain(parents).collect()
            }
        }
    }

    pub fn involves(&self, id: &PersonId) -> bool {
        self.persons().contains(&id)
    }

    pub fn explanation(&self) -> &str {
        match self {
            ValidationIssue::CircularAncestry { explanation, .. }
            | ValidationIssue::OrphanReference { explanation, .. }
            | ValidationIssue::InvalidUnion { explanation, .. }
            | ValidationIssue::ImpossibleDate { explanation, .. }
            | ValidationIssue::AgeOutOfBounds { explanation, .. }
            | ValidationIssue::OverlappingLifespan { explanation, .. }
            | ValidationIssue::ExcessParents { explanation, .. } => explanation,
        }
    }

    /// Deterministic report order: by kind, then implicated persons
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.persons().cmp(&other.persons()))
            .then_with(|| self.explanation().cmp(other.explanation()))
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.kind(), self.explanation())
    }
}

/// Sort findings into report order and drop exact duplicates.
pub fn sort_issues(issues: &mut Vec<ValidationIssue>) {
    issues.sort_by(|a, b| a.report_order(b));
    issues.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orphan(from: &str, to: &str) -> ValidationIssue {
        ValidationIssue::OrphanReference {
            missing: to.into(),
            relationship: RelationshipKind::ParentChild,
            from: from.into(),
            to: to.into(),
            explanation: format!("{} references missing {}", from, to),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert_eq!(orphan("A", "B").severity(), Severity::Warning);
    }

    #[test]
    fn test_sort_by_kind_then_persons() {
        let cycle = ValidationIssue::CircularAncestry {
            cycle: vec!["Z".into()],
            closing_edge: ("Z".into(), "Z".into()),
            explanation: "Z is their own ancestor".to_string(),
        };
        let mut issues = vec![orphan("B", "X"), cycle.clone(), orphan("A", "X"), orphan("A", "X")];
        sort_issues(&mut issues);

        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0], cycle);
        assert!(issues[1].involves(&"A".into()));
    }

    #[test]
    fn test_serialized_with_type_tag() {
        let json = serde_json::to_value(orphan("A", "B")).unwrap();
        assert_eq!(json["type"], "orphan_reference");
        assert_eq!(json["relationship"], "parent_child");
    }
}
