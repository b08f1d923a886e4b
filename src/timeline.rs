//! # Timeline Validation
//!
//! Chronological plausibility checks. Every date is an interval, and a check
//! only fires when all resolutions of the partial dates involved violate
//! it; an under-specified date never produces a finding on its own.

use crate::config::{
    TimelineConfig, DEFAULT_MAX_LIFESPAN, DEFAULT_MAX_PARENT_AGE, DEFAULT_MIN_PARENT_AGE,
};
use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::FamilyGraph;
use crate::issues::{sort_issues, AgeBound, DateConflict, Severity, ValidationIssue};
use crate::model::{Gender, ParentRole, Person, PersonId};
use crate::store::{PersonIdx, Snapshot};
use crate::temporal::{years_between, DateRange};
use tracing::{debug, instrument};

/// Options for one validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineOptions {
    /// Check only this person and the edges touching them
    pub person: Option<PersonId>,
    pub max_parent_age: i32,
    pub min_parent_age: i32,
    pub max_lifespan: i32,
    /// Findings below this severity are dropped
    pub min_severity: Severity,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            person: None,
            max_parent_age: DEFAULT_MAX_PARENT_AGE,
            min_parent_age: DEFAULT_MIN_PARENT_AGE,
            max_lifespan: DEFAULT_MAX_LIFESPAN,
            min_severity: Severity::Info,
        }
    }
}

impl TimelineOptions {
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self {
            person: None,
            max_parent_age: config.max_parent_age,
            min_parent_age: config.min_parent_age,
            max_lifespan: config.max_lifespan,
            min_severity: config.min_severity,
        }
    }

    pub fn for_person(mut self, id: impl Into<PersonId>) -> Self {
        self.person = Some(id.into());
        self
    }

    pub(crate) fn validate(&self) -> AnalysisResult<()> {
        if self.min_parent_age < 0 {
            return Err(AnalysisError::configuration(format!(
                "min_parent_age must not be negative, got {}",
                self.min_parent_age
            )));
        }
        if self.min_parent_age > self.max_parent_age {
            return Err(AnalysisError::configuration(format!(
                "min_parent_age ({}) exceeds max_parent_age ({})",
                self.min_parent_age, self.max_parent_age
            )));
        }
        if self.max_lifespan <= 0 {
            return Err(AnalysisError::configuration(format!(
                "max_lifespan must be positive, got {}",
                self.max_lifespan
            )));
        }
        Ok(())
    }
}

/// Check every in-scope person and return findings in report order.
#[instrument(skip(snapshot, options), level = "debug")]
pub fn validate_timeline(
    snapshot: &Snapshot,
    options: &TimelineOptions,
) -> AnalysisResult<Vec<ValidationIssue>> {
    options.validate()?;
    let focus = match &options.person {
        Some(id) => Some(snapshot.require(id)?),
        None => None,
    };
    let graph = FamilyGraph::build(snapshot);
    let checker = TimelineChecker { snapshot, options };

    let mut issues = Vec::new();
    match focus {
        Some(idx) => {
            checker.check_life(idx, &mut issues);
            for link in graph.parents(idx) {
                checker.check_parent_edge(link.parent, idx, link.role, &mut issues);
            }
            for &child in graph.children(idx) {
                let role = graph
                    .parents(child)
                    .iter()
                    .find(|link| link.parent == idx)
                    .map_or(ParentRole::Unknown, |link| link.role);
                checker.check_parent_edge(idx, child, role, &mut issues);
            }
            for link in graph.spouses(idx) {
                checker.check_union(idx, link.spouse, link.date.as_ref(), &mut issues);
            }
        }
        None => {
            for idx in 0..graph.len() as PersonIdx {
                checker.check_life(idx, &mut issues);
                for link in graph.parents(idx) {
                    checker.check_parent_edge(link.parent, idx, link.role, &mut issues);
                }
                for link in graph.spouses(idx).iter().filter(|link| link.spouse > idx) {
                    checker.check_union(idx, link.spouse, link.date.as_ref(), &mut issues);
                }
            }
        }
    }

    let found = issues.len();
    issues.retain(|issue| issue.severity() >= options.min_severity);
    sort_issues(&mut issues);
    debug!(found, reported = issues.len(), "timeline validation finished");
    Ok(issues)
}

struct TimelineChecker<'a> {
    snapshot: &'a Snapshot,
    options: &'a TimelineOptions,
}

impl TimelineChecker<'_> {
    fn person(&self, idx: PersonIdx) -> &Person {
        self.snapshot.person_at(idx)
    }

    /// Birth/death ordering and maximum lifespan of one person.
    fn check_life(&self, idx: PersonIdx, issues: &mut Vec<ValidationIssue>) {
        let person = self.person(idx);
        let (Some(birth), Some(death)) = (person.birth(), person.death()) else {
            return;
        };

        if death.definitely_before(birth) {
            issues.push(ValidationIssue::ImpossibleDate {
                person: person.id.clone(),
                reason: DateConflict::DeathBeforeBirth,
                related: None,
                explanation: format!(
                    "{} died ({}) before being born ({})",
                    person.label(),
                    death,
                    birth
                ),
            });
            return;
        }

        let lifespan = years_between(birth, death);
        if lifespan.entirely_above(self.options.max_lifespan) {
            issues.push(ValidationIssue::ImpossibleDate {
                person: person.id.clone(),
                reason: DateConflict::LifespanExceeded,
                related: None,
                explanation: format!(
                    "{} lived {} years, more than the {} year maximum",
                    person.label(),
                    lifespan,
                    self.options.max_lifespan
                ),
            });
        }
    }

    /// Parent age at the child's birth, and parent death before the birth.
    fn check_parent_edge(
        &self,
        parent_idx: PersonIdx,
        child_idx: PersonIdx,
        role: ParentRole,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if !role.is_biological() || parent_idx == child_idx {
            return;
        }
        let (parent, child) = (self.person(parent_idx), self.person(child_idx));
        let Some(child_birth) = child.birth() else {
            return;
        };

        if let Some(parent_birth) = parent.birth() {
            let age = years_between(parent_birth, child_birth);
            let bound = if age.entirely_below(self.options.min_parent_age) {
                Some((AgeBound::BelowMinimum, "younger than", self.options.min_parent_age))
            } else if age.entirely_above(self.options.max_parent_age) {
                Some((AgeBound::AboveMaximum, "older than", self.options.max_parent_age))
            } else {
                None
            };
            if let Some((bound, relation, limit)) = bound {
                issues.push(ValidationIssue::AgeOutOfBounds {
                    parent: parent.id.clone(),
                    child: child.id.clone(),
                    bound,
                    age,
                    explanation: format!(
                        "{} was {} at the birth of {}, {} {}",
                        parent.label(),
                        age,
                        child.label(),
                        relation,
                        limit
                    ),
                });
            }
        }

        if let Some(parent_death) = parent.death() {
            if died_before_birth(parent.gender, parent_death, child_birth) {
                issues.push(ValidationIssue::ImpossibleDate {
                    person: child.id.clone(),
                    reason: DateConflict::ParentDiedBeforeBirth,
                    related: Some(parent.id.clone()),
                    explanation: format!(
                        "{} was born ({}) after parent {} died ({})",
                        child.label(),
                        child_birth,
                        parent.label(),
                        parent_death
                    ),
                });
            }
        }
    }

    /// Lifespans and marriage date of one couple, checked once per edge.
    fn check_union(
        &self,
        a_idx: PersonIdx,
        b_idx: PersonIdx,
        married: Option<&DateRange>,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let (a, b) = (self.person(a_idx), self.person(b_idx));
        let (a_life, b_life) = (a.lifespan(), b.lifespan());

        if a_life.definitely_before(&b_life) || b_life.definitely_before(&a_life) {
            issues.push(ValidationIssue::OverlappingLifespan {
                person: a.id.clone(),
                spouse: b.id.clone(),
                explanation: format!(
                    "{} ({}) and spouse {} ({}) were never alive at the same time",
                    a.label(),
                    a_life,
                    b.label(),
                    b_life
                ),
            });
            return;
        }

        let Some(married) = married.filter(|date| !date.is_unknown()) else {
            return;
        };
        for (person, spouse) in [(a, b), (b, a)] {
            let before_birth = person.birth().is_some_and(|birth| married.definitely_before(birth));
            let after_death = person.death().is_some_and(|death| married.definitely_after(death));
            if !(before_birth || after_death) {
                continue;
            }
            issues.push(ValidationIssue::ImpossibleDate {
                person: person.id.clone(),
                reason: DateConflict::MarriageOutsideLifespan,
                related: Some(spouse.id.clone()),
                explanation: format!(
                    "marriage of {} and {} ({}) falls {} of {}",
                    person.label(),
                    spouse.label(),
                    married,
                    if before_birth { "before the birth" } else { "after the death" },
                    person.label()
                ),
            });
        }
    }
}

/// A mother cannot die before the birth; a father can die up to a
/// calendar year earlier, so only an earlier death year counts.
fn died_before_birth(gender: Gender, death: &DateRange, birth: &DateRange) -> bool {
    match gender {
        Gender::Female => death.definitely_before(birth),
        Gender::Male | Gender::Unknown => match (death.latest_year(), birth.earliest_year()) {
            (Some(died), Some(born)) => died < born - 1,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relationship;

    fn born(id: &str, year: i32) -> Person {
        Person::new(id).with_birth(DateRange::year(year))
    }

    fn run(persons: Vec<Person>, relationships: Vec<Relationship>) -> Vec<ValidationIssue> {
        let snapshot = Snapshot::new(persons, relationships).unwrap();
        validate_timeline(&snapshot, &TimelineOptions::default()).unwrap()
    }

    #[test]
    fn test_death_before_birth() {
        let issues = run(vec![born("P", 1900).with_death(DateRange::year(1890))], Vec::new());
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            issues[0],
            ValidationIssue::ImpossibleDate {
                reason: DateConflict::DeathBeforeBirth,
                ..
            }
        ));
    }

    #[test]
    fn test_default_keeps_every_severity() {
        assert_eq!(TimelineOptions::default().min_severity, Severity::Info);

        let persons = vec![born("C", 1920), born("P", 1850)];
        let relationships = vec![Relationship::parent_child("P", "C")];
        assert_eq!(run(persons.clone(), relationships.clone()).len(), 1);

        let snapshot = Snapshot::new(persons, relationships).unwrap();
        let critical_only = TimelineOptions {
            min_severity: Severity::Critical,
            ..TimelineOptions::default()
        };
        assert!(validate_timeline(&snapshot, &critical_only).unwrap().is_empty());
    }

    #[test]
    fn test_same_year_is_not_a_finding() {
        let issues = run(vec![born("P", 1900).with_death(DateRange::year(1900))], Vec::new());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_lifespan_exceeded() {
        let issues = run(vec![born("P", 1800).with_death(DateRange::year(1925))], Vec::new());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity(), Severity::Warning);

        let borderline = run(vec![born("P", 1800).with_death(DateRange::year(1920))], Vec::new());
        assert!(borderline.is_empty());
    }

    #[test]
    fn test_parent_younger_than_child() {
        let issues = run(
            vec![born("CHILD", 1950), born("PARENT", 2000)],
            vec![Relationship::parent_child("PARENT", "CHILD")],
        );
        assert_eq!(issues.len(), 1);
        match &issues[0] {
            ValidationIssue::AgeOutOfBounds { bound, age, .. } => {
                assert_eq!(*bound, AgeBound::BelowMinimum);
                assert_eq!(age.max, Some(-50));
            }
            other => panic!("unexpected issue {:?}", other),
        }
    }

    #[test]
    fn test_partial_dates_do_not_fire() {
        let parent = Person::new("PARENT").with_birth("AFT 1890".parse().unwrap());
        let issues = run(
            vec![born("CHILD", 1950), parent],
            vec![Relationship::parent_child("PARENT", "CHILD")],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_step_parents_not_age_checked() {
        let issues = run(
            vec![born("CHILD", 1950), born("STEP", 1945)],
            vec![Relationship::parent_child("STEP", "CHILD").with_role(ParentRole::Step)],
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_parent_died_before_birth() {
        let mother = born("M", 1900)
            .with_gender(Gender::Female)
            .with_death(DateRange::year(1925));
        let father = born("F", 1900)
            .with_gender(Gender::Male)
            .with_death(DateRange::year(1929));
        let issues = run(
            vec![born("C", 1930), mother, father],
            vec![
                Relationship::parent_child("M", "C"),
                Relationship::parent_child("F", "C"),
            ],
        );
        assert_eq!(issues.len(), 1);
        assert!(issues[0].involves(&"M".into()));
    }

    #[test]
    fn test_spouses_never_alive_together() {
        let a = born("A", 1800).with_death(DateRange::year(1850));
        let b = born("B", 1900);
        let issues = run(vec![a, b], vec![Relationship::spouse("A", "B")]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind(), "overlapping_lifespan");
    }

    #[test]
    fn test_marriage_outside_lifespan() {
        let a = born("A", 1880).with_death(DateRange::year(1950));
        let b = born("B", 1890).with_death(DateRange::year(1900));
        let issues = run(
            vec![a, b],
            vec![Relationship::spouse("A", "B").with_date(DateRange::year(1910))],
        );
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0],
            ValidationIssue::ImpossibleDate {
                reason: DateConflict::MarriageOutsideLifespan,
                person,
                ..
            } if person.as_str() == "B"
        ));
    }

    #[test]
    fn test_single_person_scope_and_severity_filter() {
        let snapshot = Snapshot::new(
            vec![
                born("A", 1900).with_death(DateRange::year(1890)),
                born("B", 1800).with_death(DateRange::year(1990)),
            ],
            Vec::new(),
        )
        .unwrap();

        let only_b = TimelineOptions::default().for_person("B");
        assert_eq!(validate_timeline(&snapshot, &only_b).unwrap().len(), 1);

        let critical = TimelineOptions {
            min_severity: Severity::Critical,
            ..TimelineOptions::default()
        };
        let issues = validate_timeline(&snapshot, &critical).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].involves(&"A".into()));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let snapshot = Snapshot::new(vec![born("A", 1900)], Vec::new()).unwrap();
        let inverted = TimelineOptions {
            min_parent_age: 70,
            ..TimelineOptions::default()
        };
        assert!(matches!(
            validate_timeline(&snapshot, &inverted),
            Err(AnalysisError::Configuration(_))
        ));
        let negative = TimelineOptions {
            min_parent_age: -1,
            ..TimelineOptions::default()
        };
        assert!(validate_timeline(&snapshot, &negative).is_err());
        let unknown = TimelineOptions::default().for_person("Z");
        assert!(matches!(
            validate_timeline(&snapshot, &unknown),
            Err(AnalysisError::Input(_))
        ));
    }
}
