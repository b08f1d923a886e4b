//! # Data Model
//!
//! Core records of a family-tree snapshot: persons with their name variants,
//! vital facts and source references, and the typed relationship edges that
//! connect them.

use crate::temporal::DateRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable identifier of a person in the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(pub String);

impl PersonId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PersonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Recorded gender of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

/// One way a person's name was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NameVariant {
    #[serde(default)]
    pub given: String,
    #[serde(default)]
    pub surname: String,
    /// Where this form of the name came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl NameVariant {
    pub fn new(given: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            surname: surname.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// `given surname`, trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given.trim(), self.surname.trim())
            .trim()
            .to_string()
    }
}

/// Kind of life event recorded as a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Birth,
    Christening,
    Death,
    Burial,
    Marriage,
    Residence,
    Census,
    Other,
}

impl FactKind {
    /// Events establishing the boundaries of a life
    pub fn is_vital(self) -> bool {
        matches!(
            self,
            FactKind::Birth | FactKind::Christening | FactKind::Death | FactKind::Burial
        )
    }

    /// Events that are worth sourcing but do not bound a life
    pub fn is_important(self) -> bool {
        matches!(
            self,
            FactKind::Marriage | FactKind::Residence | FactKind::Census
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FactKind::Birth => "birth",
            FactKind::Christening => "christening",
            FactKind::Death => "death",
            FactKind::Burial => "burial",
            FactKind::Marriage => "marriage",
            FactKind::Residence => "residence",
            FactKind::Census => "census",
            FactKind::Other => "other",
        }
    }

    /// Parse a store label such as `Birth` or `BIRT`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "birth" | "birt" => FactKind::Birth,
            "christening" | "chr" | "baptism" | "bapm" => FactKind::Christening,
            "death" | "deat" => FactKind::Death,
            "burial" | "buri" => FactKind::Burial,
            "marriage" | "marr" => FactKind::Marriage,
            "residence" | "resi" => FactKind::Residence,
            "census" | "cens" => FactKind::Census,
            _ => FactKind::Other,
        }
    }
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_confidence() -> f32 {
    1.0
}

/// A dated life event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub kind: FactKind,
    #[serde(default)]
    pub date: DateRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Free-form label for `Other` facts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Fact {
    pub fn new(kind: FactKind, date: DateRange) -> Self {
        Self {
            kind,
            date,
            place: None,
            confidence: default_confidence(),
            label: None,
        }
    }

    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }
}

/// A person record as held in the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    /// Name variants, primary first
    #[serde(default)]
    pub names: Vec<NameVariant>,
    #[serde(default)]
    pub facts: Vec<Fact>,
    /// Source citation references; a `kind:` prefix tags the fact it supports
    #[serde(default)]
    pub sources: BTreeSet<String>,
}

impl Person {
    pub fn new(id: impl Into<PersonId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            gender: Gender::Unknown,
            names: Vec::new(),
            facts: Vec::new(),
            sources: BTreeSet::new(),
        }
    }

    pub fn with_name(mut self, given: &str, surname: &str) -> Self {
        self.names.push(NameVariant::new(given, surname));
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.facts.push(fact);
        self
    }

    pub fn with_birth(self, date: DateRange) -> Self {
        self.with_fact(Fact::new(FactKind::Birth, date))
    }

    pub fn with_death(self, date: DateRange) -> Self {
        self.with_fact(Fact::new(FactKind::Death, date))
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.insert(source.into());
        self
    }

    pub fn primary_name(&self) -> Option<&NameVariant> {
        self.names.first()
    }

    /// Display name, falling back to the primary name form and then the id
    pub fn label(&self) -> String {
        if let Some(name) = self.display_name.as_ref().filter(|n| !n.trim().is_empty()) {
            return name.clone();
        }
        match self.primary_name().map(NameVariant::full_name) {
            Some(name) if !name.is_empty() => name,
            _ => self.id.to_string(),
        }
    }

    /// First fact of a kind whose date carries any information
    pub fn fact(&self, kind: FactKind) -> Option<&Fact> {
        self.facts
            .iter()
            .filter(|fact| fact.kind == kind)
            .find(|fact| !fact.date.is_unknown())
            .or_else(|| self.facts.iter().find(|fact| fact.kind == kind))
    }

    pub fn birth(&self) -> Option<&DateRange> {
        self.fact(FactKind::Birth)
            .map(|fact| &fact.date)
            .filter(|date| !date.is_unknown())
    }

    pub fn death(&self) -> Option<&DateRange> {
        self.fact(FactKind::Death)
            .map(|fact| &fact.date)
            .filter(|date| !date.is_unknown())
    }

    /// Earliest and latest possible moments of this life, unknown ends left open
    pub fn lifespan(&self) -> DateRange {
        DateRange {
            earliest: self.birth().map_or(crate::temporal::MIN_KEY, |b| b.earliest),
            latest: self.death().map_or(crate::temporal::MAX_KEY, |d| d.latest),
        }
    }
}

/// Kind of link between two persons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Directed `from` parent `to` child
    ParentChild,
    /// Undirected couple stored as a pair
    Spouse,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipKind::ParentChild => f.write_str("parent-child"),
            RelationshipKind::Spouse => f.write_str("spouse"),
        }
    }
}

/// Nature of a parent link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRole {
    #[default]
    Biological,
    Step,
    Adoptive,
    Unknown,
}

impl ParentRole {
    /// Roles that carry a biological age constraint
    pub fn is_biological(self) -> bool {
        matches!(self, ParentRole::Biological | ParentRole::Unknown)
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "" | "biological" | "birth" | "natural" | "father" | "mother" => ParentRole::Biological,
            "step" | "stepparent" | "step-parent" => ParentRole::Step,
            "adoptive" | "adopted" | "foster" | "guardian" => ParentRole::Adoptive,
            _ => ParentRole::Unknown,
        }
    }
}

/// A typed relationship edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub from: PersonId,
    pub to: PersonId,
    #[serde(default)]
    pub role: ParentRole,
    /// Marriage date for spouse edges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateRange>,
}

impl Relationship {
    pub fn parent_child(parent: impl Into<PersonId>, child: impl Into<PersonId>) -> Self {
        Self {
            kind: RelationshipKind::ParentChild,
            from: parent.into(),
            to: child.into(),
            role: ParentRole::Biological,
            date: None,
        }
    }

    pub fn spouse(a: impl Into<PersonId>, b: impl Into<PersonId>) -> Self {
        Self {
            kind: RelationshipKind::Spouse,
            from: a.into(),
            to: b.into(),
            role: ParentRole::Biological,
            date: None,
        }
    }

    pub fn with_role(mut self, role: ParentRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_date(mut self, date: DateRange) -> Self {
        self.date = Some(date);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_label_fallbacks() {
        let named = Person::new("P1").with_name("Ana", "Ruiz");
        assert_eq!(named.label(), "Ana Ruiz");

        let bare = Person::new("P2");
        assert_eq!(bare.label(), "P2");

        let mut displayed = Person::new("P3").with_name("Ana", "Ruiz");
        displayed.display_name = Some("Ana María Ruiz".to_string());
        assert_eq!(displayed.label(), "Ana María Ruiz");
    }

    #[test]
    fn test_fact_lookup_prefers_dated_fact() {
        let person = Person::new("P1")
            .with_fact(Fact::new(FactKind::Birth, DateRange::unknown()))
            .with_birth(DateRange::year(1900));
        assert_eq!(person.birth(), Some(&DateRange::year(1900)));
        assert_eq!(person.death(), None);
    }

    #[test]
    fn test_lifespan_open_ends() {
        let person = Person::new("P1").with_birth(DateRange::year(1900));
        let span = person.lifespan();
        assert_eq!(span.earliest, 19000101);
        assert_eq!(span.latest, crate::temporal::MAX_KEY);
    }

    #[test]
    fn test_fact_kind_labels() {
        assert_eq!(FactKind::from_label("Birth"), FactKind::Birth);
        assert_eq!(FactKind::from_label("BURI"), FactKind::Burial);
        assert_eq!(FactKind::from_label("Occupation"), FactKind::Other);
        assert!(FactKind::Christening.is_vital());
        assert!(FactKind::Census.is_important());
    }

    #[test]
    fn test_relationship_json_defaults() {
        let edge: Relationship =
            serde_json::from_str(r#"{"kind": "parent_child", "from": "P1", "to": "P2"}"#).unwrap();
        assert_eq!(edge.role, ParentRole::Biological);
        assert_eq!(edge.date, None);

        let marriage: Relationship = serde_json::from_str(
            r#"{"kind": "spouse", "from": "P1", "to": "P3", "date": "12 JUN 1925"}"#,
        )
        .unwrap();
        assert_eq!(marriage.date.and_then(|d| d.earliest_year()), Some(1925));
    }
}
