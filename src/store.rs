//! # Store Module
//!
//! The immutable, fully materialized snapshot one analysis run works on, and
//! the [`SnapshotSource`] seam through which collaborators provide it.

use crate::error::{AnalysisError, AnalysisResult, LoadError};
use crate::model::{Person, PersonId, Relationship};
use crate::normalize::fold_text;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

/// Dense index of a person inside one snapshot, assigned in ascending id order.
pub type PersonIdx = u32;

/// Serializable form of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Which part of the source tree to materialize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum QueryScope {
    #[default]
    All,
    /// Persons with a name variant whose surname contains the text
    Surname(String),
}

/// Provider of snapshots. Loading is the only blocking step of a run and
/// completes before any analysis begins.
pub trait SnapshotSource {
    fn load(&self, scope: &QueryScope) -> Result<Snapshot, LoadError>;
}

/// Immutable persons and relationships for one analysis run.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Persons sorted by id; position is the dense index
    persons: Vec<Person>,
    relationships: Vec<Relationship>,
    index: HashMap<PersonId, PersonIdx>,
}

impl Snapshot {
    /// Build a snapshot, rejecting empty or duplicate person ids
    pub fn new(mut persons: Vec<Person>, relationships: Vec<Relationship>) -> AnalysisResult<Self> {
        persons.sort_by(|a, b| a.id.cmp(&b.id));

        let mut index = HashMap::with_capacity(persons.len());
        for (position, person) in persons.iter().enumerate() {
            if person.id.as_str().trim().is_empty() {
                return Err(AnalysisError::input("person with an empty identifier"));
            }
            let idx = PersonIdx::try_from(position)
                .map_err(|_| AnalysisError::input("snapshot exceeds the supported person count"))?;
            if index.insert(person.id.clone(), idx).is_some() {
                return Err(AnalysisError::input(format!(
                    "duplicate person identifier {}",
                    person.id
                )));
            }
        }

        Ok(Self {
            persons,
            relationships,
            index,
        })
    }

    /// Build a snapshot from its serialized form
    pub fn from_document(document: SnapshotDocument) -> AnalysisResult<Self> {
        Self::new(document.persons, document.relationships)
    }

    pub fn to_document(&self) -> SnapshotDocument {
        SnapshotDocument {
            persons: self.persons.clone(),
            relationships: self.relationships.clone(),
        }
    }

    /// All persons in ascending id order
    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn index_of(&self, id: &PersonId) -> Option<PersonIdx> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.index.contains_key(id)
    }

    pub fn person(&self, id: &PersonId) -> Option<&Person> {
        self.index_of(id).map(|idx| &self.persons[idx as usize])
    }

    /// Person at a dense index; panics on an index from another snapshot
    pub fn person_at(&self, idx: PersonIdx) -> &Person {
        &self.persons[idx as usize]
    }

    /// Resolve an id supplied by a caller
    pub fn require(&self, id: &PersonId) -> AnalysisResult<PersonIdx> {
        if id.as_str().trim().is_empty() {
            return Err(AnalysisError::input("empty person identifier"));
        }
        self.index_of(id)
            .ok_or_else(|| AnalysisError::input(format!("unknown person identifier {}", id)))
    }

    /// Narrow a full document to a scope. Edges are kept when one endpoint is
    /// in scope and the other is either in scope or absent from the document
    /// altogether, so real dangling references survive the narrowing.
    pub fn scoped(document: SnapshotDocument, scope: &QueryScope) -> AnalysisResult<Self> {
        let QueryScope::Surname(needle) = scope else {
            return Self::from_document(document);
        };
        let needle = fold_text(needle);

        let known: HashSet<PersonId> = document.persons.iter().map(|p| p.id.clone()).collect();
        let (persons, _): (Vec<Person>, Vec<Person>) =
            document.persons.into_iter().partition(|person| {
                needle.is_empty()
                    || person
                        .names
                        .iter()
                        .any(|name| fold_text(&name.surname).contains(&needle))
            });
        let kept: HashSet<PersonId> = persons.iter().map(|p| p.id.clone()).collect();

        let relationships = document
            .relationships
            .into_iter()
            .filter(|edge| {
                let from_in = kept.contains(&edge.from);
                let to_in = kept.contains(&edge.to);
                (from_in && (to_in || !known.contains(&edge.to)))
                    || (to_in && (from_in || !known.contains(&edge.from)))
            })
            .collect();

        Self::new(persons, relationships)
    }
}

/// In-memory source, mostly for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    document: SnapshotDocument,
}

impl MemorySource {
    pub fn new(document: SnapshotDocument) -> Self {
        Self { document }
    }
}

impl SnapshotSource for MemorySource {
    fn load(&self, scope: &QueryScope) -> Result<Snapshot, LoadError> {
        Ok(Snapshot::scoped(self.document.clone(), scope)?)
    }
}
