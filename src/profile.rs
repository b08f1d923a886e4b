//! # Person Profiles
//!
//! Per-run cached matching features: normalized name variants with their
//! phonetic codes, comparable dates, the folded birth place, and the
//! normalized names of parents and spouses. Built once per person before
//! blocking and scoring, then dropped with the run.

use crate::graph::FamilyGraph;
use crate::model::{FactKind, Person};
use crate::normalize::{fold_text, normalize, NormalizedName};
use crate::phonetic::{encode, PhoneticCodes};
use crate::store::{PersonIdx, Snapshot};
use crate::temporal::DateRange;
use std::collections::BTreeSet;

/// One normalized name variant with codes for each of its tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct NameFeatures {
    pub name: NormalizedName,
    pub surname_codes: Vec<PhoneticCodes>,
    pub given_codes: Vec<PhoneticCodes>,
}

impl NameFeatures {
    pub fn new(name: NormalizedName) -> Self {
        let surname_codes = token_codes(name.surname_tokens());
        let given_codes = token_codes(name.given_tokens());
        Self {
            name,
            surname_codes,
            given_codes,
        }
    }
}

fn token_codes<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<PhoneticCodes> {
    tokens
        .map(encode)
        .filter(|codes| !codes.is_empty())
        .collect()
}

/// Matching features of one person.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonProfile {
    pub idx: PersonIdx,
    /// Known name variants, primary first; unknown names are left out
    pub names: Vec<NameFeatures>,
    pub birth: Option<DateRange>,
    pub death: Option<DateRange>,
    pub birth_place: Option<String>,
    /// Recorded parents of this person
    pub parent_indices: Vec<PersonIdx>,
    pub parent_names: BTreeSet<String>,
    pub spouse_names: BTreeSet<String>,
    pub sources: BTreeSet<String>,
}

impl PersonProfile {
    pub fn new(snapshot: &Snapshot, graph: &FamilyGraph, idx: PersonIdx) -> Self {
        let person = snapshot.person_at(idx);

        let parent_indices = graph.parents(idx).iter().map(|link| link.parent).collect();
        let parent_names = graph
            .parents(idx)
            .iter()
            .filter_map(|link| primary_full_name(snapshot.person_at(link.parent)))
            .collect();
        let spouse_names = graph
            .spouses(idx)
            .iter()
            .filter_map(|link| primary_full_name(snapshot.person_at(link.spouse)))
            .collect();

        Self {
            idx,
            names: person
                .names
                .iter()
                .map(|variant| normalize(&variant.given, &variant.surname))
                .filter(|name| !name.is_unknown())
                .map(NameFeatures::new)
                .collect(),
            birth: person.birth().copied(),
            death: person.death().copied(),
            birth_place: person
                .fact(FactKind::Birth)
                .and_then(|fact| fact.place.as_deref())
                .map(fold_text)
                .filter(|place| !place.is_empty()),
            parent_indices,
            parent_names,
            spouse_names,
            sources: person.sources.clone(),
        }
    }

    pub fn is_parent_of(&self, other: &PersonProfile) -> bool {
        other.parent_indices.contains(&self.idx)
    }
}

fn primary_full_name(person: &Person) -> Option<String> {
    let variant = person.primary_name()?;
    let full = normalize(&variant.given, &variant.surname).full();
    (!full.is_empty()).then_some(full)
}

/// Profiles for the given persons, in the order supplied.
pub fn build_profiles(
    snapshot: &Snapshot,
    graph: &FamilyGraph,
    persons: &[PersonIdx],
) -> Vec<PersonProfile> {
    persons
        .iter()
        .map(|&idx| PersonProfile::new(snapshot, graph, idx))
        .collect()
}
