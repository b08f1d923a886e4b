//! # Indexing Module
//!
//! Run-scoped inverted index from phonetic keys to the persons carrying them.
//! Built once per dedup invocation from the in-scope profiles and owned by
//! that invocation's context; there is no shared or global index.

use crate::profile::PersonProfile;
use crate::store::PersonIdx;
use hashbrown::HashMap;
use std::fmt;

/// A blocking key: which algorithm and name part produced the code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhoneticKey {
    SurnameSoundex(String),
    SurnameNysiis(String),
    GivenMetaphone(String),
}

impl fmt::Display for PhoneticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhoneticKey::SurnameSoundex(code) => write!(f, "surname.soundex={}", code),
            PhoneticKey::SurnameNysiis(code) => write!(f, "surname.nysiis={}", code),
            PhoneticKey::GivenMetaphone(code) => write!(f, "given.metaphone={}", code),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct KeyBucket {
    members: Vec<PersonIdx>,
}

impl KeyBucket {
    fn insert(&mut self, idx: PersonIdx) {
        self.members.push(idx);
    }

    fn finish(&mut self) {
        self.members.sort_unstable();
        self.members.dedup();
    }
}

/// Phonetic key → sorted person indices.
#[derive(Debug, Clone, Default)]
pub struct PhoneticIndex {
    buckets: HashMap<PhoneticKey, KeyBucket>,
}

impl PhoneticIndex {
    /// Index every surname and given token of every name variant.
    pub fn build(profiles: &[PersonProfile]) -> Self {
        let mut buckets: HashMap<PhoneticKey, KeyBucket> = HashMap::new();
        for profile in profiles {
            for key in Self::keys_for(profile) {
                buckets.entry(key).or_default().insert(profile.idx);
            }
        }
        for bucket in buckets.values_mut() {
            bucket.finish();
        }
        Self { buckets }
    }

    /// Distinct keys of one profile, sorted
    pub fn keys_for(profile: &PersonProfile) -> Vec<PhoneticKey> {
        let mut keys = Vec::new();
        for features in &profile.names {
            for codes in &features.surname_codes {
                keys.push(PhoneticKey::SurnameSoundex(codes.soundex.clone()));
                keys.push(PhoneticKey::SurnameNysiis(codes.nysiis.clone()));
            }
            for codes in &features.given_codes {
                keys.push(PhoneticKey::GivenMetaphone(codes.metaphone.clone()));
            }
        }
        keys.retain(|key| !key.code().is_empty());
        keys.sort();
        keys.dedup();
        keys
    }

    /// Persons sharing a key, ascending
    pub fn lookup(&self, key: &PhoneticKey) -> &[PersonIdx] {
        self.buckets
            .get(key)
            .map(|bucket| bucket.members.as_slice())
            .unwrap_or(&[])
    }

    /// All buckets in unspecified order
    pub fn buckets(&self) -> impl Iterator<Item = (&PhoneticKey, &[PersonIdx])> {
        self.buckets
            .iter()
            .map(|(key, bucket)| (key, bucket.members.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl PhoneticKey {
    pub fn code(&self) -> &str {
        match self {
            PhoneticKey::SurnameSoundex(code)
            | PhoneticKey::SurnameNysiis(code)
            | PhoneticKey::GivenMetaphone(code) => code,
        }
    }
}
