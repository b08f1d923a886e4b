//! # Candidate Blocking
//!
//! Proposes the unordered person pairs worth scoring: every pair sharing at
//! least one phonetic key. Work stays near `O(n · bucket)` because pairs are
//! only formed inside buckets, and buckets above the configured size are
//! skipped altogether.

use crate::index::PhoneticIndex;
use crate::store::PersonIdx;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

/// Pair generator over a run's phonetic index.
#[derive(Debug, Clone, Copy)]
pub struct CandidateBlocker<'a> {
    index: &'a PhoneticIndex,
    max_block_size: usize,
}

impl<'a> CandidateBlocker<'a> {
    /// `max_block_size` of 0 disables the bucket cap
    pub fn new(index: &'a PhoneticIndex, max_block_size: usize) -> Self {
        Self {
            index,
            max_block_size,
        }
    }

    /// Unique `(smaller, larger)` index pairs, sorted ascending.
    pub fn generate_candidates(&self) -> Vec<(PersonIdx, PersonIdx)> {
        let mut seen: FxHashSet<(PersonIdx, PersonIdx)> = FxHashSet::default();
        let mut skipped = 0usize;

        for (key, members) in self.index.buckets() {
            if self.max_block_size > 0 && members.len() > self.max_block_size {
                warn!(
                    key = %key,
                    size = members.len(),
                    limit = self.max_block_size,
                    "skipping oversized phonetic block"
                );
                skipped += 1;
                continue;
            }
            for (offset, &a) in members.iter().enumerate() {
                for &b in &members[offset + 1..] {
                    seen.insert((a, b));
                }
            }
        }

        let mut pairs: Vec<_> = seen.into_iter().collect();
        pairs.sort_unstable();
        debug!(
            buckets = self.index.len(),
            skipped,
            pairs = pairs.len(),
            "generated candidate pairs"
        );
        pairs
    }
}
