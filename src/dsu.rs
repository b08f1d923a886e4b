//! # Disjoint Set Union (DSU)
//!
//! Arena Union-Find over dense person indices and the cluster builder on
//! top of it. Sets are merged by size with path halving on `find`. The
//! builder applies matching pairs in ascending order and remembers, for each
//! successful union, the pair that caused it, so every cluster carries the
//! spanning pairs that first linked its members.
//!
//! The structure is not synchronized; it runs single-threaded after all
//! pair scoring has finished.

use crate::model::PersonId;
use crate::store::{PersonIdx, Snapshot};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Outcome of a union attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    /// Two different sets were joined under `root`
    Merged { root: PersonIdx },
    /// Both elements already shared a set
    AlreadyLinked,
}

/// Index-addressed disjoint-set forest.
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parent: Vec<PersonIdx>,
    size: Vec<u32>,
}

impl DisjointSet {
    /// One singleton set per element of `0..len`
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len as PersonIdx).collect(),
            size: vec![1; len],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Root of `x`, halving the path on the way up
    #[inline]
    pub fn find(&mut self, mut x: PersonIdx) -> PersonIdx {
        while self.parent[x as usize] != x {
            let grandparent = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grandparent;
            x = grandparent;
        }
        x
    }

    pub fn same_set(&mut self, a: PersonIdx, b: PersonIdx) -> bool {
        self.find(a) == self.find(b)
    }

    /// Union by size; ties keep the smaller root index
    pub fn union(&mut self, a: PersonIdx, b: PersonIdx) -> MergeResult {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return MergeResult::AlreadyLinked;
        }

        let (size_a, size_b) = (self.size[root_a as usize], self.size[root_b as usize]);
        let (root, child) = if size_a > size_b || (size_a == size_b && root_a < root_b) {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent[child as usize] = root;
        self.size[root as usize] = size_a + size_b;
        MergeResult::Merged { root }
    }

    pub fn set_size(&mut self, x: PersonIdx) -> u32 {
        let root = self.find(x);
        self.size[root as usize]
    }
}

/// A pair that cleared the match threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchedPair {
    pub a: PersonIdx,
    pub b: PersonIdx,
    pub score: f64,
}

/// A union that first connected two members of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterLink {
    pub a: PersonId,
    pub b: PersonId,
    pub score: f64,
}

/// Persons believed to be the same individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCluster {
    /// Sorted member ids, at least two
    pub members: Vec<PersonId>,
    /// Spanning pairs in the order they were applied
    pub links: Vec<ClusterLink>,
}

impl DuplicateCluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &PersonId) -> bool {
        self.members.binary_search(id).is_ok()
    }
}

/// Merge matching pairs into transitively closed clusters, ordered by their
/// smallest member. Persons outside every pair stay implicit singletons.
pub fn build_clusters(snapshot: &Snapshot, pairs: &[MatchedPair]) -> Vec<DuplicateCluster> {
    let mut ordered: Vec<MatchedPair> = pairs
        .iter()
        .filter(|pair| pair.a != pair.b)
        .map(|pair| MatchedPair {
            a: pair.a.min(pair.b),
            b: pair.a.max(pair.b),
            score: pair.score,
        })
        .collect();
    ordered.sort_by(|x, y| (x.a, x.b).cmp(&(y.a, y.b)));

    let mut dsu = DisjointSet::new(snapshot.len());
    let mut spanning = Vec::new();
    for pair in &ordered {
        if let MergeResult::Merged { .. } = dsu.union(pair.a, pair.b) {
            spanning.push(*pair);
        }
    }

    // Group by root; members arrive in ascending index order.
    let mut by_root: HashMap<PersonIdx, (Vec<PersonIdx>, Vec<MatchedPair>)> = HashMap::new();
    for pair in &ordered {
        let root = dsu.find(pair.a);
        let entry = by_root.entry(root).or_default();
        entry.0.push(pair.a);
        entry.0.push(pair.b);
    }
    for pair in spanning {
        let root = dsu.find(pair.a);
        if let Some(entry) = by_root.get_mut(&root) {
            entry.1.push(pair);
        }
    }

    let id = |idx: PersonIdx| snapshot.person_at(idx).id.clone();
    let mut clusters: Vec<(PersonIdx, DuplicateCluster)> = by_root
        .into_values()
        .map(|(mut members, links)| {
            members.sort_unstable();
            members.dedup();
            let smallest = members[0];
            let cluster = DuplicateCluster {
                members: members.into_iter().map(id).collect(),
                links: links
                    .into_iter()
                    .map(|pair| ClusterLink {
                        a: id(pair.a),
                        b: id(pair.b),
                        score: pair.score,
                    })
                    .collect(),
            };
            (smallest, cluster)
        })
        .collect();
    clusters.sort_by_key(|(smallest, _)| *smallest);
    clusters.into_iter().map(|(_, cluster)| cluster).collect()
}
