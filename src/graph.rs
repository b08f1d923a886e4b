//! # Family Graph
//!
//! Flat adjacency lists over dense person indices, built once per run from a
//! snapshot. Nothing here assumes the parent/child relation is acyclic, and
//! traversal state always lives in caller-owned vectors.

use crate::model::{ParentRole, PersonId, RelationshipKind};
use crate::store::{PersonIdx, Snapshot};
use crate::temporal::DateRange;
use std::collections::VecDeque;

/// Incoming parent edge of a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: PersonIdx,
    pub role: ParentRole,
}

/// One side of a couple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpouseLink {
    pub spouse: PersonIdx,
    /// Recorded marriage date, if any
    pub date: Option<DateRange>,
}

/// An edge naming at least one id that is not in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingEdge {
    /// Position in `Snapshot::relationships`
    pub edge: usize,
    pub kind: RelationshipKind,
    pub from: PersonId,
    pub to: PersonId,
    /// Endpoints absent from the snapshot, deduplicated
    pub missing: Vec<PersonId>,
}

/// Adjacency view of a snapshot.
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    parents: Vec<Vec<ParentLink>>,
    children: Vec<Vec<PersonIdx>>,
    spouses: Vec<Vec<SpouseLink>>,
    self_unions: Vec<PersonIdx>,
    dangling: Vec<DanglingEdge>,
}

impl FamilyGraph {
    /// Build adjacency lists. Repeated edges collapse to one link; a repeated
    /// spouse edge keeps the first recorded marriage date.
    pub fn build(snapshot: &Snapshot) -> Self {
        let n = snapshot.len();
        let mut graph = Self {
            parents: vec![Vec::new(); n],
            children: vec![Vec::new(); n],
            spouses: vec![Vec::new(); n],
            self_unions: Vec::new(),
            dangling: Vec::new(),
        };

        for (position, edge) in snapshot.relationships().iter().enumerate() {
            let (from, to) = match (snapshot.index_of(&edge.from), snapshot.index_of(&edge.to)) {
                (Some(from), Some(to)) => (from, to),
                (from, to) => {
                    let mut missing = Vec::with_capacity(2);
                    if from.is_none() {
                        missing.push(edge.from.clone());
                    }
                    if to.is_none() && edge.to != edge.from {
                        missing.push(edge.to.clone());
                    }
                    graph.dangling.push(DanglingEdge {
                        edge: position,
                        kind: edge.kind,
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        missing,
                    });
                    continue;
                }
            };

            match edge.kind {
                RelationshipKind::ParentChild => graph.add_parent(from, to, edge.role),
                RelationshipKind::Spouse if from == to => {
                    if !graph.self_unions.contains(&from) {
                        graph.self_unions.push(from);
                    }
                }
                RelationshipKind::Spouse => {
                    graph.add_spouse(from, to, edge.date);
                    graph.add_spouse(to, from, edge.date);
                }
            }
        }

        for list in &mut graph.children {
            list.sort_unstable();
        }
        graph.self_unions.sort_unstable();
        graph
    }

    fn add_parent(&mut self, parent: PersonIdx, child: PersonIdx, role: ParentRole) {
        let links = &mut self.parents[child as usize];
        if links.iter().any(|link| link.parent == parent) {
            return;
        }
        links.push(ParentLink { parent, role });
        self.children[parent as usize].push(child);
    }

    fn add_spouse(&mut self, person: PersonIdx, spouse: PersonIdx, date: Option<DateRange>) {
        let links = &mut self.spouses[person as usize];
        match links.iter_mut().find(|link| link.spouse == spouse) {
            Some(existing) => {
                if existing.date.is_none() {
                    existing.date = date;
                }
            }
            None => links.push(SpouseLink { spouse, date }),
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn parents(&self, idx: PersonIdx) -> &[ParentLink] {
        &self.parents[idx as usize]
    }

    /// Children in ascending index order
    pub fn children(&self, idx: PersonIdx) -> &[PersonIdx] {
        &self.children[idx as usize]
    }

    pub fn spouses(&self, idx: PersonIdx) -> &[SpouseLink] {
        &self.spouses[idx as usize]
    }

    /// Persons with a spouse edge to themselves
    pub fn self_unions(&self) -> &[PersonIdx] {
        &self.self_unions
    }

    pub fn dangling(&self) -> &[DanglingEdge] {
        &self.dangling
    }

    /// Persons without any known parent, in index order
    pub fn roots(&self) -> impl Iterator<Item = PersonIdx> + '_ {
        (0..self.len() as PersonIdx).filter(|&idx| self.parents(idx).is_empty())
    }

    /// Membership mask of the weakly connected component containing `start`,
    /// following parent, child and spouse links.
    pub fn component_of(&self, start: PersonIdx) -> Vec<bool> {
        let mut seen = vec![false; self.len()];
        let mut queue = VecDeque::from([start]);
        seen[start as usize] = true;

        while let Some(idx) = queue.pop_front() {
            let neighbours = self
                .parents(idx)
                .iter()
                .map(|link| link.parent)
                .chain(self.children(idx).iter().copied())
                .chain(self.spouses(idx).iter().map(|link| link.spouse));
            for next in neighbours {
                if !seen[next as usize] {
                    seen[next as usize] = true;
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Breadth-first walk up the parent links. Returns each ancestor once with
    /// its generation (the root is generation 0), stopping after `generations`.
    pub fn ancestors(&self, root: PersonIdx, generations: u32) -> Vec<(PersonIdx, u32)> {
        let mut seen = vec![false; self.len()];
        let mut order = Vec::new();
        let mut queue = VecDeque::from([(root, 0u32)]);
        seen[root as usize] = true;

        while let Some((idx, generation)) = queue.pop_front() {
            order.push((idx, generation));
            if generation == generations {
                continue;
            }
            for link in self.parents(idx) {
                if !seen[link.parent as usize] {
                    seen[link.parent as usize] = true;
                    queue.push_back((link.parent, generation + 1));
                }
            }
        }
        order
    }
}
