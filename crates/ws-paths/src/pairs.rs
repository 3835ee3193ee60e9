//! Tier-two cache for paths computed on demand, one pair at a time.

use rustc_hash::FxHashMap;

use ws_core::NodeId;

use crate::matrix::NodePath;

/// `(source, target) → path` map filled by the resolver on matrix misses.
///
/// Kept separate from the matrix so it can be dropped on its own; the
/// resolver also writes every pair it computes into the matrix, so losing
/// this tier never loses a path that is still wanted.
#[derive(Debug, Clone, Default)]
pub struct PairCache {
    paths: FxHashMap<(NodeId, NodeId), NodePath>,
}

impl PairCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: NodeId, target: NodeId) -> Option<&NodePath> {
        self.paths.get(&(source, target))
    }

    /// Store `path` unless the pair is already cached.  Returns `true` if stored.
    pub fn insert(&mut self, source: NodeId, target: NodeId, path: NodePath) -> bool {
        use std::collections::hash_map::Entry;
        match self.paths.entry((source, target)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(path);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }
}
