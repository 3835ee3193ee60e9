//! The global path matrix.
//!
//! A sparse `source → target → path` table.  Paths are `Arc<[NodeId]>` so a
//! cache hit hands the walker a shared, immutable sequence instead of a copy.
//! Entries are write-once: [`PathMatrix::insert`] never replaces an existing
//! path, so a reader can never observe a path change under it.

use std::collections::BTreeMap;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use ws_core::NodeId;
use ws_spatial::WalkNetwork;

use crate::{PathsError, PathsResult};

/// An ordered node sequence from a source to a target, both inclusive.
pub type NodePath = Arc<[NodeId]>;

/// Path matrix keyed by node string keys.
///
/// Used wherever the matrix leaves the process or the thread: persisted
/// cache records and worker responses.  `BTreeMap` keeps the encoding stable.
pub type KeyedMatrix = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Sparse source → target → path table.
#[derive(Debug, Clone, Default)]
pub struct PathMatrix {
    rows: FxHashMap<NodeId, FxHashMap<NodeId, NodePath>>,
    len:  usize,
}

impl PathMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `(source, target)` entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of sources with at least one entry.
    pub fn source_count(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, source: NodeId, target: NodeId) -> Option<&NodePath> {
        self.rows.get(&source).and_then(|row| row.get(&target))
    }

    pub fn contains(&self, source: NodeId, target: NodeId) -> bool {
        self.get(source, target).is_some()
    }

    /// Insert `path` unless an entry for `(source, target)` already exists.
    ///
    /// Returns `true` if the path was stored.
    pub fn insert(&mut self, source: NodeId, target: NodeId, path: NodePath) -> bool {
        let row = self.rows.entry(source).or_default();
        if row.contains_key(&target) {
            return false;
        }
        row.insert(target, path);
        self.len += 1;
        true
    }

    /// Fold every entry of `other` into `self` (existing entries win).
    ///
    /// Returns the number of entries added.
    pub fn merge(&mut self, other: PathMatrix) -> usize {
        let mut added = 0;
        for (source, row) in other.rows {
            for (target, path) in row {
                if self.insert(source, target, path) {
                    added += 1;
                }
            }
        }
        added
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.len = 0;
    }

    /// Iterate over every `(source, target, path)` entry (unordered).
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId, &NodePath)> + '_ {
        self.rows.iter().flat_map(|(&s, row)| row.iter().map(move |(&t, p)| (s, t, p)))
    }

    // ── Keyed conversion ──────────────────────────────────────────────────

    /// Export with node string keys.
    pub fn to_keyed(&self, network: &WalkNetwork) -> KeyedMatrix {
        let mut keyed = KeyedMatrix::new();
        for (source, target, path) in self.iter() {
            keyed
                .entry(network.node_key(source).to_owned())
                .or_default()
                .insert(
                    network.node_key(target).to_owned(),
                    path.iter().map(|&n| network.node_key(n).to_owned()).collect(),
                );
        }
        keyed
    }

    /// Rebuild a matrix from string keys against `network`.
    ///
    /// Every path is validated: it must start at its source, end at its
    /// target, and step only along edges of `network`.  A record written
    /// against a different graph therefore fails as a whole.
    ///
    /// # Errors
    ///
    /// [`SpatialError::UnknownNode`](ws_spatial::SpatialError::UnknownNode)
    /// for keys missing from `network`, [`PathsError::InvalidPath`] for
    /// sequences that are not walks.
    pub fn from_keyed(keyed: &KeyedMatrix, network: &WalkNetwork) -> PathsResult<PathMatrix> {
        let mut matrix = PathMatrix::new();
        for (source_key, row) in keyed {
            let source = network.require_node(source_key)?;
            for (target_key, keys) in row {
                let target = network.require_node(target_key)?;
                let path = keys
                    .iter()
                    .map(|k| network.require_node(k))
                    .collect::<Result<Vec<_>, _>>()?;

                let is_walk = path.first() == Some(&source)
                    && path.last() == Some(&target)
                    && path.windows(2).all(|w| network.are_adjacent(w[0], w[1]));
                if !is_walk {
                    return Err(PathsError::InvalidPath {
                        from: source_key.clone(),
                        to:   target_key.clone(),
                    });
                }
                matrix.insert(source, target, path.into());
            }
        }
        Ok(matrix)
    }
}
