//! Walk-network representation and builder.
//!
//! # Data layout
//!
//! The graph is undirected.  Each input edge is stored in both directions in
//! **Compressed Sparse Row (CSR)** form; given a `NodeId n`, its neighbours
//! occupy the slice:
//!
//! ```text
//! adj_to[ node_adj_start[n] .. node_adj_start[n+1] ]
//! ```
//!
//! Parallel edges and self-loops are accepted on input but collapse in the
//! adjacency, so each neighbour slice is a sorted set.  `edge_count()` still
//! reports the number of edges that were added.
//!
//! # Node keys
//!
//! Input nodes carry string keys (OSM ids).  The builder interns each key to
//! a dense `NodeId` in insertion order and keeps the reverse mapping so that
//! paths can be exported with their original identifiers.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lat, lon)` to the nearest `NodeId`.  Used
//! to snap scripted agent positions onto the network.

use std::collections::HashMap;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use ws_core::{GeoPoint, NodeId};

use crate::{SpatialError, SpatialResult};

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2-D `[lat, lon]` point with
/// the associated `NodeId`.
#[derive(Clone, Debug)]
struct NodeEntry {
    point: [f64; 2], // [lat, lon]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lon space.  Sufficient for
    /// nearest-node queries within a city district.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── WalkNetwork ───────────────────────────────────────────────────────────────

/// Immutable undirected walk graph in CSR format plus a spatial index.
///
/// Do not construct directly; use [`WalkNetworkBuilder`] or one of the
/// loaders in [`crate::loader`].  Once built, the network is shared
/// read-only (typically behind an `Arc`) by the resolver, the stepper and
/// the driver.
#[derive(Debug)]
pub struct WalkNetwork {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    /// Original string key of each node.  Indexed by `NodeId`.
    node_keys: Vec<String>,

    /// Reverse mapping from string key to `NodeId`.
    key_index: HashMap<String, NodeId>,

    // ── CSR adjacency ─────────────────────────────────────────────────────
    /// CSR row pointer.  Neighbours of node `n` are at
    /// `adj_to[node_adj_start[n] .. node_adj_start[n+1]]`.
    /// Length = `node_count + 1`.
    pub node_adj_start: Vec<u32>,

    /// Neighbour node of each adjacency slot, ascending within a row.
    pub adj_to: Vec<NodeId>,

    /// Great-circle length in metres of each adjacency slot.
    pub adj_length_m: Vec<f64>,

    /// Number of undirected edges added, including parallel duplicates.
    edge_count: usize,

    // ── Spatial index ─────────────────────────────────────────────────────
    spatial_idx: RTree<NodeEntry>,
}

impl WalkNetwork {
    /// Construct an empty network with no nodes or edges.
    pub fn empty() -> Self {
        WalkNetworkBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    /// Number of undirected edges in the input, parallel edges included.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    /// `true` if `node` indexes a node of this network.
    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.node_pos.len()
    }

    /// Iterator over every `NodeId` in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_pos.len() as u32).map(NodeId)
    }

    // ── Key mapping ───────────────────────────────────────────────────────

    /// Look up the `NodeId` interned for `key`.
    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.key_index.get(key).copied()
    }

    /// Like [`node_id`](Self::node_id) but fails with
    /// [`SpatialError::UnknownNode`].
    pub fn require_node(&self, key: &str) -> SpatialResult<NodeId> {
        self.node_id(key)
            .ok_or_else(|| SpatialError::UnknownNode(key.to_owned()))
    }

    /// Original string key of `node`.
    ///
    /// # Panics
    /// Panics if `node` is not part of this network.
    #[inline]
    pub fn node_key(&self, node: NodeId) -> &str {
        &self.node_keys[node.index()]
    }

    // ── Coordinates ───────────────────────────────────────────────────────

    /// Position of `node`.
    ///
    /// # Panics
    /// Panics if `node` is not part of this network.  Paths handed out by
    /// the resolver only ever contain valid ids.
    #[inline]
    pub fn pos(&self, node: NodeId) -> GeoPoint {
        self.node_pos[node.index()]
    }

    /// Position of `node`, or [`SpatialError::NodeNotFound`].
    pub fn try_pos(&self, node: NodeId) -> SpatialResult<GeoPoint> {
        self.node_pos
            .get(node.index())
            .copied()
            .ok_or(SpatialError::NodeNotFound(node))
    }

    /// Coordinates of the node with string key `key`.
    pub fn coordinates_of(&self, key: &str) -> SpatialResult<GeoPoint> {
        self.require_node(key).map(|id| self.pos(id))
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Distinct neighbours of `node`, in ascending `NodeId` order.
    ///
    /// This is a contiguous slice; no allocation.
    #[inline]
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        let start = self.node_adj_start[node.index()] as usize;
        let end   = self.node_adj_start[node.index() + 1] as usize;
        &self.adj_to[start..end]
    }

    /// Number of distinct neighbours of `node`.
    #[inline]
    pub fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// `true` if an edge joins `a` and `b`.
    pub fn are_adjacent(&self, a: NodeId, b: NodeId) -> bool {
        self.contains(a) && self.neighbors(a).binary_search(&b).is_ok()
    }

    /// Great-circle length of the edge between `a` and `b`, if they are
    /// adjacent.
    pub fn edge_length_m(&self, a: NodeId, b: NodeId) -> Option<f64> {
        if !self.contains(a) {
            return None;
        }
        let start = self.node_adj_start[a.index()] as usize;
        self.neighbors(a)
            .binary_search(&b)
            .ok()
            .map(|i| self.adj_length_m[start + i])
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the `NodeId` of the nearest node to `pos`.
    ///
    /// Returns `None` only if the network has no nodes.
    pub fn nearest_node(&self, pos: GeoPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lat, pos.lon])
            .map(|e| e.id)
    }
}

// ── WalkNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`WalkNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use ws_core::GeoPoint;
/// use ws_spatial::WalkNetworkBuilder;
///
/// let mut b = WalkNetworkBuilder::new();
/// let a = b.add_node("a", GeoPoint::new(59.403, 17.942)).unwrap();
/// let c = b.add_node("c", GeoPoint::new(59.404, 17.942)).unwrap();
/// b.add_edge(a, c);
/// let net = b.build();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.neighbors(a), &[c]);
/// ```
pub struct WalkNetworkBuilder {
    nodes:     Vec<GeoPoint>,
    keys:      Vec<String>,
    key_index: HashMap<String, NodeId>,
    raw_edges: Vec<(NodeId, NodeId)>,
}

impl WalkNetworkBuilder {
    pub fn new() -> Self {
        Self {
            nodes:     Vec::new(),
            keys:      Vec::new(),
            key_index: HashMap::new(),
            raw_edges: Vec::new(),
        }
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            keys:      Vec::with_capacity(nodes),
            key_index: HashMap::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add a node and return its `NodeId` (sequential from 0).
    ///
    /// Fails with [`SpatialError::DuplicateNode`] if `key` was already added.
    pub fn add_node(&mut self, key: impl Into<String>, pos: GeoPoint) -> SpatialResult<NodeId> {
        let key = key.into();
        if self.key_index.contains_key(&key) {
            return Err(SpatialError::DuplicateNode(key));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        self.key_index.insert(key.clone(), id);
        self.keys.push(key);
        Ok(id)
    }

    /// Add an undirected edge between two previously added nodes.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) {
        self.raw_edges.push((a, b));
    }

    /// Add an undirected edge by node key.
    ///
    /// Fails with [`SpatialError::MalformedGraph`] naming `edge_key` if
    /// either endpoint has not been added.
    pub fn add_edge_by_key(&mut self, edge_key: &str, from: &str, to: &str) -> SpatialResult<()> {
        let resolve = |key: &str| {
            self.key_index.get(key).copied().ok_or_else(|| SpatialError::MalformedGraph {
                edge: edge_key.to_owned(),
                node: key.to_owned(),
            })
        };
        let a = resolve(from)?;
        let b = resolve(to)?;
        self.add_edge(a, b);
        Ok(())
    }

    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.key_index.get(key).copied()
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`WalkNetwork`].
    ///
    /// Time complexity: O(E log E) for the adjacency sort + O(N log N) for
    /// the R-tree bulk load.
    pub fn build(self) -> WalkNetwork {
        let node_count = self.nodes.len();
        let edge_count = self.raw_edges.len();

        // Both directions, self-loops dropped, then sorted and deduplicated
        // so every adjacency row is an ordered set.
        let mut directed: Vec<(NodeId, NodeId)> = Vec::with_capacity(edge_count * 2);
        for &(a, b) in &self.raw_edges {
            if a != b {
                directed.push((a, b));
                directed.push((b, a));
            }
        }
        directed.sort_unstable();
        directed.dedup();

        let adj_to: Vec<NodeId> = directed.iter().map(|&(_, to)| to).collect();
        let adj_length_m: Vec<f64> = directed
            .iter()
            .map(|&(from, to)| self.nodes[from.index()].distance_m(self.nodes[to.index()]))
            .collect();

        // Build CSR row pointer.
        let mut node_adj_start = vec![0u32; node_count + 1];
        for &(from, _) in &directed {
            node_adj_start[from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_adj_start[i] += node_adj_start[i - 1];
        }
        debug_assert_eq!(node_adj_start[node_count] as usize, adj_to.len());

        // Bulk-load R-tree for O(N log N) construction (faster than N inserts).
        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry {
                point: [pos.lat, pos.lon],
                id: NodeId(i as u32),
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        WalkNetwork {
            node_pos: self.nodes,
            node_keys: self.keys,
            key_index: self.key_index,
            node_adj_start,
            adj_to,
            adj_length_m,
            edge_count,
            spatial_idx,
        }
    }
}

impl Default for WalkNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
