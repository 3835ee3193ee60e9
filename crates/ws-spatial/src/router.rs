//! Routing trait and default breadth-first implementation.
//!
//! # Pluggability
//!
//! The path resolver calls routing via the [`Router`] trait, so applications
//! can swap in a different search without touching the cache layers.
//!
//! # Cost model
//!
//! Walk-network edges carry no weight of their own, so the default
//! [`BfsRouter`] minimises **hop count**.  Ties between equal-hop paths are
//! broken by neighbour order (ascending `NodeId`), which makes every search
//! deterministic for a given graph.

use std::collections::VecDeque;

use ws_core::NodeId;

use crate::network::WalkNetwork;
use crate::{SpatialError, SpatialResult};

// ── SearchTree ────────────────────────────────────────────────────────────────

/// The result of a single-source search: a parent pointer and hop count for
/// every node reached from `source`.
///
/// One tree answers path queries from `source` to every target, which is
/// what makes row-at-a-time matrix computation cheap.
#[derive(Debug, Clone)]
pub struct SearchTree {
    source: NodeId,
    /// `parent[v]` is the predecessor of `v`; `NodeId::INVALID` for the
    /// source and for unreached nodes.
    parent: Vec<NodeId>,
    /// `hops[v]` is the BFS depth of `v`; `u32::MAX` for unreached nodes.
    hops: Vec<u32>,
}

impl SearchTree {
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// `true` if `target` was reached.
    #[inline]
    pub fn reaches(&self, target: NodeId) -> bool {
        self.hops.get(target.index()).is_some_and(|&h| h != u32::MAX)
    }

    /// Hop distance from the source to `target`, if reached.
    pub fn hops(&self, target: NodeId) -> Option<u32> {
        self.hops
            .get(target.index())
            .copied()
            .filter(|&h| h != u32::MAX)
    }

    /// Node sequence from the source to `target` (both inclusive), or `None`
    /// if `target` is unreachable.
    pub fn path_to(&self, target: NodeId) -> Option<Vec<NodeId>> {
        let hops = self.hops(target)?;
        let mut path = Vec::with_capacity(hops as usize + 1);
        let mut cur = target;
        path.push(cur);
        while cur != self.source {
            cur = self.parent[cur.index()];
            debug_assert!(cur.is_valid(), "reached node without a predecessor");
            path.push(cur);
        }
        path.reverse();
        Some(path)
    }

    /// Every reached node, in ascending `NodeId` order.
    pub fn reached(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.hops
            .iter()
            .enumerate()
            .filter(|(_, h)| **h != u32::MAX)
            .map(|(i, _)| NodeId(i as u32))
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable shortest-path engine.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so the same router type can run on
/// the offload worker thread and, with the `parallel` feature of `ws-paths`,
/// on Rayon workers.
pub trait Router: Send + Sync {
    /// Search from `source` to every reachable node.
    fn search(&self, network: &WalkNetwork, source: NodeId) -> SpatialResult<SearchTree>;

    /// Compute a single path from `from` to `to` (both inclusive).
    ///
    /// `from == to` yields `[from]`.  Returns [`SpatialError::NoRoute`] if
    /// `to` is unreachable.
    fn route(&self, network: &WalkNetwork, from: NodeId, to: NodeId) -> SpatialResult<Vec<NodeId>> {
        if from == to {
            return Ok(vec![from]);
        }
        self.search(network, from)?
            .path_to(to)
            .ok_or(SpatialError::NoRoute { from, to })
    }
}

impl<R: Router + ?Sized> Router for &R {
    fn search(&self, network: &WalkNetwork, source: NodeId) -> SpatialResult<SearchTree> {
        (**self).search(network, source)
    }

    fn route(&self, network: &WalkNetwork, from: NodeId, to: NodeId) -> SpatialResult<Vec<NodeId>> {
        (**self).route(network, from, to)
    }
}

// ── BfsRouter ─────────────────────────────────────────────────────────────────

/// Breadth-first search over the CSR walk graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct BfsRouter;

impl Router for BfsRouter {
    fn search(&self, network: &WalkNetwork, source: NodeId) -> SpatialResult<SearchTree> {
        bfs(network, source, None)
    }

    /// Single-pair BFS that stops as soon as `to` is dequeued.
    fn route(&self, network: &WalkNetwork, from: NodeId, to: NodeId) -> SpatialResult<Vec<NodeId>> {
        if !network.contains(to) {
            return Err(SpatialError::NodeNotFound(to));
        }
        if from == to {
            return Ok(vec![from]);
        }
        bfs(network, from, Some(to))?
            .path_to(to)
            .ok_or(SpatialError::NoRoute { from, to })
    }
}

// ── BFS internals ─────────────────────────────────────────────────────────────

fn bfs(network: &WalkNetwork, source: NodeId, stop_at: Option<NodeId>) -> SpatialResult<SearchTree> {
    if !network.contains(source) {
        return Err(SpatialError::NodeNotFound(source));
    }

    let n = network.node_count();
    let mut parent = vec![NodeId::INVALID; n];
    let mut hops   = vec![u32::MAX; n];
    let mut queue  = VecDeque::new();

    hops[source.index()] = 0;
    queue.push_back(source);

    while let Some(node) = queue.pop_front() {
        if Some(node) == stop_at {
            break;
        }
        let next_hops = hops[node.index()] + 1;
        for &neighbor in network.neighbors(node) {
            if hops[neighbor.index()] == u32::MAX {
                hops[neighbor.index()] = next_hops;
                parent[neighbor.index()] = node;
                queue.push_back(neighbor);
            }
        }
    }

    Ok(SearchTree { source, parent, hops })
}
