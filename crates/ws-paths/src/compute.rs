//! Chunked batch path computation.
//!
//! A [`PathJob`] groups the wanted pairs by source, so each source costs one
//! breadth-first search regardless of how many targets it has.  A
//! [`PathComputation`] works through the job `chunk_size` sources at a time
//! and reports a non-decreasing percentage after each chunk.  The worker
//! thread and the synchronous fallback both drive the same state machine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ws_core::NodeId;
use ws_spatial::{Router, WalkNetwork};

use crate::matrix::{NodePath, PathMatrix};
use crate::PathsResult;

// ── PrecomputeStrategy ────────────────────────────────────────────────────────

/// Which pairs initialization computes up front.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecomputeStrategy {
    /// Only each walker's `(current, destination)` pair.
    #[default]
    NeededPairs,
    /// Every reachable ordered pair.  Quadratic in node count; meant for
    /// small districts where later replans should never search.
    AllPairs,
}

// ── PathJob ───────────────────────────────────────────────────────────────────

/// Targets wanted from one source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Targets {
    /// Every node the search reaches.
    All,
    /// Only these nodes.
    Only(BTreeSet<NodeId>),
}

/// Source-keyed form of a job, as carried in worker requests.
/// `None` targets means "all".
pub type KeyedJob = Vec<(String, Option<Vec<String>>)>;

/// A set of pairs to compute, grouped by source in ascending order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathJob {
    sources: BTreeMap<NodeId, Targets>,
}

impl PathJob {
    /// Group explicit pairs by source.  Trivial `(n, n)` pairs are dropped.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (NodeId, NodeId)>) -> Self {
        let mut sources: BTreeMap<NodeId, Targets> = BTreeMap::new();
        for (source, target) in pairs {
            if source == target {
                continue;
            }
            match sources.entry(source).or_insert_with(|| Targets::Only(BTreeSet::new())) {
                Targets::Only(set) => {
                    set.insert(target);
                }
                Targets::All => {}
            }
        }
        Self { sources }
    }

    /// Every node as a source, every reachable node as a target.
    pub fn all_pairs(network: &WalkNetwork) -> Self {
        Self { sources: network.node_ids().map(|n| (n, Targets::All)).collect() }
    }

    /// Drop explicit pairs `matrix` already holds, and sources left with none.
    ///
    /// `Targets::All` sources are kept: the matrix cannot tell whether a row
    /// is complete.
    pub fn without_cached(mut self, matrix: &PathMatrix) -> Self {
        self.sources.retain(|&source, targets| match targets {
            Targets::All => true,
            Targets::Only(set) => {
                set.retain(|&t| !matrix.contains(source, t));
                !set.is_empty()
            }
        });
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Targets)> + '_ {
        self.sources.iter().map(|(&s, t)| (s, t))
    }

    pub fn to_keyed(&self, network: &WalkNetwork) -> KeyedJob {
        self.iter()
            .map(|(source, targets)| {
                let targets = match targets {
                    Targets::All => None,
                    Targets::Only(set) => {
                        Some(set.iter().map(|&t| network.node_key(t).to_owned()).collect())
                    }
                };
                (network.node_key(source).to_owned(), targets)
            })
            .collect()
    }

    /// # Errors
    ///
    /// [`SpatialError::UnknownNode`](ws_spatial::SpatialError::UnknownNode)
    /// if any key is missing from `network`.
    pub fn from_keyed(keyed: &KeyedJob, network: &WalkNetwork) -> PathsResult<Self> {
        let mut sources = BTreeMap::new();
        for (source_key, targets) in keyed {
            let source = network.require_node(source_key)?;
            let targets = match targets {
                None => Targets::All,
                Some(keys) => Targets::Only(
                    keys.iter()
                        .map(|k| network.require_node(k))
                        .collect::<Result<_, _>>()?,
                ),
            };
            sources.insert(source, targets);
        }
        Ok(Self { sources })
    }
}

// ── PathComputation ───────────────────────────────────────────────────────────

/// Outcome of one [`PathComputation::step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputeStatus {
    /// Percentage of sources processed so far, `0..100`.
    InProgress(u8),
    Done,
}

pub struct PathComputation<R: Router> {
    network:    Arc<WalkNetwork>,
    router:     R,
    plan:       Vec<(NodeId, Targets)>,
    cursor:     usize,
    chunk_size: usize,
    matrix:     PathMatrix,
}

impl<R: Router> PathComputation<R> {
    /// `chunk_size` is clamped to at least 1.
    pub fn new(network: Arc<WalkNetwork>, router: R, job: PathJob, chunk_size: usize) -> Self {
        Self {
            network,
            router,
            plan: job.sources.into_iter().collect(),
            cursor: 0,
            chunk_size: chunk_size.max(1),
            matrix: PathMatrix::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.plan.len()
    }

    /// Share of sources processed, 0–100.  An empty job is 100 % done.
    pub fn percent(&self) -> u8 {
        if self.plan.is_empty() {
            return 100;
        }
        ((self.cursor * 100) / self.plan.len()) as u8
    }

    /// Entries computed so far.
    pub fn computed(&self) -> usize {
        self.matrix.len()
    }

    /// Process the next chunk of sources.
    ///
    /// Unreachable targets are left out of the matrix; the resolver answers
    /// them with a stand-still path when a walker asks.
    pub fn step(&mut self) -> PathsResult<ComputeStatus> {
        if self.is_done() {
            return Ok(ComputeStatus::Done);
        }
        let end = (self.cursor + self.chunk_size).min(self.plan.len());
        let chunk = &self.plan[self.cursor..end];
        let network = self.network.as_ref();
        let router = &self.router;

        #[cfg(not(feature = "parallel"))]
        let rows = chunk
            .iter()
            .map(|(source, targets)| solve_source(network, router, *source, targets))
            .collect::<PathsResult<Vec<_>>>()?;

        #[cfg(feature = "parallel")]
        let rows = {
            use rayon::prelude::*;
            chunk
                .par_iter()
                .map(|(source, targets)| solve_source(network, router, *source, targets))
                .collect::<PathsResult<Vec<_>>>()?
        };

        for (source, row) in rows {
            for (target, path) in row {
                self.matrix.insert(source, target, path);
            }
        }
        self.cursor = end;

        Ok(if self.is_done() {
            ComputeStatus::Done
        } else {
            ComputeStatus::InProgress(self.percent())
        })
    }

    /// Step until done, calling `progress` after every intermediate chunk.
    pub fn run(mut self, mut progress: impl FnMut(u8)) -> PathsResult<PathMatrix> {
        while let ComputeStatus::InProgress(p) = self.step()? {
            progress(p);
        }
        Ok(self.matrix)
    }

    pub fn into_matrix(self) -> PathMatrix {
        self.matrix
    }
}

type SourceRow = (NodeId, Vec<(NodeId, NodePath)>);

fn solve_source<R: Router>(
    network: &WalkNetwork,
    router:  &R,
    source:  NodeId,
    targets: &Targets,
) -> PathsResult<SourceRow> {
    let tree = router.search(network, source)?;
    let row = match targets {
        Targets::All => tree
            .reached()
            .filter(|&t| t != source)
            .filter_map(|t| tree.path_to(t).map(|p| (t, NodePath::from(p))))
            .collect(),
        Targets::Only(set) => set
            .iter()
            .filter_map(|&t| tree.path_to(t).map(|p| (t, NodePath::from(p))))
            .collect(),
    };
    Ok((source, row))
}
