//! Seeded random streams.
//!
//! Every walker owns an [`AgentRng`] derived from the run seed and its
//! [`AgentId`], so a walker's draws depend only on the seed and its own
//! history.  The order in which paths happen to be computed (worker thread or
//! local chunks) never leaks into destination choice.
//!
//! [`SimRng`] sits above the walkers and hands out one seed per population
//! epoch: the initial population is epoch 0 and each `reset` starts the next.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::{AgentId, NodeId};

/// Golden-ratio increment; spreads consecutive ids across the seed space.
const SPREAD: u64 = 0x9e37_79b9_7f4a_7c15;

// ── AgentRng ──────────────────────────────────────────────────────────────────

pub struct AgentRng(SmallRng);

impl AgentRng {
    pub fn new(seed: u64, agent: AgentId) -> Self {
        AgentRng(SmallRng::seed_from_u64(seed ^ (agent.0 as u64).wrapping_mul(SPREAD)))
    }

    /// Uniform node of a network with `node_count` nodes.
    ///
    /// `node_count` must be non-zero.
    pub fn node(&mut self, node_count: usize) -> NodeId {
        NodeId(self.0.gen_range(0..node_count as u32))
    }

    /// Uniform node other than `current`, or `current` itself when it is the
    /// only node.
    pub fn node_except(&mut self, current: NodeId, node_count: usize) -> NodeId {
        let n = node_count as u32;
        if n <= 1 {
            return current;
        }
        // Draw from the n - 1 others and step over `current`.
        let draw = self.0.gen_range(0..n - 1);
        if draw >= current.0 { NodeId(draw + 1) } else { NodeId(draw) }
    }

    /// Walking speed in `[min_mps, max_mps)`.
    pub fn speed(&mut self, min_mps: f64, max_mps: f64) -> f64 {
        self.0.gen_range(min_mps..max_mps)
    }

    pub fn pick<T: Copy>(&mut self, options: &[T]) -> Option<T> {
        if options.is_empty() {
            return None;
        }
        Some(options[self.0.gen_range(0..options.len())])
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

pub struct SimRng {
    root: u64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng { root: seed }
    }

    /// Seed for the walkers of population epoch `epoch`.  Pure: the same root
    /// and epoch always give the same seed, however often it is asked.
    pub fn epoch_seed(&self, epoch: u64) -> u64 {
        let mut rng = SmallRng::seed_from_u64(self.root ^ epoch.wrapping_mul(SPREAD));
        rng.r#gen::<u64>()
    }
}
