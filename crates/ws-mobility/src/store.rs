//! The `WalkerStore`: every walker plus its private RNG stream.

use ws_core::{AgentId, AgentRng, NodeId};
use ws_spatial::WalkNetwork;

use crate::{Appearance, MobilityError, MobilityResult, Walker};

/// Walkers indexed by `AgentId`, each with its own deterministic RNG.
///
/// `walkers` and `rngs` are always the same length.
pub struct WalkerStore {
    walkers: Vec<Walker>,
    rngs:    Vec<AgentRng>,
}

impl WalkerStore {
    /// Seed `count` walkers at random nodes, each with a random destination
    /// other than its start, a speed drawn uniformly from `[min_speed, max_speed)`
    /// and a palette colour.  Paths are placeholders until assigned.
    ///
    /// # Errors
    ///
    /// [`MobilityError::EmptyNetwork`] if `count > 0` and the network has no
    /// nodes; [`MobilityError::InvalidSpeedRange`] unless `0 < min < max`.
    pub fn seed(
        count:     usize,
        network:   &WalkNetwork,
        seed:      u64,
        min_speed: f64,
        max_speed: f64,
    ) -> MobilityResult<Self> {
        Self::seed_from(count, network, seed, min_speed, max_speed, None)
    }

    /// As [`seed`](Self::seed), but every walker starts at `origin` when one
    /// is given.  Speeds and colours are drawn as if it were not.
    pub fn seed_from(
        count:     usize,
        network:   &WalkNetwork,
        seed:      u64,
        min_speed: f64,
        max_speed: f64,
        origin:    Option<NodeId>,
    ) -> MobilityResult<Self> {
        if !(min_speed > 0.0 && max_speed > min_speed) {
            return Err(MobilityError::InvalidSpeedRange { min: min_speed, max: max_speed });
        }
        if count > 0 && network.is_empty() {
            return Err(MobilityError::EmptyNetwork(count));
        }

        let mut walkers = Vec::with_capacity(count);
        let mut rngs = Vec::with_capacity(count);
        for i in 0..count {
            let id = AgentId(i as u32);
            let mut rng = AgentRng::new(seed, id);

            let drawn = rng.node(network.node_count());
            let start = origin.unwrap_or(drawn);
            let destination = pick_destination(&mut rng, network, start);
            let speed = rng.speed(min_speed, max_speed);
            let appearance = rng.pick(&Appearance::PALETTE).unwrap_or(Appearance::Slate);

            walkers.push(Walker::placeholder(id, start, destination, speed, appearance));
            rngs.push(rng);
        }
        Ok(Self { walkers, rngs })
    }

    /// Build a store from hand-placed walkers.  Walker `i` must carry
    /// `AgentId(i)`; RNG streams are derived from `seed` as in [`seed`](Self::seed).
    pub fn from_walkers(walkers: Vec<Walker>, seed: u64) -> Self {
        let rngs = walkers.iter().map(|w| AgentRng::new(seed, w.id)).collect();
        Self { walkers, rngs }
    }

    pub fn len(&self) -> usize {
        self.walkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walkers.is_empty()
    }

    pub fn get(&self, agent: AgentId) -> MobilityResult<&Walker> {
        self.walkers.get(agent.index()).ok_or(MobilityError::UnknownAgent(agent))
    }

    pub fn walkers(&self) -> &[Walker] {
        &self.walkers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Walker> + '_ {
        self.walkers.iter()
    }

    /// Each walker paired with its RNG stream.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&mut Walker, &mut AgentRng)> + '_ {
        self.walkers.iter_mut().zip(self.rngs.iter_mut())
    }

    /// `(current, destination)` for every walker with somewhere to go, in
    /// agent order.  May contain duplicates.
    pub fn needed_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.walkers
            .iter()
            .filter(|w| w.current_node != w.destination_node)
            .map(|w| (w.current_node, w.destination_node))
    }
}

/// Uniformly random node other than `current`.
///
/// A network with a single node has no other choice; `current` is returned
/// and the walker stays put.
pub fn pick_destination(rng: &mut AgentRng, network: &WalkNetwork, current: NodeId) -> NodeId {
    rng.node_except(current, network.node_count())
}
