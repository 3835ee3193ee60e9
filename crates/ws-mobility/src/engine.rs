//! Path assignment and per-tick stepping.

use tracing::trace;

use ws_core::AgentRng;
use ws_paths::{PathCache, PathResolver, ResolverStats};
use ws_spatial::{Router, WalkNetwork};

use crate::{pick_destination, Walker, WalkerStore};

/// Distances within this of an edge's end count as reaching it.
const ARRIVAL_TOLERANCE_M: f64 = 1e-6;

/// Counts from one [`MobilityEngine::step_all`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Walkers that moved along an edge without reaching its end.
    pub moving:    usize,
    /// Walkers that reached the next node of their path.
    pub arrivals:  usize,
    /// Walkers with an exhausted path that were given a new destination.
    pub replanned: usize,
}

/// Drives every walker through the path cache with router `R`.
pub struct MobilityEngine<R: Router> {
    resolver: PathResolver<R>,
}

impl<R: Router> MobilityEngine<R> {
    pub fn new(router: R) -> Self {
        Self { resolver: PathResolver::new(router) }
    }

    pub fn resolver(&self) -> &PathResolver<R> {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut PathResolver<R> {
        &mut self.resolver
    }

    pub fn stats(&self) -> ResolverStats {
        self.resolver.stats()
    }

    /// Resolve and assign every walker's `(current, destination)` path.
    ///
    /// Pairs already in `cache` are hits; the rest are searched on demand.
    pub fn assign_paths(&mut self, store: &mut WalkerStore, network: &WalkNetwork, cache: &mut PathCache) {
        for (walker, _) in store.iter_mut() {
            let path = self.resolver.resolve(network, cache, walker.current_node, walker.destination_node);
            walker.assign_path(walker.destination_node, path);
        }
    }

    /// Advance every walker by `dt_secs` of simulated time.
    pub fn step_all(
        &mut self,
        store:   &mut WalkerStore,
        network: &WalkNetwork,
        cache:   &mut PathCache,
        dt_secs: f64,
    ) -> StepReport {
        let mut report = StepReport::default();
        for (walker, rng) in store.iter_mut() {
            match self.step_walker(walker, rng, network, cache, dt_secs) {
                Step::Replanned => report.replanned += 1,
                Step::Arrived   => report.arrivals += 1,
                Step::Moving    => report.moving += 1,
            }
        }
        report
    }

    fn step_walker(
        &mut self,
        walker:  &mut Walker,
        rng:     &mut AgentRng,
        network: &WalkNetwork,
        cache:   &mut PathCache,
        dt_secs: f64,
    ) -> Step {
        let Some((a, b)) = walker.edge() else {
            let destination = pick_destination(rng, network, walker.current_node);
            let path = self.resolver.resolve(network, cache, walker.current_node, destination);
            trace!(agent = %walker.id, from = %walker.current_node, to = %destination, hops = path.len() - 1, "replanned");
            walker.assign_path(destination, path);
            return Step::Replanned;
        };

        // A non-adjacent pair is crossed like a zero-length edge.
        let length_m = network.edge_length_m(a, b).unwrap_or(0.0);
        let walked_m = walker.progress * length_m + walker.speed_mps * dt_secs;

        if walked_m >= length_m - ARRIVAL_TOLERANCE_M {
            walker.path_index += 1;
            walker.current_node = b;
            walker.progress = 0.0;
            Step::Arrived
        } else {
            walker.progress = walked_m / length_m;
            Step::Moving
        }
    }
}

enum Step {
    Moving,
    Arrived,
    Replanned,
}
