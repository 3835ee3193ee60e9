//! Path resolution: cached lookup with an on-demand search fallback.

use std::sync::Arc;

use tracing::debug;

use ws_core::NodeId;
use ws_spatial::{Router, WalkNetwork};

use crate::cache::PathCache;
use crate::matrix::NodePath;

/// Counters for [`PathResolver::resolve`] calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub requests:    u64,
    /// `source == target`; answered without touching the cache.
    pub trivial:     u64,
    pub cache_hits:  u64,
    /// On-demand searches run on a cache miss.
    pub searches:    u64,
    /// Searches that found no route; answered with `[source]`.
    pub unreachable: u64,
}

pub struct PathResolver<R: Router> {
    router: R,
    stats:  ResolverStats,
}

impl<R: Router> PathResolver<R> {
    pub fn new(router: R) -> Self {
        Self { router, stats: ResolverStats::default() }
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ResolverStats::default();
    }

    /// Return the path from `source` to `target`.
    ///
    /// Never fails.  A target with no route (or a node missing from
    /// `network`) yields `[source]` so the walker stands still and replans on
    /// its next tick; such fallbacks are not cached.
    pub fn resolve(
        &mut self,
        network: &WalkNetwork,
        cache: &mut PathCache,
        source: NodeId,
        target: NodeId,
    ) -> NodePath {
        self.stats.requests += 1;

        if source == target {
            self.stats.trivial += 1;
            return Arc::from(vec![source]);
        }
        if let Some(path) = cache.lookup(source, target) {
            self.stats.cache_hits += 1;
            return path;
        }

        self.stats.searches += 1;
        match self.router.route(network, source, target) {
            Ok(path) => {
                let path: NodePath = path.into();
                cache.record(source, target, path.clone());
                path
            }
            Err(e) => {
                self.stats.unreachable += 1;
                debug!(%source, %target, error = %e, "no walkable route");
                Arc::from(vec![source])
            }
        }
    }
}
