//! Fluent builder for constructing a [`Simulation`].

use std::sync::Arc;

use tracing::{info, warn};

use ws_core::{GeoPoint, SimRng};
use ws_mobility::{MobilityEngine, WalkerStore};
use ws_paths::{CacheStore, PathCache, PathWorker, SledCacheStore};
use ws_spatial::{BfsRouter, Router, WalkNetwork};

use crate::sim::{ProgressFn, SimState};
use crate::{Simulation, SimResult, WalkSimConfig};

/// Fluent builder for [`Simulation<R>`].
///
/// # Optional inputs (have defaults)
///
/// | Method               | Default                                         |
/// |----------------------|-------------------------------------------------|
/// | `.router(r)`         | [`BfsRouter`]                                   |
/// | `.agent_count(n)`    | `config.sim.agent_count`                        |
/// | `.spawn_near(p)`     | each walker starts at a random node             |
/// | `.cache_store(s)`    | sled at `config.cache.store_path`, else none    |
/// | `.on_progress(f)`    | no callback                                     |
///
/// # Example
///
/// ```rust,ignore
/// let network = ws_spatial::load_from_path(Path::new("kista.json"))?;
/// let mut sim = SimulationBuilder::new(WalkSimConfig::default(), network)
///     .on_progress(|p| eprintln!("paths {p}%"))
///     .build()?;
/// sim.initialize_blocking()?;
/// sim.step();
/// ```
pub struct SimulationBuilder<R: Router + Clone + 'static = BfsRouter> {
    config:      WalkSimConfig,
    network:     Arc<WalkNetwork>,
    router:      R,
    agent_count: Option<usize>,
    spawn_near:  Option<GeoPoint>,
    store:       Option<Arc<dyn CacheStore>>,
    progress:    Option<ProgressFn>,
}

impl SimulationBuilder<BfsRouter> {
    pub fn new(config: WalkSimConfig, network: impl Into<Arc<WalkNetwork>>) -> Self {
        Self {
            config,
            network: network.into(),
            router: BfsRouter,
            agent_count: None,
            spawn_near: None,
            store: None,
            progress: None,
        }
    }
}

impl<R: Router + Clone + 'static> SimulationBuilder<R> {
    /// Route with `router` instead of breadth-first search.
    pub fn router<R2: Router + Clone + 'static>(self, router: R2) -> SimulationBuilder<R2> {
        SimulationBuilder {
            config:      self.config,
            network:     self.network,
            router,
            agent_count: self.agent_count,
            spawn_near:  self.spawn_near,
            store:       self.store,
            progress:    self.progress,
        }
    }

    pub fn agent_count(mut self, count: usize) -> Self {
        self.agent_count = Some(count);
        self
    }

    /// Start every walker at the network node nearest `point`.
    pub fn spawn_near(mut self, point: GeoPoint) -> Self {
        self.spawn_near = Some(point);
        self
    }

    /// Persist the path cache in `store`, overriding `config.cache.store_path`.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Called with a non-decreasing 0–100 percentage while paths resolve.
    pub fn on_progress(mut self, callback: impl FnMut(u8) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Validate the configuration, open the cache store, and spawn the
    /// worker.
    ///
    /// A store that cannot be opened or a worker that cannot be spawned is
    /// logged and skipped; the simulation still runs, without persistence or
    /// offloading respectively.
    pub fn build(self) -> SimResult<Simulation<R>> {
        let mut config = self.config;
        if let Some(count) = self.agent_count {
            config.sim.agent_count = count;
        }
        config.validate()?;

        let store = match (self.store, &config.cache.store_path) {
            (Some(store), _) => Some(store),
            (None, Some(path)) => match SledCacheStore::open(path) {
                Ok(s) => Some(Arc::new(s) as Arc<dyn CacheStore>),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "path cache store unavailable; not persisting");
                    None
                }
            },
            (None, None) => None,
        };
        let cache = match store {
            Some(store) => PathCache::with_store(config.cache.clone(), store),
            None => PathCache::new(config.cache.clone()),
        };

        let worker = if config.offload.enabled {
            match PathWorker::spawn_with(self.router.clone()) {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!(error = %e, "path worker unavailable; computing synchronously");
                    None
                }
            }
        } else {
            None
        };

        let origin = self.spawn_near.and_then(|p| self.network.nearest_node(p));
        if let Some(node) = origin {
            info!(origin = %node, key = self.network.node_key(node), "walkers spawn near a fixed point");
        }

        info!(
            nodes = self.network.node_count(),
            edges = self.network.edge_count(),
            agents = config.sim.agent_count,
            offload = worker.is_some(),
            persist = cache.has_store(),
            "simulation built"
        );

        Ok(Simulation {
            clock:       config.sim.make_clock(),
            sim_rng:     SimRng::new(config.sim.seed),
            agent_count: config.sim.agent_count,
            origin,
            store:       WalkerStore::from_walkers(Vec::new(), config.sim.seed),
            mobility:    MobilityEngine::new(self.router.clone()),
            router:      self.router,
            network:     self.network,
            graph_json:  None,
            cache,
            worker,
            state:       SimState::Uninitialized,
            generation:  0,
            resolution:  None,
            progress:    self.progress,
            last_percent: 0,
            config,
        })
    }
}
