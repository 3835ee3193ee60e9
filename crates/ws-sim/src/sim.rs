//! The `Simulation` driver.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use ws_core::{NodeId, SimClock, SimRng, Tick};
use ws_mobility::{MobilityEngine, StepReport, Walker, WalkerStore};
use ws_paths::{
    ComputeStatus, Generation, LoadOutcome, PathCache, PathComputation, PathJob, PathMatrix, PathWorker,
    PrecomputeStrategy, ResolverStats, WorkerRequest, WorkerResponse,
};
use ws_spatial::{Router, WalkNetwork};

use crate::{AgentPosition, SimObserver, SimResult, SimSnapshot, WalkSimConfig};

pub(crate) type ProgressFn = Box<dyn FnMut(u8) + Send>;

/// How long [`Simulation::initialize_blocking`] waits on the worker per poll.
const BLOCKING_POLL: Duration = Duration::from_millis(50);

// ── SimState ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimState {
    Uninitialized,
    /// Walkers exist with placeholder paths.
    BasicAgentsReady,
    /// Paths for the walkers' first legs are being computed.
    PathsResolving,
    /// Every walker has a path; `step` advances them.
    Initialized,
    Resetting,
}

impl fmt::Display for SimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SimState::Uninitialized    => "uninitialized",
            SimState::BasicAgentsReady => "basic-agents-ready",
            SimState::PathsResolving   => "paths-resolving",
            SimState::Initialized      => "initialized",
            SimState::Resetting        => "resetting",
        };
        f.write_str(s)
    }
}

/// The in-flight batch computation.
pub(crate) enum Resolution<R: Router> {
    /// Posted to the worker; `job` is kept for the synchronous fallback.
    /// `last_heard` is when the worker last sent anything.
    Worker { last_heard: Instant, job: PathJob },
    Local(PathComputation<R>),
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// Seeds walkers, resolves their paths, and steps them.
///
/// Create via [`SimulationBuilder`][crate::SimulationBuilder].
pub struct Simulation<R: Router + Clone + 'static> {
    pub(crate) config:       WalkSimConfig,
    pub(crate) network:      Arc<WalkNetwork>,
    /// Serialized network for worker requests; built on first use.
    pub(crate) graph_json:   Option<Arc<str>>,
    pub(crate) clock:        SimClock,
    pub(crate) sim_rng:      SimRng,
    pub(crate) agent_count:  usize,
    /// Common start node for every walker, if spawning near a point.
    pub(crate) origin:       Option<NodeId>,
    pub(crate) store:        WalkerStore,
    pub(crate) cache:        PathCache,
    pub(crate) router:       R,
    pub(crate) mobility:     MobilityEngine<R>,
    pub(crate) worker:       Option<PathWorker>,
    pub(crate) state:        SimState,
    pub(crate) generation:   Generation,
    pub(crate) resolution:   Option<Resolution<R>>,
    pub(crate) progress:     Option<ProgressFn>,
    pub(crate) last_percent: u8,
}

impl<R: Router + Clone + 'static> Simulation<R> {
    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn config(&self) -> &WalkSimConfig {
        &self.config
    }

    pub fn network(&self) -> &Arc<WalkNetwork> {
        &self.network
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn walkers(&self) -> &[Walker] {
        self.store.walkers()
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    pub fn resolver_stats(&self) -> ResolverStats {
        self.mobility.stats()
    }

    /// `true` while a worker thread is attached.
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Seed walkers, load the stored path cache, and begin resolving the
    /// pairs it does not cover.  Does nothing unless `Uninitialized`.
    pub fn start(&mut self) -> SimResult<SimState> {
        if self.state != SimState::Uninitialized {
            return Ok(self.state);
        }
        self.seed_walkers()?;
        self.load_cache();
        self.begin_resolution();
        Ok(self.state)
    }

    /// Drive path resolution one increment: drain waiting worker messages,
    /// or run one synchronous chunk.  Returns the resulting state.
    pub fn poll(&mut self) -> SimState {
        self.advance_resolution(Duration::ZERO);
        self.state
    }

    /// Start if needed, then poll until `Initialized`.
    ///
    /// Always terminates: a worker silent for `offload.timeout_ms` is
    /// abandoned and the computation finishes on this thread.
    pub fn initialize_blocking(&mut self) -> SimResult<()> {
        if self.state == SimState::Uninitialized {
            self.start()?;
        }
        while self.state != SimState::Initialized {
            if self.resolution.is_none() {
                self.begin_resolution();
            }
            self.advance_resolution(BLOCKING_POLL);
        }
        Ok(())
    }

    /// Advance every walker one tick.  Returns `None` (and does nothing)
    /// before initialization completes.
    pub fn step(&mut self) -> Option<StepReport> {
        if self.state != SimState::Initialized {
            return None;
        }
        // Prefetched single paths land in the cache before walkers replan.
        if self.worker.is_some() {
            self.drain_worker(Duration::ZERO);
        }
        let report = self.mobility.step_all(
            &mut self.store,
            &self.network,
            &mut self.cache,
            self.clock.tick_duration_secs,
        );
        self.clock.advance();
        Some(report)
    }

    /// Initialize if needed, then step `sim.total_ticks` times.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let ticks = self.config.sim.total_ticks;
        self.run_ticks(ticks, observer)
    }

    /// Initialize if needed, then step exactly `n` times.
    pub fn run_ticks<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        self.initialize_blocking()?;
        let interval = self.config.sim.output_interval_ticks;
        if interval > 0 && self.clock.current_tick == Tick::ZERO {
            observer.on_snapshot(&self.get_state());
        }
        for _ in 0..n {
            let Some(report) = self.step() else { break };
            let tick = self.clock.current_tick;
            observer.on_tick_end(tick, &report);
            if interval > 0 && tick.0 % interval == 0 {
                observer.on_snapshot(&self.get_state());
            }
        }
        observer.on_sim_end(self.clock.current_tick);
        Ok(())
    }

    /// Current positions of every walker.
    pub fn get_state(&self) -> SimSnapshot {
        let network = self.network.as_ref();
        let agents = self
            .store
            .iter()
            .map(|w| {
                let pos = w.position(network);
                AgentPosition {
                    id:               w.label(),
                    lat:              pos.lat,
                    lng:              pos.lon,
                    current_node:     network.node_key(w.current_node).to_owned(),
                    destination_node: network.node_key(w.destination_node).to_owned(),
                }
            })
            .collect();
        SimSnapshot {
            tick: self.clock.current_tick.0,
            agents,
            timestamp: self.clock.current_unix_ms(),
        }
    }

    /// Replace the population with `count` fresh walkers and re-initialize.
    ///
    /// The in-memory path tiers are dropped and the stored record reloaded;
    /// the stored record itself is kept.  Results still in flight for the
    /// previous population are discarded when they arrive.
    pub fn reset(&mut self, count: usize) -> SimResult<SimState> {
        self.state = SimState::Resetting;
        self.generation += 1;
        self.resolution = None;
        self.cache.clear_memory();
        self.clock.rewind();
        self.agent_count = count;
        info!(agents = count, generation = self.generation, "resetting population");

        if let Err(e) = self.seed_walkers() {
            self.state = SimState::Uninitialized;
            return Err(e);
        }
        self.load_cache();
        self.begin_resolution();
        Ok(self.state)
    }

    /// Remove the stored path record and empty the matrix.
    pub fn clear_cache(&mut self) -> SimResult<()> {
        self.cache.clear()?;
        info!("path cache cleared");
        Ok(())
    }

    /// Write the matrix to the cache store now.  Returns entries written.
    pub fn persist_cache(&self) -> SimResult<usize> {
        Ok(self.cache.persist(&self.network)?)
    }

    /// Stop and join the worker thread.  Later resolution runs synchronously.
    pub fn cleanup(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
            debug!("path worker released");
        }
        self.abandon_worker_batch();
    }

    /// Resolve a path by node key through the cache.
    ///
    /// # Errors
    ///
    /// [`SpatialError::UnknownNode`](ws_spatial::SpatialError::UnknownNode)
    /// if either key is missing.
    pub fn resolve_keys(&mut self, from: &str, to: &str) -> SimResult<Vec<String>> {
        let a = self.network.require_node(from)?;
        let b = self.network.require_node(to)?;
        let path = self.mobility.resolver_mut().resolve(&self.network, &mut self.cache, a, b);
        Ok(path.iter().map(|&n| self.network.node_key(n).to_owned()).collect())
    }

    /// Warm the cache with one path ahead of need.
    ///
    /// With a worker attached the search runs there and the result is
    /// recorded on a later `step` or `poll`; otherwise it is resolved now.
    pub fn prefetch_path(&mut self, from: &str, to: &str) -> SimResult<()> {
        let a = self.network.require_node(from)?;
        let b = self.network.require_node(to)?;
        if self.cache.lookup(a, b).is_some() {
            return Ok(());
        }
        if self.worker.is_some() && self.resolution.is_none() {
            let request = WorkerRequest::ComputeSinglePath {
                generation: self.generation,
                graph:      self.graph_payload(),
                from:       from.to_owned(),
                to:         to.to_owned(),
            };
            if let Some(worker) = &self.worker {
                if worker.post(request).is_ok() {
                    return Ok(());
                }
            }
        }
        self.mobility.resolver_mut().resolve(&self.network, &mut self.cache, a, b);
        Ok(())
    }

    // ── Initialization internals ──────────────────────────────────────────

    fn seed_walkers(&mut self) -> SimResult<()> {
        let seed = self.sim_rng.epoch_seed(self.generation);
        let sim = &self.config.sim;
        self.store = WalkerStore::seed_from(
            self.agent_count,
            &self.network,
            seed,
            sim.min_speed_mps,
            sim.max_speed_mps,
            self.origin,
        )?;
        self.state = SimState::BasicAgentsReady;
        debug!(agents = self.store.len(), "walkers seeded");
        Ok(())
    }

    fn load_cache(&mut self) {
        if let LoadOutcome::Loaded(entries) = self.cache.load(&self.network) {
            info!(entries, "reusing stored path cache");
        }
    }

    fn begin_resolution(&mut self) {
        self.state = SimState::PathsResolving;
        self.last_percent = 0;
        self.report_progress(0);

        let job = match self.config.precompute {
            PrecomputeStrategy::NeededPairs => PathJob::from_pairs(self.store.needed_pairs()),
            PrecomputeStrategy::AllPairs => PathJob::all_pairs(&self.network),
        }
        .without_cached(self.cache.matrix());

        if job.is_empty() {
            self.finish_resolution(PathMatrix::new());
            return;
        }
        info!(sources = job.source_count(), offload = self.worker.is_some(), "resolving paths");

        if self.worker.is_some() {
            let request = WorkerRequest::ComputePaths {
                generation: self.generation,
                graph:      self.graph_payload(),
                job:        job.to_keyed(&self.network),
                chunk_size: self.config.offload.chunk_size,
            };
            let posted = self.worker.as_ref().map(|w| w.post(request));
            match posted {
                Some(Ok(())) => {
                    self.resolution = Some(Resolution::Worker { last_heard: Instant::now(), job });
                    return;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "path worker unreachable; computing synchronously");
                    self.worker = None;
                }
                None => {}
            }
        }
        self.run_locally(job);
    }

    fn run_locally(&mut self, job: PathJob) {
        self.resolution = Some(Resolution::Local(PathComputation::new(
            Arc::clone(&self.network),
            self.router.clone(),
            job,
            self.config.offload.chunk_size,
        )));
    }

    fn advance_resolution(&mut self, wait: Duration) {
        if matches!(self.resolution, Some(Resolution::Worker { .. })) {
            self.drain_worker(wait);
        }

        match self.resolution.take() {
            None => {}
            Some(Resolution::Worker { last_heard, job }) => {
                if last_heard.elapsed() >= self.config.offload.timeout() {
                    warn!(
                        timeout_ms = self.config.offload.timeout_ms,
                        "path worker timed out; computing synchronously"
                    );
                    // Whatever the worker sends later belongs to an abandoned request.
                    self.generation += 1;
                    self.run_locally(job);
                } else {
                    self.resolution = Some(Resolution::Worker { last_heard, job });
                }
            }
            Some(Resolution::Local(mut computation)) => match computation.step() {
                Ok(ComputeStatus::InProgress(percent)) => {
                    self.report_progress(percent);
                    self.resolution = Some(Resolution::Local(computation));
                }
                Ok(ComputeStatus::Done) => self.finish_resolution(computation.into_matrix()),
                Err(e) => {
                    warn!(error = %e, "batch path computation failed; resolving on demand");
                    self.finish_resolution(PathMatrix::new());
                }
            },
        }
    }

    /// Handle every waiting worker message, waiting up to `wait` for the first.
    fn drain_worker(&mut self, wait: Duration) {
        let mut wait = wait;
        loop {
            let Some(worker) = &self.worker else { return };
            let received = worker.recv_timeout(wait);
            wait = Duration::ZERO;
            match received {
                Ok(Some(response)) => {
                    // Stale messages count too: the worker is still draining
                    // its queue.
                    if let Some(Resolution::Worker { last_heard, .. }) = self.resolution.as_mut() {
                        *last_heard = Instant::now();
                    }
                    self.handle_response(response);
                }
                Ok(None) => return,
                Err(e) => {
                    warn!(error = %e, "path worker lost; computing synchronously");
                    self.worker = None;
                    self.abandon_worker_batch();
                    return;
                }
            }
        }
    }

    fn handle_response(&mut self, response: WorkerResponse) {
        if response.generation() != self.generation {
            debug!(
                got = response.generation(),
                current = self.generation,
                "discarding stale worker result"
            );
            return;
        }
        let awaiting_batch = matches!(self.resolution, Some(Resolution::Worker { .. }));

        match response {
            WorkerResponse::Progress { percent, .. } => {
                if awaiting_batch {
                    self.report_progress(percent);
                }
            }
            WorkerResponse::PathsComputed { paths, .. } => {
                if !awaiting_batch {
                    return;
                }
                let Some(Resolution::Worker { job, .. }) = self.resolution.take() else {
                    return;
                };
                match PathMatrix::from_keyed(&paths, &self.network) {
                    Ok(matrix) => self.finish_resolution(matrix),
                    Err(e) => {
                        warn!(error = %e, "worker paths unusable; computing synchronously");
                        self.run_locally(job);
                    }
                }
            }
            WorkerResponse::SinglePathComputed { from, to, path, .. } => {
                let mut single = ws_paths::KeyedMatrix::new();
                single.entry(from).or_default().insert(to, path);
                match PathMatrix::from_keyed(&single, &self.network) {
                    Ok(matrix) => {
                        self.cache.merge_matrix(matrix);
                    }
                    Err(e) => debug!(error = %e, "dropping prefetched path"),
                }
            }
            WorkerResponse::Failed { reason, .. } => {
                warn!(%reason, "path worker request failed");
                self.abandon_worker_batch();
            }
        }
    }

    /// Move a batch posted to the worker onto this thread.  A local
    /// computation already under way is left alone.
    fn abandon_worker_batch(&mut self) {
        if !matches!(self.resolution, Some(Resolution::Worker { .. })) {
            return;
        }
        if let Some(Resolution::Worker { job, .. }) = self.resolution.take() {
            self.run_locally(job);
        }
    }

    fn finish_resolution(&mut self, computed: PathMatrix) {
        self.resolution = None;
        let added = self.cache.merge_matrix(computed);
        self.mobility.assign_paths(&mut self.store, &self.network, &mut self.cache);

        if self.config.cache.persist_after_init && added > 0 {
            if let Err(e) = self.cache.persist(&self.network) {
                warn!(error = %e, "could not persist path cache");
            }
        }
        self.state = SimState::Initialized;
        self.report_progress(100);
        info!(
            walkers = self.store.len(),
            computed = added,
            cached = self.cache.matrix().len(),
            generation = self.generation,
            "paths ready"
        );
    }

    fn report_progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent < self.last_percent {
            return;
        }
        self.last_percent = percent;
        if let Some(callback) = self.progress.as_mut() {
            callback(percent);
        }
    }

    fn graph_payload(&mut self) -> Arc<str> {
        let network = &self.network;
        Arc::clone(self.graph_json.get_or_insert_with(|| network.to_json().into()))
    }
}

impl<R: Router + Clone + 'static> fmt::Debug for Simulation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("tick", &self.clock.current_tick)
            .field("walkers", &self.store.len())
            .field("cache", &self.cache)
            .field("worker", &self.worker.is_some())
            .finish()
    }
}
