//! Unit tests for ws-sim.

#[cfg(test)]
mod helpers {
    use std::sync::Arc;

    use ws_core::GeoPoint;
    use ws_spatial::{WalkNetwork, WalkNetworkBuilder};

    use crate::WalkSimConfig;

    /// 4×4 lattice, keys `r{row}c{col}`, about 55 m between neighbours.
    pub fn lattice() -> Arc<WalkNetwork> {
        let mut b = WalkNetworkBuilder::new();
        let mut ids = Vec::new();
        for r in 0..4 {
            for c in 0..4 {
                let pos = GeoPoint::new(59.40 + r as f64 * 0.0005, 17.94 + c as f64 * 0.0005);
                ids.push(b.add_node(format!("r{r}c{c}"), pos).unwrap());
            }
        }
        for r in 0..4 {
            for c in 0..4 {
                if c < 3 {
                    b.add_edge(ids[r * 4 + c], ids[r * 4 + c + 1]);
                }
                if r < 3 {
                    b.add_edge(ids[r * 4 + c], ids[(r + 1) * 4 + c]);
                }
            }
        }
        Arc::new(b.build())
    }

    /// A(0,0) ─ B(0,0.001) ─ C(0,0.002) in the walk-export layout.
    pub const LINE_JSON: &str = r#"{
        "nodes": {
            "A": { "id": "A", "lat": 0.0, "lng": 0.0 },
            "B": { "id": "B", "lat": 0.0, "lng": 0.001 },
            "C": { "id": "C", "lat": 0.0, "lng": 0.002 }
        },
        "edges": [
            { "id": "e1", "from": "A", "to": "B" },
            { "id": "e2", "from": "B", "to": "C" }
        ]
    }"#;

    pub fn config(offload: bool, agents: usize) -> WalkSimConfig {
        let mut c = WalkSimConfig::default();
        c.sim.agent_count = agents;
        c.sim.seed = 99;
        c.offload.enabled = offload;
        c.offload.chunk_size = 3;
        c
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod config {
    use ws_paths::PrecomputeStrategy;

    use crate::{SimError, WalkSimConfig};

    #[test]
    fn empty_file_is_default() {
        assert_eq!(WalkSimConfig::from_toml_str("").unwrap(), WalkSimConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let c = WalkSimConfig::from_toml_str(
            r#"
            precompute = "all_pairs"

            [sim]
            agent_count = 12

            [offload]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(c.precompute, PrecomputeStrategy::AllPairs);
        assert_eq!(c.sim.agent_count, 12);
        assert_eq!(c.sim.seed, 42);
        assert!(!c.offload.enabled);
        assert_eq!(c.offload.chunk_size, 10);
        assert_eq!(c.cache.format_version, "1.0");
        assert_eq!(c.cache.max_age_secs, 86_400);
    }

    #[test]
    fn zero_chunk_rejected() {
        assert!(matches!(
            WalkSimConfig::from_toml_str("[offload]\nchunk_size = 0\n"),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn bad_speed_rejected() {
        assert!(matches!(
            WalkSimConfig::from_toml_str("[sim]\nmin_speed_mps = 2.0\nmax_speed_mps = 1.0\n"),
            Err(SimError::Core(_))
        ));
    }

    #[test]
    fn unparseable_rejected() {
        assert!(matches!(WalkSimConfig::from_toml_str("sim = ["), Err(SimError::Toml(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walksim.toml");
        std::fs::write(&path, "[sim]\nagent_count = 3\n").unwrap();
        assert_eq!(WalkSimConfig::from_path(&path).unwrap().sim.agent_count, 3);
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use std::sync::{Arc, Mutex};

    use ws_core::GeoPoint;

    use super::helpers::{config, lattice};
    use crate::{SimState, SimulationBuilder};

    #[test]
    fn synchronous_init_by_polling() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut sim = SimulationBuilder::new(config(false, 20), lattice())
            .on_progress(move |p| sink.lock().unwrap().push(p))
            .build()
            .unwrap();

        assert_eq!(sim.state(), SimState::Uninitialized);
        assert!(sim.step().is_none());
        assert!(!sim.has_worker());

        assert_eq!(sim.start().unwrap(), SimState::PathsResolving);
        assert_eq!(sim.walkers().len(), 20);

        let mut polls = 0;
        while sim.poll() != SimState::Initialized {
            polls += 1;
            assert!(polls < 100);
        }
        assert!(polls > 0);

        let progress = seen.lock().unwrap().clone();
        assert_eq!(progress.first(), Some(&0));
        assert_eq!(progress.last(), Some(&100));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));

        for w in sim.walkers() {
            assert_eq!(w.path[0], w.current_node);
            assert_eq!(w.path.last(), Some(&w.destination_node));
        }
        assert!(sim.step().is_some());
        assert_eq!(sim.clock().current_tick.0, 1);
    }

    #[test]
    fn start_is_idempotent() {
        let mut sim = SimulationBuilder::new(config(false, 5), lattice()).build().unwrap();
        sim.initialize_blocking().unwrap();
        let first: Vec<_> = sim.walkers().iter().map(|w| w.current_node).collect();
        assert_eq!(sim.start().unwrap(), SimState::Initialized);
        let again: Vec<_> = sim.walkers().iter().map(|w| w.current_node).collect();
        assert_eq!(first, again);
    }

    #[test]
    fn reset_reseeds_and_reinitializes() {
        let mut sim = SimulationBuilder::new(config(false, 10), lattice()).build().unwrap();
        sim.initialize_blocking().unwrap();
        for _ in 0..5 {
            sim.step();
        }

        sim.reset(4).unwrap();
        assert_eq!(sim.generation(), 1);
        assert_eq!(sim.walkers().len(), 4);
        assert_eq!(sim.clock().current_tick.0, 0);
        assert_eq!(sim.state(), SimState::PathsResolving);
        assert!(sim.step().is_none());

        sim.initialize_blocking().unwrap();
        assert_eq!(sim.state(), SimState::Initialized);
    }

    #[test]
    fn spawn_near_starts_walkers_at_nearest_node() {
        let net = lattice();
        let target = net.require_node("r2c1").unwrap();
        let mut sim = SimulationBuilder::new(config(false, 12), Arc::clone(&net))
            .spawn_near(GeoPoint::new(59.40102, 17.94048))
            .build()
            .unwrap();
        sim.initialize_blocking().unwrap();
        for w in sim.walkers() {
            assert_eq!(w.current_node, target);
            assert_eq!(w.path[0], target);
            assert_ne!(w.destination_node, target);
        }

        // The origin survives a reset.
        sim.reset(3).unwrap();
        assert!(sim.walkers().iter().all(|w| w.current_node == target));
    }

    #[test]
    fn empty_population_initializes_immediately() {
        let mut sim = SimulationBuilder::new(config(false, 0), lattice()).build().unwrap();
        assert_eq!(sim.start().unwrap(), SimState::Initialized);
        assert!(sim.get_state().agents.is_empty());
    }
}

// ── Offloading ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod offload {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use ws_core::NodeId;
    use ws_paths::PrecomputeStrategy;
    use ws_spatial::{BfsRouter, Router, SearchTree, SpatialResult, WalkNetwork};

    use super::helpers::{config, lattice};
    use crate::{SimState, SimulationBuilder, WalkSimConfig};

    #[test]
    fn worker_matches_synchronous_positions() {
        let mut local = SimulationBuilder::new(config(false, 25), lattice()).build().unwrap();
        let mut offloaded = SimulationBuilder::new(config(true, 25), lattice()).build().unwrap();
        assert!(offloaded.has_worker());

        local.initialize_blocking().unwrap();
        offloaded.initialize_blocking().unwrap();
        assert_eq!(offloaded.generation(), 0);

        for _ in 0..40 {
            local.step();
            offloaded.step();
        }
        assert_eq!(local.get_state(), offloaded.get_state());
    }

    #[test]
    fn reset_while_resolving_discards_old_generation() {
        let mut sim = SimulationBuilder::new(config(true, 30), lattice()).build().unwrap();
        sim.start().unwrap();
        sim.reset(7).unwrap();
        sim.initialize_blocking().unwrap();

        assert_eq!(sim.generation(), 1);
        assert_eq!(sim.walkers().len(), 7);
        for w in sim.walkers() {
            assert_eq!(w.path[0], w.current_node);
        }
    }

    /// Breadth-first search that crawls when run on the worker thread.
    #[derive(Clone, Copy, Default)]
    struct SlowOnWorker;

    impl Router for SlowOnWorker {
        fn search(&self, network: &WalkNetwork, source: NodeId) -> SpatialResult<SearchTree> {
            if thread::current().name() == Some("walksim-paths") {
                thread::sleep(Duration::from_millis(30));
            }
            BfsRouter.search(network, source)
        }
    }

    #[test]
    fn silent_worker_times_out_to_local() {
        let mut cfg = config(true, 20);
        cfg.offload.timeout_ms = 5;
        let mut sim = SimulationBuilder::new(cfg, lattice()).router(SlowOnWorker).build().unwrap();

        sim.initialize_blocking().unwrap();
        assert_eq!(sim.state(), SimState::Initialized);
        // The abandoned request's generation is retired.
        assert_eq!(sim.generation(), 1);
        assert!(sim.step().is_some());
    }

    /// Breadth-first search that takes 20 ms per source on the worker thread.
    #[derive(Clone, Copy, Default)]
    struct SteadyOnWorker;

    impl Router for SteadyOnWorker {
        fn search(&self, network: &WalkNetwork, source: NodeId) -> SpatialResult<SearchTree> {
            if thread::current().name() == Some("walksim-paths") {
                thread::sleep(Duration::from_millis(20));
            }
            BfsRouter.search(network, source)
        }
    }

    fn steady_all_pairs() -> WalkSimConfig {
        let mut cfg = config(true, 10);
        cfg.precompute = PrecomputeStrategy::AllPairs;
        cfg.offload.chunk_size = 1;
        cfg.offload.timeout_ms = 100;
        cfg
    }

    #[test]
    fn reporting_worker_outlives_timeout() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut sim = SimulationBuilder::new(steady_all_pairs(), lattice())
            .router(SteadyOnWorker)
            .on_progress(move |p| sink.lock().unwrap().push(p))
            .build()
            .unwrap();

        // 16 sources at 20 ms each is well past the 100 ms timeout.
        sim.initialize_blocking().unwrap();
        assert_eq!(sim.generation(), 0);
        assert_eq!(sim.cache().matrix().len(), 16 * 15);

        let progress = seen.lock().unwrap().clone();
        assert!(progress.len() > 3);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&100));
    }

    #[test]
    fn busy_worker_survives_reset() {
        let mut sim = SimulationBuilder::new(steady_all_pairs(), lattice())
            .router(SteadyOnWorker)
            .build()
            .unwrap();
        sim.start().unwrap();
        sim.reset(5).unwrap();
        // The superseded job keeps the worker busy, and talking, before the
        // new one starts.
        sim.initialize_blocking().unwrap();
        assert_eq!(sim.generation(), 1);
        assert_eq!(sim.walkers().len(), 5);
    }

    #[test]
    fn cleanup_releases_worker() {
        let mut sim = SimulationBuilder::new(config(true, 6), lattice()).build().unwrap();
        sim.initialize_blocking().unwrap();
        sim.cleanup();
        assert!(!sim.has_worker());

        sim.reset(3).unwrap();
        sim.initialize_blocking().unwrap();
        assert_eq!(sim.walkers().len(), 3);
    }

    #[test]
    fn prefetch_lands_in_cache() {
        let net = lattice();
        let mut sim = SimulationBuilder::new(config(true, 1), net.clone()).build().unwrap();
        sim.initialize_blocking().unwrap();

        let w = &sim.walkers()[0];
        let (from, to) = if (net.node_key(w.current_node), net.node_key(w.destination_node)) == ("r3c3", "r0c0") {
            ("r0c0", "r3c3")
        } else {
            ("r3c3", "r0c0")
        };
        let (a, b) = (net.node_id(from).unwrap(), net.node_id(to).unwrap());

        sim.prefetch_path(from, to).unwrap();
        let mut waited = 0;
        while sim.cache().lookup(a, b).is_none() {
            thread::sleep(Duration::from_millis(5));
            sim.step();
            waited += 1;
            assert!(waited < 1_000, "prefetched path never arrived");
        }
        assert_eq!(sim.cache().lookup(a, b).unwrap().len(), 7);
    }
}

// ── Persistence ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod persistence {
    use std::sync::Arc;

    use ws_paths::{CacheStore, KeyedMatrix, MemoryCacheStore, PersistedPathCache, CACHE_KEY};

    use super::helpers::{config, lattice};
    use crate::{SimState, SimulationBuilder};

    #[test]
    fn second_session_reuses_stored_paths() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());

        let mut first = SimulationBuilder::new(config(false, 15), lattice())
            .cache_store(Arc::clone(&store))
            .build()
            .unwrap();
        first.initialize_blocking().unwrap();
        assert!(store.get(CACHE_KEY).unwrap().is_some());

        let mut second = SimulationBuilder::new(config(false, 15), lattice())
            .cache_store(Arc::clone(&store))
            .build()
            .unwrap();
        assert_eq!(second.start().unwrap(), SimState::Initialized);
        assert_eq!(second.resolver_stats().searches, 0);
        assert_eq!(first.get_state(), second.get_state());
    }

    #[test]
    fn old_format_is_recomputed() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let mut paths = KeyedMatrix::new();
        paths.entry("r0c0".into()).or_default().insert("r0c1".into(), vec!["r0c0".into(), "r0c1".into()]);
        store
            .put(CACHE_KEY, &PersistedPathCache::new("0.9", 0, paths).encode().unwrap())
            .unwrap();

        let mut sim = SimulationBuilder::new(config(false, 15), lattice())
            .cache_store(Arc::clone(&store))
            .build()
            .unwrap();
        assert_eq!(sim.start().unwrap(), SimState::PathsResolving);
        assert!(sim.cache().matrix().is_empty());
        sim.initialize_blocking().unwrap();

        let rewritten = PersistedPathCache::decode(&store.get(CACHE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(rewritten.version, "1.0");
    }

    #[test]
    fn clear_cache_drops_record_and_matrix() {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let mut sim = SimulationBuilder::new(config(false, 8), lattice())
            .cache_store(Arc::clone(&store))
            .build()
            .unwrap();
        sim.initialize_blocking().unwrap();
        assert!(!sim.cache().matrix().is_empty());

        sim.clear_cache().unwrap();
        assert!(sim.cache().matrix().is_empty());
        assert_eq!(store.get(CACHE_KEY).unwrap(), None);
        // Walkers keep their assigned paths.
        assert!(sim.step().is_some());
    }

    #[test]
    fn sled_store_from_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(false, 5);
        cfg.cache.store_path = Some(dir.path().join("paths"));

        {
            let mut sim = SimulationBuilder::new(cfg.clone(), lattice()).build().unwrap();
            assert!(sim.cache().has_store());
            sim.initialize_blocking().unwrap();
        }
        let mut sim = SimulationBuilder::new(cfg, lattice()).build().unwrap();
        assert_eq!(sim.start().unwrap(), SimState::Initialized);
    }
}

// ── Stepping & output ─────────────────────────────────────────────────────────

#[cfg(test)]
mod stepping {
    use approx::assert_relative_eq;

    use ws_core::Tick;
    use ws_mobility::StepReport;
    use ws_spatial::{SpatialError, WalkNetwork};

    use super::helpers::{config, lattice, LINE_JSON};
    use crate::{SimError, SimObserver, SimSnapshot, SimulationBuilder};

    #[test]
    fn line_walkers_cross_one_edge_per_tick() {
        let net = WalkNetwork::from_json(LINE_JSON).unwrap();
        let mut cfg = config(false, 3);
        cfg.sim.min_speed_mps = 200.0;
        cfg.sim.max_speed_mps = 201.0;
        let mut sim = SimulationBuilder::new(cfg, net).build().unwrap();
        sim.initialize_blocking().unwrap();

        for _ in 0..20 {
            let report = sim.step().unwrap();
            assert_eq!(report.moving, 0);
            for w in sim.walkers() {
                assert_eq!(w.progress, 0.0);
                assert!(w.path_index < w.path.len());
                assert_eq!(w.path[w.path_index], w.current_node);
            }
            for a in sim.get_state().agents {
                assert_relative_eq!(a.lat, 0.0);
                assert!([0.0, 0.001, 0.002].iter().any(|&x| (a.lng - x).abs() < 1e-12));
            }
        }
    }

    #[test]
    fn resolve_keys_by_string() {
        let net = WalkNetwork::from_json(LINE_JSON).unwrap();
        let mut sim = SimulationBuilder::new(config(false, 0), net).build().unwrap();
        assert_eq!(sim.resolve_keys("A", "C").unwrap(), vec!["A", "B", "C"]);
        assert_eq!(sim.resolve_keys("B", "B").unwrap(), vec!["B"]);
        assert!(matches!(
            sim.resolve_keys("A", "Z"),
            Err(SimError::Spatial(SpatialError::UnknownNode(_)))
        ));
        sim.resolve_keys("A", "C").unwrap();
        assert_eq!(sim.resolver_stats().searches, 1);
        assert_eq!(sim.resolver_stats().cache_hits, 1);
    }

    #[test]
    fn snapshot_shape() {
        let mut sim = SimulationBuilder::new(config(false, 3), lattice()).build().unwrap();
        sim.initialize_blocking().unwrap();
        sim.step();

        let snap = sim.get_state();
        assert_eq!(snap.tick, 1);
        assert_eq!(snap.timestamp, 1_000);
        let ids: Vec<_> = snap.agents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["agent-0", "agent-1", "agent-2"]);

        let json = serde_json::to_value(&snap).unwrap();
        assert!(json["agents"][0]["currentNode"].is_string());
        assert!(json["agents"][0]["destinationNode"].is_string());
    }

    #[derive(Default)]
    struct Recorder {
        ticks:     Vec<u64>,
        snapshots: Vec<u64>,
        ended:     Option<Tick>,
    }

    impl SimObserver for Recorder {
        fn on_tick_end(&mut self, tick: Tick, _report: &StepReport) {
            self.ticks.push(tick.0);
        }
        fn on_snapshot(&mut self, snapshot: &SimSnapshot) {
            self.snapshots.push(snapshot.tick);
        }
        fn on_sim_end(&mut self, final_tick: Tick) {
            self.ended = Some(final_tick);
        }
    }

    #[test]
    fn run_drives_observer() {
        let mut cfg = config(false, 4);
        cfg.sim.total_ticks = 10;
        cfg.sim.output_interval_ticks = 5;
        let mut sim = SimulationBuilder::new(cfg, lattice()).build().unwrap();

        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert_eq!(rec.ticks, (1..=10).collect::<Vec<_>>());
        assert_eq!(rec.snapshots, vec![0, 5, 10]);
        assert_eq!(rec.ended, Some(Tick(10)));
    }

    #[test]
    fn agent_count_override() {
        let sim = SimulationBuilder::new(config(false, 50), lattice()).agent_count(2).build().unwrap();
        assert_eq!(sim.config().sim.agent_count, 2);
    }
}
