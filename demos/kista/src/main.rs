//! walksim: pedestrians wandering the walk network of central Kista.
//!
//! Loads a walk-network JSON export, seeds walkers on random nodes (or all at
//! the node nearest `--spawn-near`), resolves their paths (on the background
//! worker unless `--no-worker`), then steps the population and records
//! positions as CSV.
//!
//! ```text
//! walksim --config demos/kista/data/walksim.toml --out output/
//! RUST_LOG=ws_paths=debug walksim --agents 500 --ticks 3600
//! walksim --spawn-near 59.4032,17.9447
//! ```

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ws_core::GeoPoint;
use ws_output::{CsvWriter, SimOutputObserver};
use ws_sim::{SimulationBuilder, WalkSimConfig};

const DEFAULT_GRAPH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/kista.json");

#[derive(Parser, Debug)]
#[command(name = "walksim", version, about = "Pedestrian path simulation on a walk network")]
struct Args {
    /// Walk-network JSON (Graphology or walk-export layout).
    #[arg(long, default_value = DEFAULT_GRAPH)]
    graph: PathBuf,

    /// TOML configuration; every key is optional.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `sim.agent_count`.
    #[arg(long)]
    agents: Option<usize>,

    /// Override `sim.total_ticks`.
    #[arg(long)]
    ticks: Option<u64>,

    /// Start every walker at the node nearest this `lat,lng`.
    #[arg(long, value_name = "LAT,LNG", value_parser = parse_lat_lng)]
    spawn_near: Option<GeoPoint>,

    /// Directory for `agent_positions.csv` and `tick_summaries.csv`.
    #[arg(long, default_value = "output")]
    out: PathBuf,

    /// Compute paths on the main thread.
    #[arg(long)]
    no_worker: bool,

    /// Drop the stored path cache before starting.
    #[arg(long)]
    clear_cache: bool,
}

fn parse_lat_lng(s: &str) -> Result<GeoPoint, String> {
    let (lat, lng) = s.split_once(',').ok_or_else(|| format!("expected LAT,LNG, got `{s}`"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("latitude `{lat}`: {e}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("longitude `{lng}`: {e}"))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(format!("`{s}` is not a coordinate"));
    }
    Ok(GeoPoint::new(lat, lng))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // 1. Configuration.
    let mut config = match &args.config {
        Some(path) => WalkSimConfig::from_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => WalkSimConfig::default(),
    };
    if let Some(ticks) = args.ticks {
        config.sim.total_ticks = ticks;
    }
    if args.no_worker {
        config.offload.enabled = false;
    }

    // 2. Walk network.
    let network = ws_spatial::load_from_path(&args.graph)
        .with_context(|| format!("loading walk network {}", args.graph.display()))?;
    info!(
        graph = %args.graph.display(),
        nodes = network.node_count(),
        edges = network.edge_count(),
        "walk network loaded"
    );

    // 3. Simulation.
    let mut builder = SimulationBuilder::new(config, network).on_progress(|p| info!(percent = p, "resolving paths"));
    if let Some(agents) = args.agents {
        builder = builder.agent_count(agents);
    }
    if let Some(point) = args.spawn_near {
        builder = builder.spawn_near(point);
    }
    let mut sim = builder.build()?;

    if args.clear_cache {
        sim.clear_cache()?;
    }

    let t0 = Instant::now();
    sim.initialize_blocking()?;
    let stats = sim.resolver_stats();
    info!(
        elapsed_ms = t0.elapsed().as_millis() as u64,
        walkers = sim.walkers().len(),
        cached_paths = sim.cache().matrix().len(),
        searches = stats.searches,
        "initialized"
    );

    // 4. Run, recording CSV.
    let writer = CsvWriter::new(&args.out)
        .with_context(|| format!("opening output directory {}", args.out.display()))?;
    let mut observer = SimOutputObserver::new(writer, &sim.config().sim);

    let t1 = Instant::now();
    sim.run(&mut observer)?;
    if let Some(e) = observer.take_error() {
        warn!(error = %e, "output incomplete");
    }

    let stats = sim.resolver_stats();
    let (h, m, s) = sim.clock().elapsed_hms();
    info!(
        ticks = sim.clock().current_tick.0,
        simulated = %format!("{h:02}:{m:02}:{s:02}"),
        elapsed_ms = t1.elapsed().as_millis() as u64,
        requests = stats.requests,
        cache_hits = stats.cache_hits,
        searches = stats.searches,
        unreachable = stats.unreachable,
        out = %args.out.display(),
        "run complete"
    );

    sim.cleanup();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_lat_lng;

    #[test]
    fn lat_lng_argument() {
        let p = parse_lat_lng("59.4032, 17.9447").unwrap();
        assert_eq!((p.lat, p.lon), (59.4032, 17.9447));
        assert!(parse_lat_lng("59.4032").is_err());
        assert!(parse_lat_lng("north,17.9").is_err());
        assert!(parse_lat_lng("95.0,17.9").is_err());
    }
}
