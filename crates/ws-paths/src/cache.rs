//! `PathCache` — the matrix, the pair tier, and the durable store behind one
//! handle.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ws_core::NodeId;
use ws_spatial::WalkNetwork;

use crate::matrix::{NodePath, PathMatrix};
use crate::pairs::PairCache;
use crate::persist::{CacheStore, PersistedPathCache, Rejection, CACHE_FORMAT_VERSION, CACHE_KEY};
use crate::PathsResult;

// ── CacheConfig ───────────────────────────────────────────────────────────────

/// Persistence settings.  Loaded from the `[cache]` table of the TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Version string written to and expected from stored records.
    pub format_version: String,

    /// Records at least this old are ignored.  Default: 24 h.
    pub max_age_secs: u64,

    /// Sled database directory.  `None` keeps the cache in memory only.
    pub store_path: Option<PathBuf>,

    /// Write the matrix to the store once initialization finishes.
    pub persist_after_init: bool,
}

impl CacheConfig {
    pub fn max_age_ms(&self) -> i64 {
        i64::try_from(self.max_age_secs.saturating_mul(1_000)).unwrap_or(i64::MAX)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            format_version:     CACHE_FORMAT_VERSION.to_owned(),
            max_age_secs:       24 * 60 * 60,
            store_path:         None,
            persist_after_init: true,
        }
    }
}

// ── LoadOutcome ───────────────────────────────────────────────────────────────

/// Result of [`PathCache::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A valid record was found; this many entries were added to the matrix.
    Loaded(usize),
    /// No store is attached, or it holds no record.
    Absent,
    /// A record exists but was ignored.
    Rejected(Rejection),
}

// ── PathCache ─────────────────────────────────────────────────────────────────

pub struct PathCache {
    matrix: PathMatrix,
    pairs:  PairCache,
    store:  Option<Arc<dyn CacheStore>>,
    config: CacheConfig,
}

impl PathCache {
    /// A cache with no durable store: `load` finds nothing, `persist` is a no-op.
    pub fn new(config: CacheConfig) -> Self {
        Self { matrix: PathMatrix::new(), pairs: PairCache::new(), store: None, config }
    }

    pub fn with_store(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store), ..Self::new(config) }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn matrix(&self) -> &PathMatrix {
        &self.matrix
    }

    pub fn pairs(&self) -> &PairCache {
        &self.pairs
    }

    // ── Lookup / record ───────────────────────────────────────────────────

    /// Matrix first, then the pair tier.
    pub fn lookup(&self, source: NodeId, target: NodeId) -> Option<NodePath> {
        self.matrix
            .get(source, target)
            .or_else(|| self.pairs.get(source, target))
            .cloned()
    }

    /// Store a freshly computed path in both in-memory tiers.
    pub fn record(&mut self, source: NodeId, target: NodeId, path: NodePath) {
        self.pairs.insert(source, target, path.clone());
        self.matrix.insert(source, target, path);
    }

    /// Fold a batch-computed matrix in.  Returns the number of new entries.
    pub fn merge_matrix(&mut self, computed: PathMatrix) -> usize {
        self.matrix.merge(computed)
    }

    // ── Persistence ───────────────────────────────────────────────────────

    /// [`load_at`](Self::load_at) with the current wall-clock time.
    pub fn load(&mut self, network: &WalkNetwork) -> LoadOutcome {
        self.load_at(network, chrono::Utc::now().timestamp_millis())
    }

    /// Merge the stored record into the matrix if it is usable at `now_ms`.
    ///
    /// Store failures and unusable records are logged and reported as
    /// [`LoadOutcome::Absent`] / [`LoadOutcome::Rejected`]; they never fail
    /// the caller.
    pub fn load_at(&mut self, network: &WalkNetwork, now_ms: i64) -> LoadOutcome {
        let Some(store) = &self.store else {
            return LoadOutcome::Absent;
        };
        let bytes = match store.get(CACHE_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return LoadOutcome::Absent,
            Err(e) => {
                warn!(error = %e, "path cache store unreadable; recomputing");
                return LoadOutcome::Absent;
            }
        };

        let rejected = |reason: Rejection| {
            info!(%reason, "ignoring stored path cache");
            LoadOutcome::Rejected(reason)
        };

        let record = match PersistedPathCache::decode(&bytes) {
            Ok(r) => r,
            Err(reason) => return rejected(reason),
        };
        if let Err(reason) = record.check(&self.config.format_version, now_ms, self.config.max_age_ms()) {
            return rejected(reason);
        }
        match PathMatrix::from_keyed(&record.paths, network) {
            Ok(stored) => {
                let added = self.matrix.merge(stored);
                debug!(entries = added, "loaded stored path cache");
                LoadOutcome::Loaded(added)
            }
            Err(e) => rejected(Rejection::Corrupt(e.to_string())),
        }
    }

    /// [`persist_at`](Self::persist_at) with the current wall-clock time.
    pub fn persist(&self, network: &WalkNetwork) -> PathsResult<usize> {
        self.persist_at(network, chrono::Utc::now().timestamp_millis())
    }

    /// Write the whole matrix as one record stamped `now_ms`.
    ///
    /// Returns the number of entries written (0 without a store).
    pub fn persist_at(&self, network: &WalkNetwork, now_ms: i64) -> PathsResult<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let record = PersistedPathCache::new(
            self.config.format_version.clone(),
            now_ms,
            self.matrix.to_keyed(network),
        );
        store.put(CACHE_KEY, &record.encode()?)?;
        debug!(entries = self.matrix.len(), "persisted path cache");
        Ok(self.matrix.len())
    }

    // ── Clearing ──────────────────────────────────────────────────────────

    /// Drop the matrix and the stored record.  The pair tier is kept.
    pub fn clear(&mut self) -> PathsResult<()> {
        self.matrix.clear();
        if let Some(store) = &self.store {
            store.remove(CACHE_KEY)?;
        }
        Ok(())
    }

    /// Drop both in-memory tiers, leaving the stored record alone.
    pub fn clear_memory(&mut self) {
        self.matrix.clear();
        self.pairs.clear();
    }

    pub fn clear_pairs(&mut self) {
        self.pairs.clear();
    }
}

impl std::fmt::Debug for PathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCache")
            .field("matrix_entries", &self.matrix.len())
            .field("pair_entries", &self.pairs.len())
            .field("has_store", &self.store.is_some())
            .finish()
    }
}
