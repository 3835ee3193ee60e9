//! Durable path-cache records and the stores that hold them.
//!
//! # Record format
//!
//! One JSON document under a fixed key:
//!
//! ```json
//! { "version": "1.0", "timestamp": 1718000000000,
//!   "paths": { "2417": { "2420": ["2417", "2418", "2420"] } } }
//! ```
//!
//! `timestamp` is Unix milliseconds at write time.  A record is only used if
//! its version matches and it is younger than the configured maximum age;
//! otherwise it is treated as absent.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::KeyedMatrix;
use crate::{PathsError, PathsResult};

/// Current record format version.
pub const CACHE_FORMAT_VERSION: &str = "1.0";

/// Key under which the single path-cache record is stored.
pub const CACHE_KEY: &str = "walksim/path-cache";

// ── Record ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPathCache {
    pub version:   String,
    /// Unix milliseconds when the record was written.
    pub timestamp: i64,
    pub paths:     KeyedMatrix,
}

/// Why a stored record was not used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("format version {found:?} does not match {expected:?}")]
    VersionMismatch { found: String, expected: String },

    #[error("record is {age_ms} ms old (limit {max_age_ms} ms)")]
    Expired { age_ms: i64, max_age_ms: i64 },

    #[error("record unreadable: {0}")]
    Corrupt(String),
}

impl PersistedPathCache {
    pub fn new(version: impl Into<String>, timestamp: i64, paths: KeyedMatrix) -> Self {
        Self { version: version.into(), timestamp, paths }
    }

    pub fn encode(&self) -> PathsResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Rejection> {
        serde_json::from_slice(bytes).map_err(|e| Rejection::Corrupt(e.to_string()))
    }

    /// Accept the record only if `version` matches and its age at `now_ms`
    /// is strictly below `max_age_ms`.
    pub fn check(&self, version: &str, now_ms: i64, max_age_ms: i64) -> Result<(), Rejection> {
        if self.version != version {
            return Err(Rejection::VersionMismatch {
                found:    self.version.clone(),
                expected: version.to_owned(),
            });
        }
        let age_ms = now_ms.saturating_sub(self.timestamp);
        if age_ms >= max_age_ms {
            return Err(Rejection::Expired { age_ms, max_age_ms });
        }
        Ok(())
    }
}

// ── Stores ────────────────────────────────────────────────────────────────────

/// Durable key-value storage for cache records.
///
/// Implementations must be thread-safe and keep data across restarts (the
/// in-memory store excepted).
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> PathsResult<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> PathsResult<()>;

    /// Remove `key`.  Removing a missing key is not an error.
    fn remove(&self, key: &str) -> PathsResult<()>;
}

/// Sled-backed store: an embedded database directory on disk.
pub struct SledCacheStore {
    db: sled::Db,
}

impl SledCacheStore {
    pub fn open<P: AsRef<Path>>(path: P) -> PathsResult<Self> {
        Ok(Self { db: sled::open(path)? })
    }

    /// A store whose files are deleted when it is dropped.
    pub fn temporary() -> PathsResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }
}

impl CacheStore for SledCacheStore {
    fn get(&self, key: &str) -> PathsResult<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, value: &[u8]) -> PathsResult<()> {
        self.db.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> PathsResult<()> {
        self.db.remove(key)?;
        self.db.flush()?;
        Ok(())
    }
}

/// Process-local store, used in tests and when no store path is configured
/// but the caller still wants persist/load to round-trip within a session.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PathsResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| PathsError::Store("memory store lock poisoned".into()))
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> PathsResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> PathsResult<()> {
        self.lock()?.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> PathsResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
