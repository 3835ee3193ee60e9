//! Application configuration, loaded from TOML.
//!
//! ```toml
//! precompute = "needed_pairs"     # or "all_pairs"
//!
//! [sim]
//! agent_count        = 200
//! tick_duration_secs = 1.0
//! seed               = 42
//!
//! [cache]
//! store_path   = "walksim-cache"
//! max_age_secs = 86400
//!
//! [offload]
//! enabled    = true
//! timeout_ms = 30000
//! chunk_size = 10
//! ```
//!
//! Every key is optional; an empty file yields [`WalkSimConfig::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use ws_core::SimConfig;
use ws_paths::{CacheConfig, OffloadConfig, PrecomputeStrategy};

use crate::{SimError, SimResult};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkSimConfig {
    pub precompute: PrecomputeStrategy,
    pub sim:        SimConfig,
    pub cache:      CacheConfig,
    pub offload:    OffloadConfig,
}

impl WalkSimConfig {
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        let config: WalkSimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> SimResult<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.sim.validate()?;
        if self.offload.chunk_size == 0 {
            return Err(SimError::Config("offload.chunk_size must be at least 1".into()));
        }
        if self.cache.format_version.is_empty() {
            return Err(SimError::Config("cache.format_version must not be empty".into()));
        }
        Ok(())
    }
}
