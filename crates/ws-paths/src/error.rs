//! Path-subsystem error type.

use thiserror::Error;

use ws_spatial::SpatialError;

/// Errors produced by `ws-paths`.
///
/// None of these reach the simulation's caller at runtime: the driver logs
/// them and falls back (stale cache → recompute, worker failure →
/// synchronous computation).
#[derive(Debug, Error)]
pub enum PathsError {
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error("cache store error: {0}")]
    Store(String),

    #[error("cache record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("cached path {from:?} -> {to:?} is not a walk in the current graph")]
    InvalidPath { from: String, to: String },

    #[error("path worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("path worker disconnected")]
    WorkerDisconnected,
}

impl From<sled::Error> for PathsError {
    fn from(e: sled::Error) -> Self {
        PathsError::Store(e.to_string())
    }
}

pub type PathsResult<T> = Result<T, PathsError>;
