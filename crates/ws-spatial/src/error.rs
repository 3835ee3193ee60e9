//! Spatial-subsystem error type.

use thiserror::Error;

use ws_core::NodeId;

/// Errors produced by `ws-spatial`.
///
/// `MalformedGraph`, `DuplicateNode`, `Parse` and `Io` are load-time errors
/// and abort construction.  `UnknownNode` is raised by key lookups.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("malformed graph: edge {edge:?} references unknown node {node:?}")]
    MalformedGraph { edge: String, node: String },

    #[error("malformed graph: node key {0:?} appears more than once")]
    DuplicateNode(String),

    #[error("unknown node {0:?}")]
    UnknownNode(String),

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("graph parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
