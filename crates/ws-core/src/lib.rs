//! `ws-core` — foundational types for the `walksim` pedestrian simulator.
//!
//! This crate is a dependency of every other `ws-*` crate.  It has no `ws-*`
//! dependencies and minimal external ones (only `rand` and `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                              |
//! |-------------|-------------------------------------------------------|
//! | [`ids`]     | `AgentId`, `NodeId`                                   |
//! | [`geo`]     | `GeoPoint`, haversine distance, interpolation         |
//! | [`time`]    | `Tick`, `SimClock`, `SimConfig`                       |
//! | [`rng`]     | `AgentRng` (per-agent), `SimRng` (global)             |
//! | [`error`]   | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use ids::{AgentId, NodeId};
pub use rng::{AgentRng, SimRng};
pub use time::{SimClock, SimConfig, Tick};
