//! `ws-sim` — the walksim simulation driver.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized ──start()──▶ BasicAgentsReady ──▶ PathsResolving ──poll()…──▶ Initialized
//!                                   ▲                                             │
//!                                   └──────────── Resetting ◀──reset(count)───────┘
//! ```
//!
//! `start` seeds walkers with placeholder paths, merges any valid stored
//! path cache, and hands the missing `(current, destination)` pairs to the
//! worker thread (or to a synchronous [`PathComputation`][ws_paths::PathComputation]
//! when offloading is off or unavailable).  Each `poll` drains worker
//! messages or runs one synchronous chunk.  Once the paths arrive they are
//! assigned to the walkers and the state flips to `Initialized`; from then on
//! `step` advances every walker one tick.
//!
//! # Generations
//!
//! Every initialization has a generation number, echoed by the worker.
//! `reset` and a worker timeout bump it, so late results from an abandoned
//! request are recognised and dropped.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                            |
//! |------------|---------------------------------------------------|
//! | `parallel` | Batch path computation on Rayon (via ws-paths).   |

pub mod builder;
pub mod config;
pub mod error;
pub mod observer;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::SimulationBuilder;
pub use config::WalkSimConfig;
pub use error::{SimError, SimResult};
pub use observer::{AgentPosition, NoopObserver, SimObserver, SimSnapshot};
pub use sim::{SimState, Simulation};
