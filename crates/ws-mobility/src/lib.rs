//! `ws-mobility` — walker state and the per-tick stepper.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                     |
//! |------------|--------------------------------------------------------------|
//! | [`state`]  | `Walker`, `Appearance`                                       |
//! | [`store`]  | `WalkerStore` — walkers + per-walker RNG streams, seeding    |
//! | [`engine`] | `MobilityEngine<R>` — path assignment and stepping           |
//! | [`error`]  | `MobilityError`, `MobilityResult<T>`                         |
//!
//! # Movement model (edge interpolation)
//!
//! Each walker follows its path one edge at a time:
//!
//! 1. An exhausted path (`path_index == len - 1`) triggers a replan: a new
//!    random destination other than the current node, resolved through the
//!    path cache.  The walker does not move on a replan tick.
//! 2. Otherwise `progress += speed · dt / edge_length`.  A zero-length edge
//!    completes immediately.
//! 3. On `progress >= 1` the walker steps onto the next node and `progress`
//!    resets to 0.  At most one node boundary is crossed per tick; any
//!    overshoot is dropped.
//!
//! The rendered position is the linear blend of the edge endpoints'
//! coordinates at `progress`.

pub mod engine;
pub mod error;
pub mod state;
pub mod store;


pub use engine::{MobilityEngine, StepReport};
pub use error::{MobilityError, MobilityResult};
pub use state::{Appearance, Walker};
pub use store::{pick_destination, WalkerStore};
