//! `ws-spatial` — walk network, graph loading, and breadth-first routing.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`network`] | `WalkNetwork` (CSR + R-tree), `WalkNetworkBuilder`          |
//! | [`loader`]  | JSON loading (Graphology and walk-export layouts), `to_json` |
//! | [`router`]  | `Router` trait, `SearchTree`, `BfsRouter`                   |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                          |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `ws-core` types.        |

pub mod error;
pub mod loader;
pub mod network;
pub mod router;


pub use error::{SpatialError, SpatialResult};
pub use loader::{load_from_path, load_from_reader, load_from_str};
pub use network::{WalkNetwork, WalkNetworkBuilder};
pub use router::{BfsRouter, Router, SearchTree};
