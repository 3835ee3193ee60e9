//! `ws-paths` — shortest-path caching, resolution, and offloaded computation.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`matrix`]   | `NodePath`, `PathMatrix` (source → target → path), keyed export |
//! | [`pairs`]    | `PairCache` — ad hoc single-pair results                        |
//! | [`persist`]  | `PersistedPathCache`, `CacheStore`, sled / in-memory stores     |
//! | [`cache`]    | `PathCache` — the three tiers behind one handle, `CacheConfig`  |
//! | [`resolver`] | `PathResolver<R>` — cached lookup with BFS fallback             |
//! | [`compute`]  | `PathJob`, `PathComputation` — chunked batch computation        |
//! | [`worker`]   | `PathWorker` — background thread speaking the request protocol  |
//! | [`error`]    | `PathsError`, `PathsResult<T>`                                  |
//!
//! # Lookup order
//!
//! ```text
//! resolve(s, t):
//!   s == t            → [s]                 (no search)
//!   matrix[s][t]      → hit
//!   pairs[(s, t)]     → hit
//!   BFS from s        → write pairs + matrix, return
//!   unreachable       → [s]                 (agent stands still)
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Runs each computation chunk's searches on Rayon.        |

pub mod cache;
pub mod compute;
pub mod error;
pub mod matrix;
pub mod pairs;
pub mod persist;
pub mod resolver;
pub mod worker;


pub use cache::{CacheConfig, LoadOutcome, PathCache};
pub use compute::{ComputeStatus, PathComputation, PathJob, PrecomputeStrategy, Targets};
pub use error::{PathsError, PathsResult};
pub use matrix::{KeyedMatrix, NodePath, PathMatrix};
pub use pairs::PairCache;
pub use persist::{
    CacheStore, MemoryCacheStore, PersistedPathCache, Rejection, SledCacheStore, CACHE_FORMAT_VERSION,
    CACHE_KEY,
};
pub use resolver::{PathResolver, ResolverStats};
pub use worker::{Generation, OffloadConfig, PathWorker, WorkerRequest, WorkerResponse};
