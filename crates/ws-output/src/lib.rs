//! `ws-output` — CSV recording of a walksim run.
//!
//! | File                  | One row per                          |
//! |-----------------------|--------------------------------------|
//! | `agent_positions.csv` | walker per snapshot                  |
//! | `tick_summaries.csv`  | completed tick                       |
//!
//! [`CsvWriter`] implements [`OutputWriter`] and is driven by
//! [`SimOutputObserver`], which implements `ws_sim::SimObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ws_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = SimOutputObserver::new(writer, &config.sim);
//! sim.run(&mut obs)?;
//! if let Some(e) = obs.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(test)]
mod tests;

pub use self::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SimOutputObserver;
pub use row::{AgentPositionRow, TickSummaryRow};
pub use writer::OutputWriter;
