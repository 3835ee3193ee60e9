//! The `OutputWriter` trait.

use crate::{AgentPositionRow, OutputResult, TickSummaryRow};

/// A sink for position and tick rows.
///
/// Errors are surfaced to the observer, which keeps the first one for
/// [`SimOutputObserver::take_error`][crate::SimOutputObserver::take_error].
pub trait OutputWriter {
    fn write_positions(&mut self, rows: &[AgentPositionRow]) -> OutputResult<()>;

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()>;

    /// Flush all underlying handles.  Idempotent.
    fn finish(&mut self) -> OutputResult<()>;
}
