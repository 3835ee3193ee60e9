//! CSV output backend.

use std::fs::{self, File};
use std::path::Path;

use csv::Writer;
use tracing::debug;

use crate::writer::OutputWriter;
use crate::{AgentPositionRow, OutputResult, TickSummaryRow};

pub const POSITIONS_FILE: &str = "agent_positions.csv";
pub const SUMMARIES_FILE: &str = "tick_summaries.csv";

/// Writes `agent_positions.csv` and `tick_summaries.csv` into one directory.
pub struct CsvWriter {
    positions: Writer<File>,
    summaries: Writer<File>,
    finished:  bool,
}

impl CsvWriter {
    /// Create `dir` if needed, truncate both files, and write the headers.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        fs::create_dir_all(dir)?;

        let mut positions = Writer::from_path(dir.join(POSITIONS_FILE))?;
        positions.write_record(["tick", "agent_id", "lat", "lng", "current_node", "destination_node"])?;

        let mut summaries = Writer::from_path(dir.join(SUMMARIES_FILE))?;
        summaries.write_record(["tick", "unix_time_ms", "moving", "arrivals", "replanned"])?;

        debug!(dir = %dir.display(), "csv output opened");
        Ok(Self {
            positions,
            summaries,
            finished: false,
        })
    }
}

impl OutputWriter for CsvWriter {
    fn write_positions(&mut self, rows: &[AgentPositionRow]) -> OutputResult<()> {
        for row in rows {
            self.positions.write_record(&[
                row.tick.to_string(),
                row.agent_id.clone(),
                row.lat.to_string(),
                row.lng.to_string(),
                row.current_node.clone(),
                row.destination_node.clone(),
            ])?;
        }
        Ok(())
    }

    fn write_tick_summary(&mut self, row: &TickSummaryRow) -> OutputResult<()> {
        self.summaries.write_record(&[
            row.tick.to_string(),
            row.unix_time_ms.to_string(),
            row.moving.to_string(),
            row.arrivals.to_string(),
            row.replanned.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.positions.flush()?;
        self.summaries.flush()?;
        Ok(())
    }
}
