//! `SimOutputObserver<W>` — bridges `SimObserver` to an `OutputWriter`.

use ws_core::{SimClock, SimConfig, Tick};
use ws_mobility::StepReport;
use ws_sim::{SimObserver, SimSnapshot};

use crate::row::{AgentPositionRow, TickSummaryRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that records snapshots and tick summaries through any
/// [`OutputWriter`].
///
/// `SimObserver` methods return nothing, so the first write error is kept
/// and later ones dropped.  Check [`take_error`][Self::take_error] after
/// `sim.run()` returns.
pub struct SimOutputObserver<W: OutputWriter> {
    writer:     W,
    clock:      SimClock,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    /// `config` supplies the clock used to stamp tick summaries.
    pub fn new(writer: W, config: &SimConfig) -> Self {
        Self {
            writer,
            clock:      config.make_clock(),
            last_error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_tick_end(&mut self, tick: Tick, report: &StepReport) {
        let row = TickSummaryRow {
            tick:         tick.0,
            unix_time_ms: self.clock.unix_ms_at(tick),
            moving:       report.moving as u64,
            arrivals:     report.arrivals as u64,
            replanned:    report.replanned as u64,
        };
        let result = self.writer.write_tick_summary(&row);
        self.store_err(result);
    }

    fn on_snapshot(&mut self, snapshot: &SimSnapshot) {
        if snapshot.agents.is_empty() {
            return;
        }
        let rows: Vec<AgentPositionRow> = snapshot
            .agents
            .iter()
            .map(|a| AgentPositionRow {
                tick:             snapshot.tick,
                agent_id:         a.id.clone(),
                lat:              a.lat,
                lng:              a.lng,
                current_node:     a.current_node.clone(),
                destination_node: a.destination_node.clone(),
            })
            .collect();
        let result = self.writer.write_positions(&rows);
        self.store_err(result);
    }

    fn on_sim_end(&mut self, _final_tick: Tick) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
