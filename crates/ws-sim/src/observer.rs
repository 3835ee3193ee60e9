//! Per-tick output types and the observer trait.

use serde::Serialize;

use ws_core::Tick;
use ws_mobility::StepReport;

/// One walker's rendered position.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPosition {
    /// `"agent-<n>"`.
    pub id:               String,
    pub lat:              f64,
    pub lng:              f64,
    pub current_node:     String,
    pub destination_node: String,
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimSnapshot {
    pub tick:      u64,
    /// In agent order.
    pub agents:    Vec<AgentPosition>,
    /// Simulated Unix time of `tick`, milliseconds.
    pub timestamp: i64,
}

/// Callbacks invoked by [`Simulation::run`][crate::Simulation::run].
///
/// All methods default to no-ops.
pub trait SimObserver {
    /// After each step.  `tick` counts completed steps (the first step ends
    /// tick 1).
    fn on_tick_end(&mut self, _tick: Tick, _report: &StepReport) {}

    /// Every `sim.output_interval_ticks` ticks, and once for tick 0.
    fn on_snapshot(&mut self, _snapshot: &SimSnapshot) {}

    /// Once after the final tick.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

pub struct NoopObserver;

impl SimObserver for NoopObserver {}
