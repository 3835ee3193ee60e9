//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing `Tick` counter.  One
//! tick advances simulated time by a fixed `tick_duration_secs`, independent
//! of how often the host calls `step()`:
//!
//!   sim_time = start_unix_secs + tick * tick_duration_secs
//!
//! Pedestrian steps are sub-second to a few seconds, so the duration is an
//! `f64` rather than the integer hours used by schedule-driven simulators.

use std::fmt;

use crate::{CoreError, CoreResult};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Tick counter plus the mapping from ticks to simulated seconds.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Unix timestamp (seconds since epoch) of tick 0.
    pub start_unix_secs: i64,
    /// How many simulated seconds one tick represents.
    pub tick_duration_secs: f64,
    /// The current tick, advanced by `SimClock::advance()` each step.
    pub current_tick: Tick,
}

impl SimClock {
    pub fn new(start_unix_secs: i64, tick_duration_secs: f64) -> Self {
        Self {
            start_unix_secs,
            tick_duration_secs,
            current_tick: Tick::ZERO,
        }
    }

    /// Advance the clock by one tick.
    #[inline]
    pub fn advance(&mut self) {
        self.current_tick = self.current_tick + 1;
    }

    /// Rewind to tick 0 (used when the population is reset).
    pub fn rewind(&mut self) {
        self.current_tick = Tick::ZERO;
    }

    /// Elapsed simulated seconds since tick 0.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.current_tick.0 as f64 * self.tick_duration_secs
    }

    /// Simulated Unix time in milliseconds corresponding to `current_tick`.
    pub fn current_unix_ms(&self) -> i64 {
        self.unix_ms_at(self.current_tick)
    }

    /// Simulated Unix time in milliseconds of `tick`, rounded to the nearest
    /// millisecond (3 ticks of 0.7 s is 2100 ms, not 2099).
    pub fn unix_ms_at(&self, tick: Tick) -> i64 {
        let elapsed_ms = tick.0 as f64 * self.tick_duration_secs * 1_000.0;
        self.start_unix_secs * 1_000 + elapsed_ms.round() as i64
    }

    /// Break elapsed time into (hour, minute, second) components.
    pub fn elapsed_hms(&self) -> (u64, u32, u32) {
        let total = self.elapsed_secs().max(0.0) as u64;
        let hours = total / 3_600;
        let minutes = ((total % 3_600) / 60) as u32;
        let seconds = (total % 60) as u32;
        (hours, minutes, seconds)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = self.elapsed_hms();
        write!(f, "{} (+{}:{:02}:{:02})", self.current_tick, h, m, s)
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Population and clock configuration.
///
/// Loaded from the `[sim]` table of the application's TOML file; every field
/// has a default so partial files are accepted.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Unix timestamp for tick 0.
    pub start_unix_secs: i64,

    /// Simulated seconds per tick.  Default: 1.0.
    pub tick_duration_secs: f64,

    /// Ticks run by `Simulation::run`.
    pub total_ticks: u64,

    /// Master RNG seed.  The same seed always produces identical walkers.
    pub seed: u64,

    /// Number of walkers seeded at start.
    pub agent_count: usize,

    /// Lower bound (inclusive) of the walking-speed distribution, m/s.
    pub min_speed_mps: f64,

    /// Upper bound (exclusive) of the walking-speed distribution, m/s.
    pub max_speed_mps: f64,

    /// Emit a position snapshot every N ticks.  0 disables snapshots.
    pub output_interval_ticks: u64,
}

impl SimConfig {
    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.start_unix_secs, self.tick_duration_secs)
    }

    /// Reject values the stepper cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.tick_duration_secs > 0.0) || !self.tick_duration_secs.is_finite() {
            return Err(CoreError::Config(format!(
                "tick_duration_secs must be positive, got {}",
                self.tick_duration_secs
            )));
        }
        if !(self.min_speed_mps > 0.0) || !(self.max_speed_mps > self.min_speed_mps) {
            return Err(CoreError::Config(format!(
                "speed range must satisfy 0 < min < max, got [{}, {})",
                self.min_speed_mps, self.max_speed_mps
            )));
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_unix_secs:       0,
            tick_duration_secs:    1.0,
            total_ticks:           3_600,
            seed:                  42,
            agent_count:           200,
            // Centred on the commonly cited 1.4 m/s walking pace.
            min_speed_mps:         1.1,
            max_speed_mps:         1.7,
            output_interval_ticks: 1,
        }
    }
}
