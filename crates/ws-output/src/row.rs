//! Plain data rows written by [`OutputWriter`][crate::OutputWriter]s.

/// One walker's position in one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPositionRow {
    pub tick:             u64,
    /// `"agent-<n>"`.
    pub agent_id:         String,
    pub lat:              f64,
    pub lng:              f64,
    /// Node keys, as in the network file.
    pub current_node:     String,
    pub destination_node: String,
}

/// What happened to the population during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummaryRow {
    pub tick:         u64,
    pub unix_time_ms: i64,
    pub moving:       u64,
    pub arrivals:     u64,
    pub replanned:    u64,
}
