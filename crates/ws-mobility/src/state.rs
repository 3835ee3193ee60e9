//! Per-walker movement state.

use std::fmt;
use std::sync::Arc;

use ws_core::{AgentId, GeoPoint, NodeId};
use ws_paths::NodePath;
use ws_spatial::WalkNetwork;

// ── Appearance ────────────────────────────────────────────────────────────────

/// Marker colour, drawn once per walker from a fixed palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Appearance {
    Crimson,
    Amber,
    Teal,
    Indigo,
    Olive,
    Slate,
}

impl Appearance {
    pub const PALETTE: [Appearance; 6] = [
        Appearance::Crimson,
        Appearance::Amber,
        Appearance::Teal,
        Appearance::Indigo,
        Appearance::Olive,
        Appearance::Slate,
    ];

    /// `#rrggbb` colour for renderers.
    pub fn hex(self) -> &'static str {
        match self {
            Appearance::Crimson => "#d7263d",
            Appearance::Amber   => "#f4a259",
            Appearance::Teal    => "#1b998b",
            Appearance::Indigo  => "#3f51b5",
            Appearance::Olive   => "#8a9a5b",
            Appearance::Slate   => "#5c6b73",
        }
    }
}

impl fmt::Display for Appearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hex())
    }
}

// ── Walker ────────────────────────────────────────────────────────────────────

/// One pedestrian.
///
/// # Invariants
///
/// - `path` is non-empty and `path[path_index] == current_node`.
/// - `0 <= path_index <= path.len() - 1`.
/// - `0.0 <= progress < 1.0`.
#[derive(Clone, Debug)]
pub struct Walker {
    pub id:               AgentId,
    pub current_node:     NodeId,
    pub destination_node: NodeId,
    pub path:             NodePath,
    pub path_index:       usize,
    /// Fraction of the edge `path[path_index] → path[path_index + 1]` covered.
    pub progress:         f64,
    /// Walking speed in m/s, fixed at creation.
    pub speed_mps:        f64,
    pub appearance:       Appearance,
}

impl Walker {
    /// A walker standing at `start` with `destination` chosen but no path
    /// yet: the path is just `[start]`.
    pub fn placeholder(
        id:          AgentId,
        start:       NodeId,
        destination: NodeId,
        speed_mps:   f64,
        appearance:  Appearance,
    ) -> Self {
        Self {
            id,
            current_node: start,
            destination_node: destination,
            path: Arc::from(vec![start]),
            path_index: 0,
            progress: 0.0,
            speed_mps,
            appearance,
        }
    }

    /// `true` once the walker stands on the last node of its path.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.path_index + 1 >= self.path.len()
    }

    /// The edge currently being walked, if any.
    pub fn edge(&self) -> Option<(NodeId, NodeId)> {
        if self.is_exhausted() {
            return None;
        }
        Some((self.path[self.path_index], self.path[self.path_index + 1]))
    }

    /// Replace the path and restart from its first node.
    ///
    /// A path that does not start at `current_node` is replaced by
    /// `[current_node]`: the walker stands still and replans next tick.
    pub fn assign_path(&mut self, destination: NodeId, path: NodePath) {
        self.destination_node = destination;
        self.path = if path.first() == Some(&self.current_node) {
            path
        } else {
            Arc::from(vec![self.current_node])
        };
        self.path_index = 0;
        self.progress = 0.0;
    }

    /// Interpolated position along the current edge.
    pub fn position(&self, network: &WalkNetwork) -> GeoPoint {
        match self.edge() {
            Some((a, b)) => network.pos(a).lerp(network.pos(b), self.progress),
            None => network.pos(self.current_node),
        }
    }

    /// External identifier, e.g. `"agent-7"`.
    pub fn label(&self) -> String {
        self.id.label()
    }
}
