//! JSON walk-network loader.
//!
//! # Accepted layouts
//!
//! The data-preparation step exports the district's walk network in one of
//! two JSON layouts; both are accepted and detected automatically.
//!
//! **Graphology**: nodes are an array:
//!
//! ```json
//! {
//!   "attributes": {},
//!   "nodes": [ { "key": "2417", "attributes": { "lat": 59.40, "lng": 17.94 } } ],
//!   "edges": [ { "key": "2417-2418-0", "source": "2417", "target": "2418" } ]
//! }
//! ```
//!
//! **Walk export**: nodes are an object keyed by id:
//!
//! ```json
//! {
//!   "nodes": { "2417": { "id": "2417", "lat": 59.40, "lng": 17.94 } },
//!   "edges": [ { "id": "edge_2417_2418", "from": "2417", "to": "2418" } ]
//! }
//! ```
//!
//! Extra attributes (`highway`, `surface`, `walkable_areas`, …) are ignored.
//! Edge direction is ignored: the walk network is undirected.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ws_core::GeoPoint;

use crate::network::{WalkNetwork, WalkNetworkBuilder};
use crate::SpatialResult;

// ── Graphology layout ─────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct GraphologyDocument {
    nodes: Vec<GraphologyNode>,
    #[serde(default)]
    edges: Vec<GraphologyEdge>,
}

#[derive(Serialize, Deserialize)]
struct GraphologyNode {
    key: String,
    attributes: Coordinates,
}

#[derive(Serialize, Deserialize)]
struct Coordinates {
    lat: f64,
    lng: f64,
}

#[derive(Serialize, Deserialize)]
struct GraphologyEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    source: String,
    target: String,
}

// ── Walk-export layout ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WalkExportDocument {
    // BTreeMap so NodeIds are assigned in a stable (sorted-key) order.
    nodes: BTreeMap<String, Coordinates>,
    #[serde(default)]
    edges: Vec<WalkExportEdge>,
}

#[derive(Deserialize)]
struct WalkExportEdge {
    #[serde(default)]
    id: Option<String>,
    from: String,
    to: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GraphDocument {
    Graphology(GraphologyDocument),
    WalkExport(WalkExportDocument),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse a walk network from a JSON string.
///
/// # Errors
///
/// [`SpatialError::Parse`](crate::SpatialError::Parse) if the text matches
/// neither layout, [`SpatialError::MalformedGraph`](crate::SpatialError::MalformedGraph)
/// if an edge names a node that does not exist, and
/// [`SpatialError::DuplicateNode`](crate::SpatialError::DuplicateNode) if a
/// node key repeats.
pub fn load_from_str(json: &str) -> SpatialResult<WalkNetwork> {
    let doc: GraphDocument = serde_json::from_str(json)?;
    build_document(doc)
}

/// Like [`load_from_str`] but accepts any `Read` source.
pub fn load_from_reader<R: Read>(reader: R) -> SpatialResult<WalkNetwork> {
    let doc: GraphDocument = serde_json::from_reader(reader)?;
    build_document(doc)
}

/// Load a walk network from a JSON file.
pub fn load_from_path(path: &Path) -> SpatialResult<WalkNetwork> {
    let file = std::fs::File::open(path)?;
    let network = load_from_reader(std::io::BufReader::new(file))?;
    debug!(
        path = %path.display(),
        nodes = network.node_count(),
        edges = network.edge_count(),
        "loaded walk network"
    );
    Ok(network)
}

impl WalkNetwork {
    /// Shorthand for [`load_from_str`].
    pub fn from_json(json: &str) -> SpatialResult<WalkNetwork> {
        load_from_str(json)
    }

    /// Serialize in the Graphology layout.
    ///
    /// Node order and keys are preserved, so `from_json(&net.to_json())`
    /// assigns identical `NodeId`s.  Parallel input edges are emitted once.
    pub fn to_json(&self) -> String {
        let nodes = self
            .node_ids()
            .map(|id| {
                let pos = self.pos(id);
                GraphologyNode {
                    key: self.node_key(id).to_owned(),
                    attributes: Coordinates { lat: pos.lat, lng: pos.lon },
                }
            })
            .collect();

        let mut edges = Vec::new();
        for a in self.node_ids() {
            for &b in self.neighbors(a) {
                if a < b {
                    edges.push(GraphologyEdge {
                        key: None,
                        source: self.node_key(a).to_owned(),
                        target: self.node_key(b).to_owned(),
                    });
                }
            }
        }

        let doc = GraphologyDocument { nodes, edges };
        // Plain strings and finite floats: serialization cannot fail.
        serde_json::to_string(&doc).unwrap_or_default()
    }
}

// ── Internals ─────────────────────────────────────────────────────────────────

fn build_document(doc: GraphDocument) -> SpatialResult<WalkNetwork> {
    match doc {
        GraphDocument::Graphology(g) => {
            let mut b = WalkNetworkBuilder::with_capacity(g.nodes.len(), g.edges.len());
            for n in g.nodes {
                b.add_node(n.key, GeoPoint::new(n.attributes.lat, n.attributes.lng))?;
            }
            for (i, e) in g.edges.iter().enumerate() {
                let key = e.key.clone().unwrap_or_else(|| format!("#{i}"));
                b.add_edge_by_key(&key, &e.source, &e.target)?;
            }
            Ok(b.build())
        }
        GraphDocument::WalkExport(w) => {
            let mut b = WalkNetworkBuilder::with_capacity(w.nodes.len(), w.edges.len());
            for (key, c) in w.nodes {
                b.add_node(key, GeoPoint::new(c.lat, c.lng))?;
            }
            for (i, e) in w.edges.iter().enumerate() {
                let key = e.id.clone().unwrap_or_else(|| format!("#{i}"));
                b.add_edge_by_key(&key, &e.from, &e.to)?;
            }
            Ok(b.build())
        }
    }
}
