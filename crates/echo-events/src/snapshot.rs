//! Snapshot Types
//!
//! Serialization structs for graph snapshots and per-tick series output.
//!
//! Snapshots capture the network and every agent's opinion at a point in
//! time, used for analysis, visualization, and debugging.

use serde::{Deserialize, Serialize};

use crate::AgentId;

/// Generates a snapshot ID for the given tick, e.g. `G_0001000`.
pub fn generate_snapshot_id(tick: u64) -> String {
    format!("G_{:07}", tick)
}

/// One node of the social graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: AgentId,
    pub opinion: f64,
    pub base_opinion: f64,
    pub out_degree: usize,
    pub in_degree: usize,
}

/// A directed "follows" edge: `source` follows `target`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub source: AgentId,
    pub target: AgentId,
}

/// Full graph state at a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub snapshot_id: String,
    pub tick: u64,
    pub nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    pub edges: Vec<EdgeSnapshot>,
}

impl GraphSnapshot {
    pub fn new(tick: u64) -> Self {
        Self {
            snapshot_id: generate_snapshot_id(tick),
            tick,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// One row of a per-tick vector series (opinions, screen diversity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSeries {
    pub tick: u64,
    pub values: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_id_padding() {
        assert_eq!(generate_snapshot_id(0), "G_0000000");
        assert_eq!(generate_snapshot_id(15000), "G_0015000");
    }

    #[test]
    fn test_series_values_survive_json_exactly() {
        let row = TickSeries {
            tick: 3,
            values: vec![-0.18439131639015535, 0.1 + 0.2, 1.0 / 3.0, -2.2250738585072014e-308],
        };
        let json = serde_json::to_string(&row).unwrap();
        let parsed: TickSeries = serde_json::from_str(&json).unwrap();
        for (a, b) in row.values.iter().zip(&parsed.values) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_snapshot_parses_without_edges() {
        let json = r#"{
            "snapshot_id": "G_0000010",
            "tick": 10,
            "nodes": [
                {"id": 0, "opinion": 0.1, "base_opinion": 0.2, "out_degree": 1, "in_degree": 2}
            ]
        }"#;
        let snapshot: GraphSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.tick, 10);
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.edge_count(), 0);
    }
}
