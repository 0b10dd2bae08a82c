// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Analysis & Graph Export
// ─────────────────────────────────────────────────────────────────────
//! Read-only aggregate views of a lattice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use lattice_types::{unix_time_s, NodeKind};

use crate::lattice::Lattice;
use crate::stats;

const MOST_STABLE: usize = 3;
const MOST_CENTRAL: usize = 5;
const RECENT_PATTERNS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTotals {
    pub total: usize,
    pub active: usize,
    pub active_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTotals {
    /// Every stored edge, dangling ones included.
    pub total: usize,
    pub average_per_node: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindActivity {
    pub count: usize,
    pub active: usize,
    pub active_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilitySummary {
    /// Mean score over nodes with a full stability window; 0.0 if none.
    pub average: f64,
    /// Highest scores first, ties in name order.
    pub most_stable: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationStats {
    pub total_propagations: usize,
    pub total_steps: usize,
    pub avg_duration_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergenceStats {
    pub total_patterns: usize,
    pub pattern_types: BTreeMap<String, usize>,
}

/// Snapshot statistics returned by [`Lattice::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeAnalysis {
    pub timestamp: f64,
    pub nodes: NodeTotals,
    pub connections: ConnectionTotals,
    /// Only kinds that have at least one node.
    pub kind_distribution: BTreeMap<NodeKind, KindActivity>,
    pub stability: StabilitySummary,
    /// Highest out-degree first, ties in name order.
    pub most_central: Vec<(String, usize)>,
    pub propagation: PropagationStats,
    pub emergence: EmergenceStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub activation: f64,
    pub active: bool,
    pub threshold: f64,
    pub label: Option<String>,
    pub connection_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPattern {
    #[serde(rename = "type")]
    pub kind: String,
    pub nodes: Vec<String>,
    pub timestamp: f64,
}

/// Node/link export for visualisation front-ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    /// Edges whose target still exists.
    pub links: Vec<GraphLink>,
    /// The most recent emergent patterns, oldest first.
    pub emergent_patterns: Vec<GraphPattern>,
    pub timestamp: f64,
}

fn percentage(part: usize, whole: usize) -> f64 {
    part as f64 / whole.max(1) as f64 * 100.0
}

impl Lattice {
    /// Aggregate structure and dynamics statistics.
    pub fn analyze(&self) -> LatticeAnalysis {
        let total = self.nodes.len();
        let active = self.active_count();
        let edges: usize = self.nodes.values().map(|n| n.out_degree()).sum();

        let mut kind_distribution: BTreeMap<NodeKind, KindActivity> = BTreeMap::new();
        for node in self.nodes.values() {
            let entry = kind_distribution.entry(node.kind).or_insert(KindActivity {
                count: 0,
                active: 0,
                active_percentage: 0.0,
            });
            entry.count += 1;
            if node.is_active() {
                entry.active += 1;
            }
        }
        for entry in kind_distribution.values_mut() {
            entry.active_percentage = percentage(entry.active, entry.count);
        }

        let window = self.config.stability_window;
        let mut scores: Vec<(String, f64)> = self
            .nodes
            .values()
            .filter(|n| n.history.len() >= window)
            .map(|n| (n.name.clone(), stats::stability(&n.recent_history(window))))
            .collect();
        let average = if scores.is_empty() {
            0.0
        } else {
            scores.iter().map(|(_, s)| s).sum::<f64>() / scores.len() as f64
        };
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(MOST_STABLE);

        let mut central: Vec<(String, usize)> = self
            .nodes
            .values()
            .map(|n| (n.name.clone(), n.out_degree()))
            .collect();
        central.sort_by(|a, b| b.1.cmp(&a.1));
        central.truncate(MOST_CENTRAL);

        let runs = self.propagation_history.len();
        let propagation = PropagationStats {
            total_propagations: runs,
            total_steps: self.propagation_history.iter().map(|r| r.steps).sum(),
            avg_duration_s: self
                .propagation_history
                .iter()
                .map(|r| r.duration_s)
                .sum::<f64>()
                / runs.max(1) as f64,
        };

        let mut pattern_types = BTreeMap::new();
        for pattern in &self.emergent_patterns {
            *pattern_types
                .entry(pattern.type_name().to_string())
                .or_insert(0) += 1;
        }

        self.record(
            "Performed lattice analysis",
            "analyze",
            json!({
                "node_count": total,
                "active_nodes": active,
                "emergent_patterns": self.emergent_patterns.len(),
            }),
        );

        LatticeAnalysis {
            timestamp: unix_time_s(),
            nodes: NodeTotals {
                total,
                active,
                active_percentage: percentage(active, total),
            },
            connections: ConnectionTotals {
                total: edges,
                average_per_node: edges as f64 / total.max(1) as f64,
            },
            kind_distribution,
            stability: StabilitySummary {
                average,
                most_stable: scores,
            },
            most_central: central,
            propagation,
            emergence: EmergenceStats {
                total_patterns: self.emergent_patterns.len(),
                pattern_types,
            },
        }
    }

    /// Nodes, live links and recent patterns for rendering.
    pub fn graph_view(&self) -> GraphView {
        let nodes = self
            .nodes
            .values()
            .map(|n| GraphNode {
                id: n.name.clone(),
                kind: n.kind,
                activation: n.activation,
                active: n.is_active(),
                threshold: n.threshold,
                label: n.label.clone(),
                connection_count: n.out_degree(),
            })
            .collect();

        let live = &self.nodes;
        let links = live
            .values()
            .flat_map(|n| {
                n.connections
                    .iter()
                    .filter(move |(target, _)| live.contains_key(*target))
                    .map(move |(target, &strength)| GraphLink {
                        source: n.name.clone(),
                        target: target.clone(),
                        strength,
                    })
            })
            .collect();

        let skip = self.emergent_patterns.len().saturating_sub(RECENT_PATTERNS);
        let emergent_patterns = self.emergent_patterns[skip..]
            .iter()
            .map(|p| GraphPattern {
                kind: p.type_name().to_string(),
                nodes: p.nodes().to_vec(),
                timestamp: p.timestamp(),
            })
            .collect();

        GraphView {
            nodes,
            links,
            emergent_patterns,
            timestamp: unix_time_s(),
        }
    }
}
