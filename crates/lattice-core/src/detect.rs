// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Pattern Detection
// ─────────────────────────────────────────────────────────────────────
//! Post-epoch analysis over the current node snapshot.
//!
//! Three independent passes, each reported in name order:
//!
//! - **Cycles**: elementary directed cycles through active nodes, in
//!   canonical rotation (lexicographically smallest member first).
//! - **Synchronization**: greedy clusters of nodes whose trailing
//!   histories correlate above `sync_correlation`.
//! - **Stability**: active nodes with low-variance recent history that
//!   have at least one equally stable, active neighbour.
//!
//! Dangling edges are skipped everywhere.

use std::collections::{BTreeMap, HashMap};

use lattice_types::{EmergentPattern, LatticeConfig};

use crate::node::TriggerNode;
use crate::stats;

/// Detection thresholds, copied out of [`LatticeConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PatternDetector {
    max_cycles: usize,
    max_cycle_steps: usize,
    sync_min_history: usize,
    sync_correlation: f64,
    stability_window: usize,
    stability_threshold: f64,
}

/// Result of one bounded cycle search.
#[derive(Debug, Default)]
pub(crate) struct CycleSearch {
    pub cycles: Vec<Vec<String>>,
    pub steps: usize,
    /// A limit was hit before every root was searched.
    pub truncated: bool,
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::from_config(&LatticeConfig::default())
    }
}

impl PatternDetector {
    pub fn from_config(config: &LatticeConfig) -> Self {
        Self {
            max_cycles: config.max_cycles,
            max_cycle_steps: config.max_cycle_steps,
            sync_min_history: config.sync_min_history,
            sync_correlation: config.sync_correlation,
            stability_window: config.stability_window,
            stability_threshold: config.stability_threshold,
        }
    }

    /// Run all three passes. Cycles first, then synchronization, then
    /// stable configurations.
    pub fn detect(
        &self,
        nodes: &BTreeMap<String, TriggerNode>,
        timestamp: f64,
    ) -> Vec<EmergentPattern> {
        let search = self.search_cycles(nodes);
        log::trace!(
            "cycle search: {} cycles in {} steps{}",
            search.cycles.len(),
            search.steps,
            if search.truncated { " (truncated)" } else { "" }
        );
        let mut found: Vec<EmergentPattern> = search
            .cycles
            .into_iter()
            .map(|nodes| EmergentPattern::ActivationLoop { nodes, timestamp })
            .collect();
        found.extend(
            self.synchronized(nodes)
                .into_iter()
                .map(|nodes| EmergentPattern::Synchronization { nodes, timestamp }),
        );
        found.extend(self.stable(nodes, timestamp));
        found
    }

    /// Elementary cycles among active nodes.
    ///
    /// Active nodes get dense indices in name order. A search rooted at
    /// index `s` only walks nodes with a higher index and reports a cycle
    /// whenever it steps back onto `s`, so every cycle is found exactly
    /// once, already rotated to its smallest member.
    pub fn cycles(&self, nodes: &BTreeMap<String, TriggerNode>) -> Vec<Vec<String>> {
        self.search_cycles(nodes).cycles
    }

    /// Cycle search bounded by `max_cycles` found and `max_cycle_steps`
    /// walked.
    ///
    /// Each root only enters nodes that can still reach it through
    /// higher-indexed nodes, so an acyclic region costs one step per edge.
    pub(crate) fn search_cycles(&self, nodes: &BTreeMap<String, TriggerNode>) -> CycleSearch {
        let active: Vec<&TriggerNode> = nodes.values().filter(|n| n.is_active()).collect();
        let index: HashMap<&str, usize> = active
            .iter()
            .enumerate()
            .map(|(i, n)| (n.name.as_str(), i))
            .collect();
        let adjacency: Vec<Vec<usize>> = active
            .iter()
            .map(|n| {
                n.connections
                    .keys()
                    .filter_map(|t| index.get(t.as_str()).copied())
                    .collect()
            })
            .collect();
        let mut reverse: Vec<Vec<usize>> = vec![Vec::new(); active.len()];
        for (from, targets) in adjacency.iter().enumerate() {
            for &to in targets {
                reverse[to].push(from);
            }
        }

        let mut search = CycleSearch::default();
        let mut on_path = vec![false; active.len()];
        let mut reaches_start = vec![false; active.len()];
        let mut frontier: Vec<usize> = Vec::new();
        let mut path: Vec<usize> = Vec::new();
        let mut cursor: Vec<usize> = Vec::new();

        for start in 0..active.len() {
            // Nodes above `start` with a path back to it.
            reaches_start.iter_mut().for_each(|r| *r = false);
            frontier.clear();
            frontier.push(start);
            while let Some(node) = frontier.pop() {
                for &prev in &reverse[node] {
                    if prev > start && !reaches_start[prev] {
                        reaches_start[prev] = true;
                        frontier.push(prev);
                    }
                }
            }

            path.clear();
            cursor.clear();
            path.push(start);
            cursor.push(0);
            on_path[start] = true;

            while let Some(&current) = path.last() {
                if search.steps >= self.max_cycle_steps {
                    log::warn!(
                        "cycle search stopped after {} steps ({} cycles)",
                        search.steps,
                        search.cycles.len()
                    );
                    search.truncated = true;
                    return search;
                }
                search.steps += 1;

                let depth = path.len() - 1;
                let edge = cursor[depth];
                if edge >= adjacency[current].len() {
                    on_path[current] = false;
                    path.pop();
                    cursor.pop();
                    continue;
                }
                cursor[depth] += 1;
                let next = adjacency[current][edge];
                if next == start {
                    search
                        .cycles
                        .push(path.iter().map(|&i| active[i].name.clone()).collect());
                    if search.cycles.len() >= self.max_cycles {
                        log::warn!("cycle enumeration stopped at {} cycles", self.max_cycles);
                        search.truncated = true;
                        return search;
                    }
                } else if reaches_start[next] && !on_path[next] {
                    on_path[next] = true;
                    path.push(next);
                    cursor.push(0);
                }
            }
        }
        search
    }

    /// Greedy clusters of correlated histories.
    ///
    /// Each pair is compared over the trailing `min(len_a, len_b)`
    /// samples. A node joins at most one cluster.
    pub fn synchronized(&self, nodes: &BTreeMap<String, TriggerNode>) -> Vec<Vec<String>> {
        let candidates: Vec<(&str, Vec<f64>)> = nodes
            .values()
            .filter(|n| n.history.len() >= self.sync_min_history)
            .map(|n| (n.name.as_str(), n.history.iter().copied().collect()))
            .collect();

        let mut processed = vec![false; candidates.len()];
        let mut groups = Vec::new();
        for i in 0..candidates.len() {
            if processed[i] {
                continue;
            }
            processed[i] = true;
            let (name, series) = &candidates[i];
            let mut group = vec![name.to_string()];
            for j in (i + 1)..candidates.len() {
                if processed[j] {
                    continue;
                }
                let (other, other_series) = &candidates[j];
                let window = series.len().min(other_series.len());
                let a = &series[series.len() - window..];
                let b = &other_series[other_series.len() - window..];
                if stats::pearson(a, b) > self.sync_correlation {
                    processed[j] = true;
                    group.push(other.to_string());
                }
            }
            if group.len() >= 2 {
                groups.push(group);
            }
        }
        groups
    }

    /// Stable configurations centred on each qualifying node.
    pub fn stable(
        &self,
        nodes: &BTreeMap<String, TriggerNode>,
        timestamp: f64,
    ) -> Vec<EmergentPattern> {
        let mut found = Vec::new();
        for node in nodes.values() {
            let Some(score) = self.stability_of(node) else {
                continue;
            };
            let neighbours: Vec<String> = node
                .connections
                .keys()
                .filter(|t| *t != &node.name)
                .filter_map(|t| nodes.get(t))
                .filter(|n| self.stability_of(n).is_some())
                .map(|n| n.name.clone())
                .collect();
            if neighbours.is_empty() {
                continue;
            }
            let mut configuration = Vec::with_capacity(neighbours.len() + 1);
            configuration.push(node.name.clone());
            configuration.extend(neighbours);
            found.push(EmergentPattern::StablePattern {
                configuration,
                stability: score,
                center_node: node.name.clone(),
                timestamp,
            });
        }
        found
    }

    /// Stability score of an active node with enough history, if it
    /// clears the threshold.
    fn stability_of(&self, node: &TriggerNode) -> Option<f64> {
        if !node.is_active() || node.history.len() < self.stability_window {
            return None;
        }
        let score = stats::stability(&node.recent_history(self.stability_window));
        (score > self.stability_threshold).then_some(score)
    }
}

#[cfg(test)]
mod tests {
    use lattice_types::NodeKind;

    use super::*;

    fn active(name: &str) -> TriggerNode {
        let mut n = TriggerNode::new(name, NodeKind::Symbolic, 3.0);
        n.activate(5.0, None);
        n
    }

    fn graph(nodes: Vec<TriggerNode>) -> BTreeMap<String, TriggerNode> {
        nodes.into_iter().map(|n| (n.name.clone(), n)).collect()
    }

    fn ring(names: &[&str]) -> BTreeMap<String, TriggerNode> {
        let mut nodes: Vec<TriggerNode> = names.iter().map(|n| active(n)).collect();
        for i in 0..nodes.len() {
            let next = names[(i + 1) % names.len()];
            nodes[i].connect(next, 0.5);
        }
        graph(nodes)
    }

    #[test]
    fn test_three_ring_single_canonical_cycle() {
        let d = PatternDetector::default();
        // Listed out of order; the ring is c → a → b → c.
        let nodes = ring(&["c", "a", "b"]);
        let cycles = d.cycles(&nodes);
        assert_eq!(cycles, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_cycles_ignore_inactive_members() {
        let d = PatternDetector::default();
        let mut nodes = ring(&["a", "b", "c"]);
        nodes.get_mut("b").unwrap().decay(10.0);
        assert!(d.cycles(&nodes).is_empty());
    }

    #[test]
    fn test_cycles_skip_dangling_edges() {
        let d = PatternDetector::default();
        let mut nodes = ring(&["a", "b"]);
        nodes.get_mut("a").unwrap().connect("ghost", 1.0);
        assert_eq!(d.cycles(&nodes), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_overlapping_cycles_each_reported_once() {
        let d = PatternDetector::default();
        let mut nodes = ring(&["a", "b", "c"]);
        // Adds the two-cycle a ⇄ b.
        nodes.get_mut("b").unwrap().connect("a", 0.5);
        let cycles = d.cycles(&nodes);
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["a".to_string(), "b".to_string()]));
        assert!(cycles.contains(&vec!["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_cycle_limit() {
        let d = PatternDetector::from_config(&LatticeConfig {
            max_cycles: 1,
            ..LatticeConfig::default()
        });
        let mut nodes = ring(&["a", "b", "c"]);
        nodes.get_mut("b").unwrap().connect("a", 0.5);
        assert_eq!(d.cycles(&nodes).len(), 1);
    }

    /// `layers` layers of two active nodes, each wired to both nodes of
    /// the next layer.
    fn layered(layers: usize) -> BTreeMap<String, TriggerNode> {
        let name = |layer: usize, side: usize| format!("l{layer:02}_{side}");
        let mut nodes = Vec::new();
        for layer in 0..layers {
            for side in 0..2 {
                let mut n = active(&name(layer, side));
                if layer + 1 < layers {
                    n.connect(name(layer + 1, 0), 0.5);
                    n.connect(name(layer + 1, 1), 0.5);
                }
                nodes.push(n);
            }
        }
        graph(nodes)
    }

    #[test]
    fn test_acyclic_branching_is_cheap() {
        let d = PatternDetector::default();
        let search = d.search_cycles(&layered(22));
        assert!(search.cycles.is_empty());
        assert!(!search.truncated);
        // One pass over each root's own edges, nothing deeper.
        assert!(search.steps <= 44 * 3, "walked {} steps", search.steps);
    }

    #[test]
    fn test_cycle_step_budget() {
        let d = PatternDetector::from_config(&LatticeConfig {
            max_cycle_steps: 50,
            ..LatticeConfig::default()
        });
        // Closing the last layer back to the first makes every path a cycle.
        let mut nodes = layered(22);
        for side in 0..2 {
            let tail = nodes.get_mut(&format!("l21_{side}")).unwrap();
            tail.connect("l00_0", 0.5);
            tail.connect("l00_1", 0.5);
        }
        let search = d.search_cycles(&nodes);
        assert!(search.truncated);
        assert_eq!(search.steps, 50);
    }

    #[test]
    fn test_synchronized_pair() {
        let d = PatternDetector::default();
        let mut a = TriggerNode::new("a", NodeKind::Symbolic, 3.0);
        let mut b = TriggerNode::new("b", NodeKind::Symbolic, 3.0);
        let mut c = TriggerNode::new("c", NodeKind::Symbolic, 3.0);
        for step in [1.0, 2.0, 1.0, 3.0] {
            a.activate(step, None);
            b.activate(step * 0.5, None);
            c.activate(-step, None);
            c.activate(if step > 1.5 { 4.0 } else { 0.0 }, None);
        }
        let groups = d.synchronized(&graph(vec![a, b, c]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], vec!["a", "b"]);
    }

    #[test]
    fn test_short_histories_never_synchronize() {
        let d = PatternDetector::default();
        let mut a = TriggerNode::new("a", NodeKind::Symbolic, 3.0);
        let mut b = TriggerNode::new("b", NodeKind::Symbolic, 3.0);
        a.activate(1.0, None);
        b.activate(1.0, None);
        assert!(d.synchronized(&graph(vec![a, b])).is_empty());
    }

    #[test]
    fn test_stable_configuration() {
        let d = PatternDetector::default();
        let mut a = TriggerNode::new("a", NodeKind::Symbolic, 3.0);
        let mut b = TriggerNode::new("b", NodeKind::Symbolic, 3.0);
        for n in [&mut a, &mut b] {
            n.activate(5.0, None);
            for _ in 0..5 {
                n.activate(0.0, None);
            }
        }
        a.connect("b", 0.5);
        a.connect("a", 0.5);
        let found = d.stable(&graph(vec![a, b]), 1.0);
        assert_eq!(found.len(), 1);
        match &found[0] {
            EmergentPattern::StablePattern {
                configuration,
                center_node,
                stability,
                ..
            } => {
                assert_eq!(configuration, &vec!["a".to_string(), "b".to_string()]);
                assert_eq!(center_node, "a");
                assert!((*stability - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected pattern {other:?}"),
        }
    }

    #[test]
    fn test_stable_needs_a_neighbour() {
        let d = PatternDetector::default();
        let mut a = TriggerNode::new("a", NodeKind::Symbolic, 3.0);
        a.activate(5.0, None);
        for _ in 0..5 {
            a.activate(0.0, None);
        }
        assert!(d.stable(&graph(vec![a]), 0.0).is_empty());
    }

    #[test]
    fn test_detect_orders_pattern_kinds() {
        let d = PatternDetector::default();
        let mut nodes = ring(&["a", "b"]);
        for n in nodes.values_mut() {
            for _ in 0..5 {
                n.activate(0.0, None);
            }
        }
        let found = d.detect(&nodes, 2.0);
        let kinds: Vec<&str> = found.iter().map(|p| p.type_name()).collect();
        assert_eq!(kinds.first(), Some(&"activation_loop"));
        assert!(kinds.contains(&"stable_pattern"));
        assert!(found.iter().all(|p| p.timestamp() == 2.0));
    }
}
