// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Trigger Node
// ─────────────────────────────────────────────────────────────────────
//! A single addressable activation unit: threshold, bounded energy,
//! weighted outgoing edges, and a bounded activation history.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use lattice_types::config::{ACTIVATION_THRESHOLD, MAX_ACTIVATION};
use lattice_types::NodeKind;

const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// A removed edge, kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disconnection {
    pub target: String,
    pub weight: f64,
}

/// A trigger node.
///
/// `activation` always lies in `[0, max_activation]` and `threshold` is
/// fixed at construction. Edge targets are plain names and may outlive
/// the node they point to; every traversal skips such dangling edges.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerNode {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) label: Option<String>,
    pub(crate) threshold: f64,
    pub(crate) activation: f64,
    pub(crate) connections: BTreeMap<String, f64>,
    pub(crate) history: VecDeque<f64>,
    pub(crate) sources: BTreeMap<String, f64>,
    pub(crate) disconnections: VecDeque<Disconnection>,
    max_activation: f64,
    history_capacity: usize,
}

impl TriggerNode {
    /// Create a node with the default activation ceiling and history bound.
    ///
    /// A non-positive or non-finite threshold falls back to the default.
    pub fn new(name: impl Into<String>, kind: NodeKind, threshold: f64) -> Self {
        let threshold = if threshold.is_finite() && threshold > 0.0 {
            threshold
        } else {
            log::warn!("invalid threshold {threshold}, using {ACTIVATION_THRESHOLD}");
            ACTIVATION_THRESHOLD
        };
        let mut history = VecDeque::with_capacity(8);
        history.push_back(0.0);
        Self {
            name: name.into(),
            kind,
            label: None,
            threshold,
            activation: 0.0,
            connections: BTreeMap::new(),
            history,
            sources: BTreeMap::new(),
            disconnections: VecDeque::new(),
            max_activation: MAX_ACTIVATION,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Override the activation ceiling and history bound.
    pub fn with_limits(mut self, max_activation: f64, history_capacity: usize) -> Self {
        self.max_activation = max_activation;
        self.history_capacity = history_capacity.max(1);
        self.activation = self.activation.clamp(0.0, self.max_activation);
        self.trim_history();
        self
    }

    /// Add energy and report whether this call crossed the threshold.
    ///
    /// Firing is edge-triggered: a node already at or above threshold
    /// returns `false` no matter how much more it receives.
    pub fn activate(&mut self, amount: f64, source: Option<&str>) -> bool {
        let amount = if amount.is_finite() {
            amount
        } else {
            log::warn!("node {}: non-finite activation {amount} ignored", self.name);
            0.0
        };
        let previous = self.activation;
        self.activation = (previous + amount).clamp(0.0, self.max_activation);
        self.push_history(self.activation);

        if let Some(tag) = source {
            let total = self.sources.entry(tag.to_string()).or_insert(0.0);
            // Saturate so the tally always serializes as a number.
            *total = (*total + amount).clamp(-f64::MAX, f64::MAX);
        }

        previous < self.threshold && self.activation >= self.threshold
    }

    /// Lower activation by `rate`, never below zero.
    ///
    /// Non-positive or non-finite rates are ignored. History only grows
    /// when the value actually changes.
    pub fn decay(&mut self, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            return;
        }
        self.activation = (self.activation - rate).clamp(0.0, self.max_activation);
        if self.history.back() != Some(&self.activation) {
            self.push_history(self.activation);
        }
    }

    /// Set (or overwrite) the edge to `target`.
    pub fn connect(&mut self, target: impl Into<String>, weight: f64) {
        self.connections.insert(target.into(), weight);
    }

    /// Remove the edge to `target`, returning its weight.
    pub fn disconnect(&mut self, target: &str) -> Option<f64> {
        let weight = self.connections.remove(target)?;
        self.disconnections.push_back(Disconnection {
            target: target.to_string(),
            weight,
        });
        while self.disconnections.len() > self.history_capacity {
            self.disconnections.pop_front();
        }
        Some(weight)
    }

    pub fn is_active(&self) -> bool {
        self.activation >= self.threshold
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn activation(&self) -> f64 {
        self.activation
    }

    pub fn connections(&self) -> &BTreeMap<String, f64> {
        &self.connections
    }

    pub fn weight_to(&self, target: &str) -> Option<f64> {
        self.connections.get(target).copied()
    }

    pub fn out_degree(&self) -> usize {
        self.connections.len()
    }

    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    /// The most recent `n` history samples, oldest first.
    pub fn recent_history(&self, n: usize) -> Vec<f64> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).copied().collect()
    }

    pub fn sources(&self) -> &BTreeMap<String, f64> {
        &self.sources
    }

    pub fn disconnections(&self) -> &VecDeque<Disconnection> {
        &self.disconnections
    }

    pub(crate) fn restore_activation(&mut self, activation: f64) {
        self.activation = if activation.is_finite() {
            activation.clamp(0.0, self.max_activation)
        } else {
            0.0
        };
    }

    pub(crate) fn restore_history(&mut self, samples: &[f64]) {
        self.history.clear();
        self.history.extend(samples.iter().copied().filter(|v| v.is_finite()));
        if self.history.is_empty() {
            self.history.push_back(0.0);
        }
        self.trim_history();
    }

    fn push_history(&mut self, value: f64) {
        self.history.push_back(value);
        self.trim_history();
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(threshold: f64) -> TriggerNode {
        TriggerNode::new("n", NodeKind::Symbolic, threshold)
    }

    #[test]
    fn test_new_node_history_seeded() {
        let n = node(3.0);
        assert_eq!(n.history().len(), 1);
        assert_eq!(n.activation(), 0.0);
        assert!(!n.is_active());
    }

    #[test]
    fn test_activation_clamped_to_max() {
        let mut n = node(3.0);
        n.activate(25.0, None);
        assert_eq!(n.activation(), MAX_ACTIVATION);
        n.activate(-40.0, None);
        assert_eq!(n.activation(), 0.0);
    }

    #[test]
    fn test_fire_is_edge_triggered() {
        let mut n = node(3.0);
        assert!(!n.activate(2.0, None));
        assert!(n.activate(2.0, None)); // 4.0 crosses 3.0
        assert!(!n.activate(2.0, None)); // already above
        assert!(n.is_active());
    }

    #[test]
    fn test_fire_exactly_at_threshold() {
        let mut n = node(3.0);
        assert!(n.activate(3.0, None));
    }

    #[test]
    fn test_sources_accumulate() {
        let mut n = node(3.0);
        n.activate(1.0, Some("external"));
        n.activate(0.5, Some("external"));
        n.activate(0.25, Some("diffusion"));
        n.activate(9.0, None);
        assert!((n.sources()["external"] - 1.5).abs() < 1e-12);
        assert!((n.sources()["diffusion"] - 0.25).abs() < 1e-12);
        assert_eq!(n.sources().len(), 2);
    }

    #[test]
    fn test_source_tally_saturates() {
        let mut n = node(3.0);
        n.activate(1e308, Some("ext"));
        n.activate(1e308, Some("ext"));
        assert_eq!(n.sources()["ext"], f64::MAX);
        assert_eq!(n.activation(), 10.0);
    }

    #[test]
    fn test_decay_never_negative() {
        let mut n = node(3.0);
        n.activate(2.0, None);
        n.decay(1e9);
        assert_eq!(n.activation(), 0.0);
        n.decay(-5.0);
        assert_eq!(n.activation(), 0.0);
        n.decay(f64::NAN);
        assert_eq!(n.activation(), 0.0);
    }

    #[test]
    fn test_noop_decay_keeps_history() {
        let mut n = node(3.0);
        let before = n.history().len();
        n.decay(0.1); // 0.0 → 0.0
        assert_eq!(n.history().len(), before);
        n.activate(1.0, None);
        n.decay(0.1);
        assert_eq!(n.history().len(), before + 2);
    }

    #[test]
    fn test_history_bounded() {
        let mut n = node(3.0).with_limits(MAX_ACTIVATION, 5);
        for _ in 0..20 {
            n.activate(0.1, None);
        }
        assert_eq!(n.history().len(), 5);
        assert_eq!(n.recent_history(3).len(), 3);
        assert_eq!(n.recent_history(50).len(), 5);
    }

    #[test]
    fn test_disconnect_records_weight() {
        let mut n = node(3.0);
        n.connect("b", 0.6);
        assert_eq!(n.disconnect("b"), Some(0.6));
        assert_eq!(n.disconnect("b"), None);
        assert_eq!(n.disconnections().len(), 1);
        assert_eq!(n.disconnections()[0].target, "b");
    }

    #[test]
    fn test_invalid_threshold_falls_back() {
        assert_eq!(node(0.0).threshold(), ACTIVATION_THRESHOLD);
        assert_eq!(node(f64::NAN).threshold(), ACTIVATION_THRESHOLD);
    }

    #[test]
    fn test_non_finite_amount_ignored() {
        let mut n = node(3.0);
        assert!(!n.activate(f64::INFINITY, None));
        assert_eq!(n.activation(), 0.0);
    }
}
