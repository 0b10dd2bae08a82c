// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Persistence
// ─────────────────────────────────────────────────────────────────────
//! JSON state contract.
//!
//! ```json
//! {
//!   "nodes": [{"name", "kind", "label"?, "threshold", "activation",
//!              "connections": {"<name>": w}, "history": [..], "sources": {..}}],
//!   "propagation_history": [..],
//!   "emergent_patterns": [..],
//!   "activation_count": 0,
//!   "default_mode": "diffusion",
//!   "custom_patterns": {..}
//! }
//! ```
//!
//! Only `name` and `kind` are mandatory per node; every other field
//! defaults. Nodes are rebuilt first and edges restored afterwards,
//! verbatim, so an edge may name a node that appears later in the list
//! or not at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use lattice_types::{
    EmergentPattern, LatticeError, LatticeResult, NodeKind, PropagationMode, PropagationRecord,
};

use crate::lattice::Lattice;
use crate::node::TriggerNode;
use crate::patterns::CustomPattern;

/// Persisted form of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Missing → the configured default threshold.
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub activation: f64,
    #[serde(default)]
    pub connections: BTreeMap<String, f64>,
    /// Most recent samples only.
    #[serde(default)]
    pub history: Vec<f64>,
    #[serde(default)]
    pub sources: BTreeMap<String, f64>,
}

/// Persisted form of a whole lattice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatticeState {
    #[serde(default)]
    pub nodes: Vec<NodeState>,
    #[serde(default)]
    pub propagation_history: Vec<PropagationRecord>,
    #[serde(default)]
    pub emergent_patterns: Vec<EmergentPattern>,
    #[serde(default)]
    pub activation_count: u64,
    #[serde(default)]
    pub default_mode: PropagationMode,
    #[serde(default)]
    pub custom_patterns: BTreeMap<String, CustomPattern>,
}

impl Lattice {
    /// Snapshot the persistable state.
    ///
    /// Keeps the last `persisted_history` samples per node and the last
    /// `persisted_propagations` propagation records.
    pub fn to_state(&self) -> LatticeState {
        let nodes = self
            .nodes
            .values()
            .map(|n| NodeState {
                name: n.name.clone(),
                kind: n.kind,
                label: n.label.clone(),
                threshold: Some(n.threshold),
                activation: n.activation,
                connections: n.connections.clone(),
                history: n.recent_history(self.config.persisted_history),
                sources: n.sources.clone(),
            })
            .collect();

        let skip = self
            .propagation_history
            .len()
            .saturating_sub(self.config.persisted_propagations);
        LatticeState {
            nodes,
            propagation_history: self.propagation_history.iter().skip(skip).cloned().collect(),
            emergent_patterns: self.emergent_patterns.clone(),
            activation_count: self.activation_count,
            default_mode: self.default_mode,
            custom_patterns: self.custom_patterns.clone(),
        }
    }

    /// Pretty-printed JSON state.
    pub fn to_json(&self) -> LatticeResult<String> {
        serde_json::to_string_pretty(&self.to_state())
            .map_err(|e| LatticeError::Persistence(format!("serialize: {e}")))
    }

    /// Rebuild a lattice with the default configuration and no-op
    /// collaborators.
    pub fn from_state(state: LatticeState) -> LatticeResult<Self> {
        let mut lattice = Lattice::new();
        lattice.load_state(state)?;
        Ok(lattice)
    }

    pub fn from_json(json: &str) -> LatticeResult<Self> {
        Self::from_state(parse_state(json)?)
    }

    /// Replace this lattice's graph and history with `state`, keeping
    /// configuration, RNG and collaborators.
    ///
    /// On error the lattice is left untouched.
    pub fn load_state(&mut self, state: LatticeState) -> LatticeResult<()> {
        let mut nodes = BTreeMap::new();
        let mut edges = Vec::with_capacity(state.nodes.len());
        for ns in state.nodes {
            let threshold = ns.threshold.unwrap_or(self.config.activation_threshold);
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(LatticeError::Persistence(format!(
                    "node {}: threshold must be > 0, got {threshold}",
                    ns.name
                )));
            }
            if nodes.contains_key(&ns.name) {
                return Err(LatticeError::Persistence(format!(
                    "duplicate node name: {}",
                    ns.name
                )));
            }

            let mut node = TriggerNode::new(ns.name.clone(), ns.kind, threshold)
                .with_limits(self.config.max_activation, self.config.history_capacity);
            if let Some(label) = ns.label {
                node = node.with_label(label);
            }
            node.restore_activation(ns.activation);
            node.restore_history(&ns.history);
            node.sources = ns.sources;
            edges.push((ns.name.clone(), ns.connections));
            nodes.insert(ns.name, node);
        }
        for (name, connections) in edges {
            if let Some(node) = nodes.get_mut(&name) {
                node.connections = connections
                    .into_iter()
                    .filter(|(_, w)| w.is_finite())
                    .map(|(target, w)| (target, w.clamp(0.0, 1.0)))
                    .collect();
            }
        }

        let restored = nodes.len();
        self.nodes = nodes;
        self.propagation_history = state.propagation_history.into_iter().collect();
        while self.propagation_history.len() > self.config.propagation_history_capacity {
            self.propagation_history.pop_front();
        }
        self.emergent_patterns = state.emergent_patterns;
        self.activation_count = state.activation_count;
        self.default_mode = state.default_mode;
        self.custom_patterns = state.custom_patterns;
        self.propagating = false;

        log::info!(
            "restored lattice: {restored} nodes, {} emergent patterns",
            self.emergent_patterns.len()
        );
        self.record(
            "Trigger lattice deserialized from storage",
            "load_state",
            json!({
                "nodes_restored": restored,
                "emergent_patterns_restored": self.emergent_patterns.len(),
            }),
        );
        Ok(())
    }

    /// Write the JSON state to `path`, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> LatticeResult<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| LatticeError::Io(format!("{}: {e}", parent.display())))?;
        }
        fs::write(path, &json).map_err(|e| LatticeError::Io(format!("{}: {e}", path.display())))?;

        log::info!("lattice saved to {} ({} bytes)", path.display(), json.len());
        self.record(
            format!("Lattice serialized to {}", path.display()),
            "save",
            json!({ "file": path.display().to_string(), "size": json.len() }),
        );
        Ok(())
    }

    /// Read a lattice saved with [`Lattice::save`].
    pub fn load(path: impl AsRef<Path>) -> LatticeResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| LatticeError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }
}

/// Parse JSON into a [`LatticeState`].
pub fn parse_state(json: &str) -> LatticeResult<LatticeState> {
    serde_json::from_str(json).map_err(|e| LatticeError::Persistence(format!("parse: {e}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn busy_lattice() -> Lattice {
        let mut l = Lattice::with_roots();
        l.add("extra", NodeKind::Meta, Some("↻"), Some(2.5));
        l.connect("extra", "meta_root", 0.123456789);
        l.activate("symbolic_root", 6.0, Some("external"));
        l.activate("extra", 1.0 / 3.0, None);
        for _ in 0..3 {
            l.propagate(5, PropagationMode::Resonance);
        }
        l.set_default_mode(PropagationMode::Wave);
        l.create_custom_pattern("pair", [("extra", 1.5)], Some("one node"));
        l
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("trigger-lattice-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_roundtrip_preserves_nodes_and_patterns() {
        let l = busy_lattice();
        let restored = Lattice::from_json(&l.to_json().unwrap()).unwrap();

        assert_eq!(restored.len(), l.len());
        for node in l.nodes() {
            let other = restored.node(node.name()).unwrap();
            assert_eq!(other.activation(), node.activation());
            assert_eq!(other.threshold(), node.threshold());
            assert_eq!(other.connections(), node.connections());
            assert_eq!(other.kind(), node.kind());
            assert_eq!(other.label(), node.label());
        }
        assert_eq!(restored.emergent_patterns(), l.emergent_patterns());
        assert_eq!(restored.activation_count(), l.activation_count());
        assert_eq!(restored.default_mode(), PropagationMode::Wave);
        assert_eq!(restored.custom_patterns(), l.custom_patterns());
    }

    #[test]
    fn test_history_truncated_on_save() {
        let l = busy_lattice();
        let state = l.to_state();
        let semantic = state.nodes.iter().find(|n| n.name == "semantic_root").unwrap();
        assert!(semantic.history.len() <= 10);
        assert_eq!(
            semantic.history,
            l.node("semantic_root").unwrap().recent_history(10)
        );
    }

    #[test]
    fn test_propagation_history_truncated_on_save() {
        let mut l = Lattice::new();
        for _ in 0..25 {
            l.propagate(1, PropagationMode::Diffusion);
        }
        assert_eq!(l.to_state().propagation_history.len(), 20);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"nodes": [{"name": "a", "kind": "symbolic"},
                                 {"name": "b", "kind": "meta", "connections": {"a": 0.5}}]}"#;
        let l = Lattice::from_json(json).unwrap();
        let a = l.node("a").unwrap();
        assert_eq!(a.threshold(), 3.0);
        assert_eq!(a.activation(), 0.0);
        assert_eq!(a.history().len(), 1);
        assert_eq!(l.node("b").unwrap().weight_to("a"), Some(0.5));
        assert_eq!(l.default_mode(), PropagationMode::Diffusion);
        assert_eq!(l.activation_count(), 0);
    }

    #[test]
    fn test_edges_restored_after_nodes() {
        // a points at b, which is listed later, and at a node that never appears.
        let json = r#"{"nodes": [
            {"name": "a", "kind": "semantic", "connections": {"b": 0.7, "gone": 0.2}},
            {"name": "b", "kind": "semantic"}]}"#;
        let l = Lattice::from_json(json).unwrap();
        assert_eq!(l.node("a").unwrap().weight_to("b"), Some(0.7));
        assert_eq!(l.node("a").unwrap().weight_to("gone"), Some(0.2));
        assert_eq!(l.graph_view().links.len(), 1);
    }

    #[test]
    fn test_missing_mandatory_field() {
        let err = Lattice::from_json(r#"{"nodes": [{"kind": "meta"}]}"#).unwrap_err();
        assert!(matches!(err, LatticeError::Persistence(_)));
        let err = Lattice::from_json(r#"{"nodes": [{"name": "x"}]}"#).unwrap_err();
        assert!(matches!(err, LatticeError::Persistence(_)));
    }

    #[test]
    fn test_invalid_kind_and_mode() {
        assert!(Lattice::from_json(r#"{"nodes": [{"name": "x", "kind": "other"}]}"#).is_err());
        assert!(Lattice::from_json(r#"{"default_mode": "spiral"}"#).is_err());
    }

    #[test]
    fn test_bad_threshold_and_duplicates() {
        let zero = r#"{"nodes": [{"name": "x", "kind": "meta", "threshold": 0.0}]}"#;
        assert!(matches!(
            Lattice::from_json(zero),
            Err(LatticeError::Persistence(_))
        ));
        let dup = r#"{"nodes": [{"name": "x", "kind": "meta"}, {"name": "x", "kind": "emergent"}]}"#;
        assert!(matches!(
            Lattice::from_json(dup),
            Err(LatticeError::Persistence(_))
        ));
    }

    #[test]
    fn test_failed_load_leaves_lattice_untouched() {
        let mut l = Lattice::with_roots();
        let bad = parse_state(r#"{"nodes": [{"name": "x", "kind": "meta", "threshold": -1}]}"#)
            .unwrap();
        assert!(l.load_state(bad).is_err());
        assert_eq!(l.len(), 5);
    }

    #[test]
    fn test_activation_clamped_on_restore() {
        let json = r#"{"nodes": [{"name": "x", "kind": "meta", "activation": 99.0}]}"#;
        let l = Lattice::from_json(json).unwrap();
        assert_eq!(l.node("x").unwrap().activation(), 10.0);
    }

    #[test]
    fn test_weights_clamped_on_restore() {
        let json = r#"{"nodes": [
            {"name": "a", "kind": "meta", "connections": {"b": 1.7, "c": -0.4}},
            {"name": "b", "kind": "meta"},
            {"name": "c", "kind": "meta"}]}"#;
        let l = Lattice::from_json(json).unwrap();
        let a = l.node("a").unwrap();
        assert_eq!(a.weight_to("b"), Some(1.0));
        assert_eq!(a.weight_to("c"), Some(0.0));
    }

    #[test]
    fn test_huge_activations_roundtrip() {
        let mut l = Lattice::new();
        l.add("a", NodeKind::Symbolic, None, None);
        l.activate("a", 1e308, Some("ext"));
        l.activate("a", 1e308, Some("ext"));
        let restored = Lattice::from_json(&l.to_json().unwrap()).unwrap();
        let a = restored.node("a").unwrap();
        assert_eq!(a.activation(), 10.0);
        assert_eq!(a.sources()["ext"], f64::MAX);
    }

    #[test]
    fn test_save_and_load_file() {
        let l = busy_lattice();
        let path = temp_path("state/lattice.json");
        l.save(&path).unwrap();
        let restored = Lattice::load(&path).unwrap();
        assert_eq!(restored.to_state().nodes, l.to_state().nodes);
        let _ = fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Lattice::load(temp_path("does/not/exist.json")).unwrap_err();
        assert!(matches!(err, LatticeError::Io(_)));
    }

    #[test]
    fn test_garbage_json() {
        assert!(matches!(
            Lattice::from_json("{nodes:"),
            Err(LatticeError::Persistence(_))
        ));
    }
}
