// ─────────────────────────────────────────────────────────────────────
// Trigger Lattice — Lattice (node and edge management)
// ─────────────────────────────────────────────────────────────────────
//! The owning graph structure.
//!
//! All management operations are total over names: an unknown node is
//! answered with `false` or `None`, never with an error.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};

use lattice_types::{
    EmergentPattern, LatticeConfig, LatticeResult, NodeKind, PropagationMode, PropagationRecord,
};

use crate::hooks::{GlyphSink, NullGlyphs, NullTrace, TraceSink};
use crate::node::TriggerNode;
use crate::patterns::CustomPattern;

/// Root nodes created by [`Lattice::with_roots`]: name, kind, label,
/// threshold multiplier.
pub const ROOT_NODES: [(&str, NodeKind, &str, f64); 5] = [
    ("symbolic_root", NodeKind::Symbolic, "🜏", 1.0),
    ("semantic_root", NodeKind::Semantic, "∴", 1.0),
    ("structural_root", NodeKind::Structural, "⧖", 1.0),
    ("emergent_root", NodeKind::Emergent, "⇌", 1.5),
    ("meta_root", NodeKind::Meta, "🝚", 2.0),
];

/// Ring wiring between the root nodes.
pub const ROOT_RING: [(&str, &str, f64); 5] = [
    ("symbolic_root", "semantic_root", 0.7),
    ("semantic_root", "structural_root", 0.6),
    ("structural_root", "emergent_root", 0.5),
    ("emergent_root", "meta_root", 0.4),
    ("meta_root", "symbolic_root", 0.3),
];

/// A directed, weighted graph of trigger nodes.
///
/// Single owner, single thread. Wrap in [`crate::SharedLattice`] to
/// share it across threads.
pub struct Lattice {
    pub(crate) config: LatticeConfig,
    pub(crate) nodes: BTreeMap<String, TriggerNode>,
    pub(crate) propagating: bool,
    pub(crate) activation_count: u64,
    pub(crate) propagation_history: VecDeque<PropagationRecord>,
    pub(crate) emergent_patterns: Vec<EmergentPattern>,
    pub(crate) default_mode: PropagationMode,
    pub(crate) custom_patterns: BTreeMap<String, CustomPattern>,
    pub(crate) rng: StdRng,
    glyphs: Arc<dyn GlyphSink>,
    trace: Arc<dyn TraceSink>,
}

impl Default for Lattice {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lattice")
            .field("nodes", &self.nodes.len())
            .field("activation_count", &self.activation_count)
            .field("emergent_patterns", &self.emergent_patterns.len())
            .field("default_mode", &self.default_mode)
            .field("propagating", &self.propagating)
            .finish_non_exhaustive()
    }
}

impl Lattice {
    /// Empty lattice, default configuration, no-op collaborators.
    pub fn new() -> Self {
        Self::build(
            LatticeConfig::default(),
            Arc::new(NullGlyphs),
            Arc::new(NullTrace),
        )
    }

    /// Empty lattice with a validated configuration.
    pub fn with_config(config: LatticeConfig) -> LatticeResult<Self> {
        Self::with_hooks(config, Arc::new(NullGlyphs), Arc::new(NullTrace))
    }

    /// Empty lattice with explicit collaborators.
    pub fn with_hooks(
        config: LatticeConfig,
        glyphs: Arc<dyn GlyphSink>,
        trace: Arc<dyn TraceSink>,
    ) -> LatticeResult<Self> {
        config.validate()?;
        let lattice = Self::build(config, glyphs, trace);
        lattice.record(
            "Lattice initialized",
            "new",
            json!({ "seed": lattice.config.seed }),
        );
        Ok(lattice)
    }

    /// Default configuration plus the five wired root nodes.
    pub fn with_roots() -> Self {
        let mut lattice = Self::new();
        lattice.add_roots();
        lattice
    }

    fn build(config: LatticeConfig, glyphs: Arc<dyn GlyphSink>, trace: Arc<dyn TraceSink>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            nodes: BTreeMap::new(),
            propagating: false,
            activation_count: 0,
            propagation_history: VecDeque::new(),
            emergent_patterns: Vec::new(),
            default_mode: PropagationMode::default(),
            custom_patterns: BTreeMap::new(),
            rng,
            glyphs,
            trace,
        }
    }

    /// Add the root nodes and their ring. Existing nodes are left alone.
    pub fn add_roots(&mut self) {
        let base = self.config.activation_threshold;
        for (name, kind, label, factor) in ROOT_NODES {
            self.add(name, kind, Some(label), Some(base * factor));
        }
        for (src, dst, weight) in ROOT_RING {
            self.connect(src, dst, weight);
        }
    }

    // ------------------------------------------------------------------
    // Node management
    // ------------------------------------------------------------------

    /// Add a node, or return the existing node of that name unchanged.
    ///
    /// `threshold` defaults to the configured activation threshold.
    pub fn add(
        &mut self,
        name: &str,
        kind: NodeKind,
        label: Option<&str>,
        threshold: Option<f64>,
    ) -> &TriggerNode {
        if self.nodes.contains_key(name) {
            self.record(
                format!("Node {name} already exists, returning existing node"),
                "add",
                json!({ "existing_node": name }),
            );
        } else {
            let threshold = threshold.unwrap_or(self.config.activation_threshold);
            let mut node = TriggerNode::new(name, kind, threshold)
                .with_limits(self.config.max_activation, self.config.history_capacity);
            if let Some(label) = label {
                node = node.with_label(label);
            }
            self.record(
                format!("Added trigger node: {name} ({kind})"),
                "add",
                json!({
                    "node_name": name,
                    "kind": kind.as_str(),
                    "label": label,
                    "threshold": node.threshold,
                }),
            );
            if let Some(label) = label {
                self.glyphs
                    .on_node_created(label, &format!("node_creation:{name}"));
            }
            self.nodes.insert(name.to_string(), node);
        }
        &self.nodes[name]
    }

    /// Remove a node and every edge that targets it.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(node) = self.nodes.remove(name) else {
            return false;
        };
        let mut severed = Vec::new();
        for other in self.nodes.values_mut() {
            if other.disconnect(name).is_some() {
                severed.push(other.name.clone());
            }
        }
        self.record(
            format!("Removed trigger node: {name}"),
            "remove",
            json!({
                "node_name": name,
                "lost_connections": node.connections.keys().collect::<Vec<_>>(),
                "severed_inbound": severed,
            }),
        );
        true
    }

    // ------------------------------------------------------------------
    // Edge management
    // ------------------------------------------------------------------

    /// Set the edge `src → dst`. Weight is clamped to [0, 1].
    ///
    /// Returns `false` if either endpoint is unknown or the weight is
    /// not finite.
    pub fn connect(&mut self, src: &str, dst: &str, weight: f64) -> bool {
        if !self.nodes.contains_key(dst) || !weight.is_finite() {
            return false;
        }
        let Some(source) = self.nodes.get_mut(src) else {
            return false;
        };
        let weight = weight.clamp(0.0, 1.0);
        source.connect(dst, weight);
        self.record(
            format!("Connected {src} to {dst} with strength {weight}"),
            "connect",
            json!({ "source": src, "target": dst, "strength": weight }),
        );
        true
    }

    /// Remove the edge `src → dst`. Returns `false` if either endpoint is
    /// unknown or no such edge exists.
    pub fn disconnect(&mut self, src: &str, dst: &str) -> bool {
        if !self.nodes.contains_key(dst) {
            return false;
        }
        let Some(former) = self.nodes.get_mut(src).and_then(|n| n.disconnect(dst)) else {
            return false;
        };
        self.record(
            format!("Disconnected {src} from {dst}"),
            "disconnect",
            json!({ "source": src, "target": dst, "former_strength": former }),
        );
        true
    }

    // ------------------------------------------------------------------
    // Activation
    // ------------------------------------------------------------------

    /// Inject energy into a node. Returns whether it fired.
    ///
    /// Unknown names return `false` and leave `activation_count` alone.
    pub fn activate(&mut self, name: &str, amount: f64, source: Option<&str>) -> bool {
        let Some(node) = self.nodes.get_mut(name) else {
            return false;
        };
        let fired = node.activate(amount, source);
        let level = node.activation;
        let label = node.label.clone();
        self.activation_count += 1;

        self.record(
            format!("Activated node {name} with {amount:.2} energy"),
            "activate",
            json!({
                "node_name": name,
                "amount": amount,
                "source": source,
                "did_fire": fired,
                "new_level": level,
            }),
        );
        if fired {
            if let Some(label) = label {
                self.notify_fired(&label, name);
            }
        }
        fired
    }

    pub fn set_default_mode(&mut self, mode: PropagationMode) {
        self.default_mode = mode;
        self.record(
            format!("Default propagation mode set to {mode}"),
            "set_default_mode",
            json!({ "mode": mode.as_str() }),
        );
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn node(&self, name: &str) -> Option<&TriggerNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = &TriggerNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Names of nodes at or above threshold, in name order.
    pub fn active_nodes(&self) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|n| n.is_active())
            .map(|n| n.name.as_str())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_active()).count()
    }

    pub fn activation_count(&self) -> u64 {
        self.activation_count
    }

    pub fn is_propagating(&self) -> bool {
        self.propagating
    }

    pub fn default_mode(&self) -> PropagationMode {
        self.default_mode
    }

    pub fn emergent_patterns(&self) -> &[EmergentPattern] {
        &self.emergent_patterns
    }

    pub fn propagation_history(&self) -> &VecDeque<PropagationRecord> {
        &self.propagation_history
    }

    pub(crate) fn record(&self, message: impl AsRef<str>, source: &str, metadata: Value) {
        self.trace.record(message.as_ref(), source, &metadata);
    }

    pub(crate) fn notify_fired(&self, label: &str, name: &str) {
        self.glyphs.on_node_fired(label, &format!("node_firing:{name}"));
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::hooks::{ExternalGlyphs, GlyphEvent, MemoryTrace};

    fn pair() -> Lattice {
        let mut l = Lattice::new();
        l.add("a", NodeKind::Symbolic, None, None);
        l.add("b", NodeKind::Semantic, None, None);
        l
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut l = Lattice::new();
        l.add("a", NodeKind::Symbolic, None, Some(2.0));
        let again = l.add("a", NodeKind::Meta, Some("x"), Some(9.0));
        assert_eq!(again.kind(), NodeKind::Symbolic);
        assert_eq!(again.threshold(), 2.0);
        assert!(again.label().is_none());
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn test_add_uses_config_threshold() {
        let mut l = Lattice::with_config(LatticeConfig {
            activation_threshold: 4.0,
            ..LatticeConfig::default()
        })
        .unwrap();
        assert_eq!(l.add("a", NodeKind::Symbolic, None, None).threshold(), 4.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = LatticeConfig {
            max_activation: -1.0,
            ..LatticeConfig::default()
        };
        assert!(Lattice::with_config(cfg).is_err());
    }

    #[test]
    fn test_connect_unknown_endpoint() {
        let mut l = pair();
        assert!(!l.connect("a", "zzz", 0.5));
        assert!(!l.connect("zzz", "a", 0.5));
        assert!(l.connect("a", "b", 0.5));
        assert_eq!(l.node("a").unwrap().weight_to("b"), Some(0.5));
    }

    #[test]
    fn test_connect_clamps_weight() {
        let mut l = pair();
        assert!(l.connect("a", "b", 3.0));
        assert_eq!(l.node("a").unwrap().weight_to("b"), Some(1.0));
        assert!(!l.connect("a", "b", f64::NAN));
    }

    #[test]
    fn test_connect_is_directed() {
        let mut l = pair();
        l.connect("a", "b", 0.5);
        assert!(l.node("b").unwrap().connections().is_empty());
    }

    #[test]
    fn test_disconnect() {
        let mut l = pair();
        assert!(!l.disconnect("a", "b"));
        l.connect("a", "b", 0.5);
        assert!(l.disconnect("a", "b"));
        assert!(!l.disconnect("a", "b"));
        assert!(!l.disconnect("a", "nope"));
    }

    #[test]
    fn test_remove_cascades() {
        let mut l = Lattice::with_roots();
        l.add("extra", NodeKind::Meta, None, None);
        l.connect("extra", "semantic_root", 0.9);
        assert!(l.remove("semantic_root"));
        assert!(!l.contains("semantic_root"));
        for node in l.nodes() {
            assert!(!node.connections().contains_key("semantic_root"));
        }
        assert!(!l.remove("semantic_root"));
    }

    #[test]
    fn test_activate_counts_and_fires() {
        let mut l = pair();
        assert!(!l.activate("a", 2.0, Some("external")));
        assert!(l.activate("a", 2.0, Some("external")));
        assert!(!l.activate("missing", 5.0, None));
        assert_eq!(l.activation_count(), 2);
        assert_eq!(l.active_nodes(), vec!["a"]);
    }

    #[test]
    fn test_roots_layout() {
        let l = Lattice::with_roots();
        assert_eq!(l.len(), 5);
        assert_eq!(l.node("emergent_root").unwrap().threshold(), 4.5);
        assert_eq!(l.node("meta_root").unwrap().threshold(), 6.0);
        assert_eq!(
            l.node("meta_root").unwrap().weight_to("symbolic_root"),
            Some(0.3)
        );
        assert_eq!(l.node("symbolic_root").unwrap().label(), Some("🜏"));
    }

    #[test]
    fn test_trace_on_mutations() {
        let trace = Arc::new(MemoryTrace::new());
        let mut l =
            Lattice::with_hooks(LatticeConfig::default(), Arc::new(NullGlyphs), trace.clone())
                .unwrap();
        l.add("a", NodeKind::Symbolic, None, None);
        l.add("b", NodeKind::Symbolic, None, None);
        l.connect("a", "b", 0.4);
        l.activate("a", 1.0, None);
        l.disconnect("a", "b");
        l.remove("b");
        for source in ["add", "connect", "activate", "disconnect", "remove"] {
            assert!(!trace.from_source(source).is_empty(), "no trace for {source}");
        }
    }

    #[test]
    fn test_glyph_notifications() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let glyphs = {
            let events = events.clone();
            ExternalGlyphs::new(move |e, l, c| {
                events.lock().push((e, l.to_string(), c.to_string()))
            })
        };
        let mut l =
            Lattice::with_hooks(LatticeConfig::default(), Arc::new(glyphs), Arc::new(NullTrace))
                .unwrap();
        l.add("plain", NodeKind::Symbolic, None, None);
        l.add("marked", NodeKind::Meta, Some("↻"), Some(1.0));
        l.activate("plain", 5.0, None);
        l.activate("marked", 0.5, None);
        l.activate("marked", 0.5, None);
        l.activate("marked", 0.5, None);

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, GlyphEvent::Created);
        assert_eq!(events[0].2, "node_creation:marked");
        assert_eq!(events[1].0, GlyphEvent::Fired);
        assert_eq!(events[1].2, "node_firing:marked");
    }

    #[test]
    fn test_hooks_do_not_change_behaviour() {
        let run = |mut l: Lattice| {
            l.add_roots();
            l.activate("symbolic_root", 6.0, None);
            l.propagate(3, PropagationMode::Diffusion);
            l.nodes()
                .map(|n| (n.name().to_string(), n.activation()))
                .collect::<Vec<_>>()
        };
        let plain = run(Lattice::new());
        let traced = run(
            Lattice::with_hooks(
                LatticeConfig::default(),
                Arc::new(NullGlyphs),
                Arc::new(MemoryTrace::new()),
            )
            .unwrap(),
        );
        assert_eq!(plain, traced);
    }
}
